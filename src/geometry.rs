//! Geometry engine
//!
//! Pure, stateless functions over landmark positions. Angles are reported
//! in degrees rounded to one decimal place.
//!
//! # Degenerate input
//!
//! A zero-length limb vector has no defined angle. The plain functions
//! return `0.0` in that case so callers never see NaN; the `_checked`
//! variants return `None` instead, for callers that must tell "could not
//! compute" apart from a genuine 0° reading.

use serde::{Deserialize, Serialize};

/// Vectors shorter than this are treated as zero-length
const EPSILON: f64 = 1e-9;

/// A 3D position with the confidence of the landmark(s) it came from.
///
/// Visibility travels alongside the coordinates but never enters the math.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub visibility: f64,
}

impl Point3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            visibility: 1.0,
        }
    }

    /// Screen-plane point (z = 0)
    pub fn new_2d(x: f64, y: f64) -> Self {
        Self::new(x, y, 0.0)
    }

    pub fn with_visibility(mut self, visibility: f64) -> Self {
        self.visibility = visibility;
        self
    }

    fn sub(&self, other: &Point3D) -> (f64, f64, f64) {
        (self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Angle ABC at vertex `b`, or `None` if either limb has zero length
pub fn angle_at_vertex_checked(a: &Point3D, b: &Point3D, c: &Point3D) -> Option<f64> {
    let ba = a.sub(b);
    let bc = c.sub(b);

    let dot = ba.0 * bc.0 + ba.1 * bc.1 + ba.2 * bc.2;
    let mag_ba = (ba.0 * ba.0 + ba.1 * ba.1 + ba.2 * ba.2).sqrt();
    let mag_bc = (bc.0 * bc.0 + bc.1 * bc.1 + bc.2 * bc.2).sqrt();

    if mag_ba < EPSILON || mag_bc < EPSILON {
        return None;
    }

    // Floating error can push |cos| slightly past 1
    let cos_angle = (dot / (mag_ba * mag_bc)).clamp(-1.0, 1.0);
    Some(round1(cos_angle.acos().to_degrees()))
}

/// Angle ABC at vertex `b` in degrees; `0.0` for degenerate input
pub fn angle_at_vertex(a: &Point3D, b: &Point3D, c: &Point3D) -> f64 {
    angle_at_vertex_checked(a, b, c).unwrap_or(0.0)
}

/// Screen-plane angle ABC from the difference of two bearings, in [0, 180]
pub fn angle_at_vertex_2d_checked(a: &Point3D, b: &Point3D, c: &Point3D) -> Option<f64> {
    let (bax, bay) = (a.x - b.x, a.y - b.y);
    let (bcx, bcy) = (c.x - b.x, c.y - b.y);

    if bax.hypot(bay) < EPSILON || bcx.hypot(bcy) < EPSILON {
        return None;
    }

    let bearing_a = bay.atan2(bax);
    let bearing_c = bcy.atan2(bcx);
    let mut degrees = (bearing_c - bearing_a).to_degrees().abs();
    if degrees > 180.0 {
        degrees = 360.0 - degrees;
    }
    Some(round1(degrees))
}

/// Screen-plane angle ABC in degrees; `0.0` for degenerate input
pub fn angle_at_vertex_2d(a: &Point3D, b: &Point3D, c: &Point3D) -> f64 {
    angle_at_vertex_2d_checked(a, b, c).unwrap_or(0.0)
}

/// Componentwise midpoint; only as trustworthy as its weakest input
pub fn midpoint(a: &Point3D, b: &Point3D) -> Point3D {
    Point3D {
        x: (a.x + b.x) / 2.0,
        y: (a.y + b.y) / 2.0,
        z: (a.z + b.z) / 2.0,
        visibility: a.visibility.min(b.visibility),
    }
}

/// Lean of the shoulder–hip segment away from vertical, direction-agnostic.
///
/// Image y grows downward, so an upright torso has the shoulders at a
/// smaller y than the hips and reads 0°.
pub fn trunk_tilt(shoulder_mid: &Point3D, hip_mid: &Point3D) -> f64 {
    let dx = shoulder_mid.x - hip_mid.x;
    let dy = shoulder_mid.y - hip_mid.y;
    round1(dx.atan2(-dy).to_degrees().abs())
}

pub fn distance_2d(a: &Point3D, b: &Point3D) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

pub fn distance_3d(a: &Point3D, b: &Point3D) -> f64 {
    let (dx, dy, dz) = a.sub(b);
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Convert a normalized screen distance to centimetres.
///
/// The subject's own shoulder width is the ruler: the normalized distance
/// is expressed in shoulder widths, then multiplied by a population-average
/// shoulder width. This is independent of resolution and camera distance
/// but assumes an average build. Returns `None` when the shoulders overlap
/// on screen and no ruler exists.
pub fn to_physical_cm(
    normalized_distance: f64,
    normalized_shoulder_width: f64,
    reference_shoulder_width_cm: f64,
) -> Option<f64> {
    if normalized_shoulder_width < EPSILON {
        return None;
    }
    Some(normalized_distance / normalized_shoulder_width * reference_shoulder_width_cm)
}
