//! Body metrics derived from a single landmark frame
//!
//! Distance metrics are measured on the screen plane in normalized
//! coordinates and converted to centimetres with the shoulder-width ruler
//! (see [`crate::geometry::to_physical_cm`]). Angle metrics come straight
//! from the geometry engine.
//!
//! Every metric is gated on landmark visibility: a hidden input makes the
//! metric `None` for that frame, which the smoother then bridges.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ConfigError;
use crate::geometry::{self, Point3D};
use crate::landmarks::{LandmarkFrame, LandmarkIndex, DEFAULT_VISIBILITY_THRESHOLD};

/// Named scalar measurements; the unit of calibration, smoothing and scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Horizontal ear-to-shoulder offset (cm)
    ForwardHead,
    /// Height difference between the shoulders (cm)
    ShoulderTilt,
    /// Height difference between the hips (cm)
    PelvisTilt,
    /// Hip–knee–ankle angle (degrees)
    KneeAngle,
    /// Shoulder–hip segment lean from vertical (degrees)
    TrunkTilt,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::ForwardHead,
        Metric::ShoulderTilt,
        Metric::PelvisTilt,
        Metric::KneeAngle,
        Metric::TrunkTilt,
    ];

    /// Stable key used for smoothing state and reports
    pub fn key(self) -> &'static str {
        match self {
            Metric::ForwardHead => "forward_head",
            Metric::ShoulderTilt => "shoulder_tilt",
            Metric::PelvisTilt => "pelvis_tilt",
            Metric::KneeAngle => "knee_angle",
            Metric::TrunkTilt => "trunk_tilt",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::ForwardHead => "Forward head",
            Metric::ShoulderTilt => "Shoulder height difference",
            Metric::PelvisTilt => "Pelvis height difference",
            Metric::KneeAngle => "Knee angle",
            Metric::TrunkTilt => "Trunk tilt",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::ForwardHead | Metric::ShoulderTilt | Metric::PelvisTilt => "cm",
            Metric::KneeAngle | Metric::TrunkTilt => "°",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Visibility gate and physical scaling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Landmarks below this confidence are ignored
    pub visibility_threshold: f64,

    /// Population-average shoulder width used as the physical ruler
    pub reference_shoulder_width_cm: f64,

    /// Include landmark depth in joint angles and in the shoulder-width
    /// ruler. Off by default: depth from a single camera is a noisy estimate
    /// and skews screen-plane angles.
    pub use_depth: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: DEFAULT_VISIBILITY_THRESHOLD,
            reference_shoulder_width_cm: 40.0,
            use_depth: false,
        }
    }
}

impl MetricsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.visibility_threshold) {
            return Err(ConfigError::invalid(
                "metrics.visibility_threshold",
                self.visibility_threshold,
                "must be within [0, 1]",
            ));
        }
        if self.reference_shoulder_width_cm <= 0.0 {
            return Err(ConfigError::invalid(
                "metrics.reference_shoulder_width_cm",
                self.reference_shoulder_width_cm,
                "must be positive",
            ));
        }
        Ok(())
    }
}

/// Per-frame metric readings; `None` where inputs were not visible
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyMetrics {
    pub forward_head: Option<f64>,
    pub shoulder_tilt: Option<f64>,
    pub pelvis_tilt: Option<f64>,
    pub knee_angle: Option<f64>,
    pub trunk_tilt: Option<f64>,
}

impl BodyMetrics {
    /// Measure every metric the frame supports
    pub fn from_frame(frame: &LandmarkFrame, config: &MetricsConfig) -> Self {
        let view = FrameView::new(frame, config);
        let ruler = view.shoulder_width();
        let to_cm = |normalized: f64| {
            ruler.and_then(|width| {
                geometry::to_physical_cm(normalized, width, config.reference_shoulder_width_cm)
            })
        };

        let shoulders = view.pair(LandmarkIndex::LeftShoulder, LandmarkIndex::RightShoulder);
        let hips = view.pair(LandmarkIndex::LeftHip, LandmarkIndex::RightHip);

        let forward_head = view.head_anchor().and_then(|head| {
            let (l, r) = shoulders?;
            to_cm((head.x - geometry::midpoint(&l, &r).x).abs())
        });

        let shoulder_tilt = shoulders.and_then(|(l, r)| to_cm((l.y - r.y).abs()));
        let pelvis_tilt = hips.and_then(|(l, r)| to_cm((l.y - r.y).abs()));

        let knee_angles: Vec<f64> = [
            view.angle(LandmarkIndex::LeftHip, LandmarkIndex::LeftKnee, LandmarkIndex::LeftAnkle),
            view.angle(LandmarkIndex::RightHip, LandmarkIndex::RightKnee, LandmarkIndex::RightAnkle),
        ]
        .into_iter()
        .flatten()
        .collect();
        let knee_angle = if knee_angles.is_empty() {
            None
        } else {
            Some(geometry::round1(knee_angles.iter().sum::<f64>() / knee_angles.len() as f64))
        };

        let trunk_tilt = match (shoulders, hips) {
            (Some((ls, rs)), Some((lh, rh))) => Some(geometry::trunk_tilt(
                &geometry::midpoint(&ls, &rs),
                &geometry::midpoint(&lh, &rh),
            )),
            _ => None,
        };

        Self {
            forward_head,
            shoulder_tilt,
            pelvis_tilt,
            knee_angle,
            trunk_tilt,
        }
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::ForwardHead => self.forward_head,
            Metric::ShoulderTilt => self.shoulder_tilt,
            Metric::PelvisTilt => self.pelvis_tilt,
            Metric::KneeAngle => self.knee_angle,
            Metric::TrunkTilt => self.trunk_tilt,
        }
    }

    pub fn set(&mut self, metric: Metric, value: Option<f64>) {
        match metric {
            Metric::ForwardHead => self.forward_head = value,
            Metric::ShoulderTilt => self.shoulder_tilt = value,
            Metric::PelvisTilt => self.pelvis_tilt = value,
            Metric::KneeAngle => self.knee_angle = value,
            Metric::TrunkTilt => self.trunk_tilt = value,
        }
    }
}

/// Joint angles consumed by pose predicates and the asymmetry analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointAngleKind {
    Trunk,
    HipLeft,
    HipRight,
    KneeLeft,
    KneeRight,
    ShoulderLeft,
    ShoulderRight,
    ElbowLeft,
    ElbowRight,
}

impl JointAngleKind {
    pub const ALL: [JointAngleKind; 9] = [
        JointAngleKind::Trunk,
        JointAngleKind::HipLeft,
        JointAngleKind::HipRight,
        JointAngleKind::KneeLeft,
        JointAngleKind::KneeRight,
        JointAngleKind::ShoulderLeft,
        JointAngleKind::ShoulderRight,
        JointAngleKind::ElbowLeft,
        JointAngleKind::ElbowRight,
    ];

    pub fn key(self) -> &'static str {
        match self {
            JointAngleKind::Trunk => "trunk",
            JointAngleKind::HipLeft => "hip_left",
            JointAngleKind::HipRight => "hip_right",
            JointAngleKind::KneeLeft => "knee_left",
            JointAngleKind::KneeRight => "knee_right",
            JointAngleKind::ShoulderLeft => "shoulder_left",
            JointAngleKind::ShoulderRight => "shoulder_right",
            JointAngleKind::ElbowLeft => "elbow_left",
            JointAngleKind::ElbowRight => "elbow_right",
        }
    }
}

/// Snapshot of joint angles in degrees.
///
/// An angle whose landmarks were hidden reads 0, the neutral value; callers
/// that need to tell hidden from measured use [`JointAngles::from_frame_checked`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JointAngles {
    /// Lean of the torso from vertical
    pub trunk: f64,
    /// Shoulder–hip–knee
    pub hip_left: f64,
    pub hip_right: f64,
    /// Hip–knee–ankle
    pub knee_left: f64,
    pub knee_right: f64,
    /// Elbow–shoulder–hip
    pub shoulder_left: f64,
    pub shoulder_right: f64,
    /// Shoulder–elbow–wrist
    pub elbow_left: f64,
    pub elbow_right: f64,
}

impl JointAngles {
    pub fn from_frame(frame: &LandmarkFrame, config: &MetricsConfig) -> Self {
        let mut angles = JointAngles::default();
        for (kind, value) in Self::from_frame_checked(frame, config) {
            angles.set(kind, value.unwrap_or(0.0));
        }
        angles
    }

    /// Every joint angle, `None` where an input landmark was hidden
    pub fn from_frame_checked(
        frame: &LandmarkFrame,
        config: &MetricsConfig,
    ) -> Vec<(JointAngleKind, Option<f64>)> {
        use LandmarkIndex as L;
        let view = FrameView::new(frame, config);

        JointAngleKind::ALL
            .iter()
            .map(|&kind| {
                let value = match kind {
                    JointAngleKind::Trunk => view.trunk_tilt(),
                    JointAngleKind::HipLeft => view.angle(L::LeftShoulder, L::LeftHip, L::LeftKnee),
                    JointAngleKind::HipRight => {
                        view.angle(L::RightShoulder, L::RightHip, L::RightKnee)
                    }
                    JointAngleKind::KneeLeft => view.angle(L::LeftHip, L::LeftKnee, L::LeftAnkle),
                    JointAngleKind::KneeRight => {
                        view.angle(L::RightHip, L::RightKnee, L::RightAnkle)
                    }
                    JointAngleKind::ShoulderLeft => {
                        view.angle(L::LeftElbow, L::LeftShoulder, L::LeftHip)
                    }
                    JointAngleKind::ShoulderRight => {
                        view.angle(L::RightElbow, L::RightShoulder, L::RightHip)
                    }
                    JointAngleKind::ElbowLeft => {
                        view.angle(L::LeftShoulder, L::LeftElbow, L::LeftWrist)
                    }
                    JointAngleKind::ElbowRight => {
                        view.angle(L::RightShoulder, L::RightElbow, L::RightWrist)
                    }
                };
                (kind, value)
            })
            .collect()
    }

    pub fn get(&self, kind: JointAngleKind) -> f64 {
        match kind {
            JointAngleKind::Trunk => self.trunk,
            JointAngleKind::HipLeft => self.hip_left,
            JointAngleKind::HipRight => self.hip_right,
            JointAngleKind::KneeLeft => self.knee_left,
            JointAngleKind::KneeRight => self.knee_right,
            JointAngleKind::ShoulderLeft => self.shoulder_left,
            JointAngleKind::ShoulderRight => self.shoulder_right,
            JointAngleKind::ElbowLeft => self.elbow_left,
            JointAngleKind::ElbowRight => self.elbow_right,
        }
    }

    pub fn set(&mut self, kind: JointAngleKind, value: f64) {
        match kind {
            JointAngleKind::Trunk => self.trunk = value,
            JointAngleKind::HipLeft => self.hip_left = value,
            JointAngleKind::HipRight => self.hip_right = value,
            JointAngleKind::KneeLeft => self.knee_left = value,
            JointAngleKind::KneeRight => self.knee_right = value,
            JointAngleKind::ShoulderLeft => self.shoulder_left = value,
            JointAngleKind::ShoulderRight => self.shoulder_right = value,
            JointAngleKind::ElbowLeft => self.elbow_left = value,
            JointAngleKind::ElbowRight => self.elbow_right = value,
        }
    }
}

/// Visibility-gated access to a frame
struct FrameView<'a> {
    frame: &'a LandmarkFrame,
    threshold: f64,
    use_depth: bool,
}

impl<'a> FrameView<'a> {
    fn new(frame: &'a LandmarkFrame, config: &MetricsConfig) -> Self {
        Self {
            frame,
            threshold: config.visibility_threshold,
            use_depth: config.use_depth,
        }
    }

    fn point(&self, index: LandmarkIndex) -> Option<Point3D> {
        self.frame.visible_point(index, self.threshold)
    }

    fn pair(&self, left: LandmarkIndex, right: LandmarkIndex) -> Option<(Point3D, Point3D)> {
        Some((self.point(left)?, self.point(right)?))
    }

    fn angle(&self, a: LandmarkIndex, b: LandmarkIndex, c: LandmarkIndex) -> Option<f64> {
        let (a, b, c) = (self.point(a)?, self.point(b)?, self.point(c)?);
        if self.use_depth {
            geometry::angle_at_vertex_checked(&a, &b, &c)
        } else {
            geometry::angle_at_vertex_2d_checked(&a, &b, &c)
        }
    }

    /// With depth, a body turned away from the camera keeps its true width
    fn shoulder_width(&self) -> Option<f64> {
        let (l, r) = self.pair(LandmarkIndex::LeftShoulder, LandmarkIndex::RightShoulder)?;
        if self.use_depth {
            Some(geometry::distance_3d(&l, &r))
        } else {
            Some(geometry::distance_2d(&l, &r))
        }
    }

    /// Ear midpoint, or the nose when the ears are hidden
    fn head_anchor(&self) -> Option<Point3D> {
        match self.pair(LandmarkIndex::LeftEar, LandmarkIndex::RightEar) {
            Some((l, r)) => Some(geometry::midpoint(&l, &r)),
            None => self.point(LandmarkIndex::Nose),
        }
    }

    fn trunk_tilt(&self) -> Option<f64> {
        let (ls, rs) = self.pair(LandmarkIndex::LeftShoulder, LandmarkIndex::RightShoulder)?;
        let (lh, rh) = self.pair(LandmarkIndex::LeftHip, LandmarkIndex::RightHip)?;
        Some(geometry::trunk_tilt(
            &geometry::midpoint(&ls, &rs),
            &geometry::midpoint(&lh, &rh),
        ))
    }
}
