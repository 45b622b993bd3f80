//! Left/right asymmetry and range-of-motion analysis
//!
//! Compares paired joint angles between the two sides of the body and
//! checks every joint angle against a normal range of motion. Both checks
//! are pure snapshots over already-smoothed [`JointAngles`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ConfigError;
use crate::geometry::round1;
use crate::metrics::JointAngles;

/// Left/right difference below which a pair counts as balanced, in degrees
pub const BALANCED_DIFFERENCE_DEG: f64 = 2.0;

/// Joints with a left/right pair or a range-of-motion norm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyJoint {
    Trunk,
    Shoulder,
    Hip,
    Knee,
}

impl BodyJoint {
    /// Joints compared left against right
    pub const PAIRED: [BodyJoint; 3] = [BodyJoint::Shoulder, BodyJoint::Hip, BodyJoint::Knee];

    pub fn name(self) -> &'static str {
        match self {
            BodyJoint::Trunk => "Trunk",
            BodyJoint::Shoulder => "Shoulder",
            BodyJoint::Hip => "Hip",
            BodyJoint::Knee => "Knee",
        }
    }

    fn sides(self, angles: &JointAngles) -> (f64, f64) {
        match self {
            BodyJoint::Trunk => (angles.trunk, angles.trunk),
            BodyJoint::Shoulder => (angles.shoulder_left, angles.shoulder_right),
            BodyJoint::Hip => (angles.hip_left, angles.hip_right),
            BodyJoint::Knee => (angles.knee_left, angles.knee_right),
        }
    }
}

impl fmt::Display for BodyJoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Body side of a measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// Which side of a pair reads larger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DominantSide {
    Left,
    Right,
    Balanced,
}

impl DominantSide {
    pub fn mirrored(self) -> Self {
        match self {
            DominantSide::Left => DominantSide::Right,
            DominantSide::Right => DominantSide::Left,
            DominantSide::Balanced => DominantSide::Balanced,
        }
    }
}

/// Asymmetry severity by percentage difference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Minimal,  // below 5%
    Mild,     // 5% to 10%
    Moderate, // 10% to 20%
    Severe,   // 20% and above
}

impl Severity {
    pub fn from_percent(percent_diff: f64) -> Self {
        if percent_diff < 5.0 {
            Severity::Minimal
        } else if percent_diff < 10.0 {
            Severity::Mild
        } else if percent_diff < 20.0 {
            Severity::Moderate
        } else {
            Severity::Severe
        }
    }

    /// Points taken off the balance score
    pub fn deduction(&self) -> f64 {
        match self {
            Severity::Minimal => 0.0,
            Severity::Mild => 5.0,
            Severity::Moderate => 15.0,
            Severity::Severe => 25.0,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Severity::Minimal => "Sides are within normal variation",
            Severity::Mild => "Slight imbalance between sides",
            Severity::Moderate => "Noticeable imbalance between sides",
            Severity::Severe => "Marked imbalance between sides",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            Severity::Minimal => "No corrective work needed",
            Severity::Mild => "Add a few unilateral sets for the weaker side",
            Severity::Moderate => "Train the weaker side first and with extra volume",
            Severity::Severe => "Have the imbalance assessed before loading the joint",
        }
    }
}

/// One left/right comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsymmetryResult {
    pub joint: BodyJoint,
    pub left_value: f64,
    pub right_value: f64,

    /// |left − right| in degrees
    pub difference: f64,

    /// Difference relative to the mean of both sides
    pub percent_diff: f64,

    pub dominant_side: DominantSide,
    pub severity: Severity,
    pub message: String,
}

/// Compare the two sides of one joint
pub fn analyze_asymmetry(joint: BodyJoint, left: f64, right: f64) -> AsymmetryResult {
    // Classify on the reported (rounded) values
    let difference = round1((left - right).abs());
    let average = (left + right) / 2.0;
    let percent_diff = if average == 0.0 {
        0.0
    } else {
        round1(((left - right).abs() / average * 100.0).abs())
    };

    let dominant_side = if difference <= BALANCED_DIFFERENCE_DEG {
        DominantSide::Balanced
    } else if left > right {
        DominantSide::Left
    } else {
        DominantSide::Right
    };

    let severity = Severity::from_percent(percent_diff);
    let message = match dominant_side {
        DominantSide::Balanced => format!("{}: balanced ({:.1}° difference)", joint, difference),
        side => format!(
            "{}: {} side reads {:.1}° higher ({:.1}%). {}",
            joint,
            if side == DominantSide::Left { "left" } else { "right" },
            difference,
            percent_diff,
            severity.description()
        ),
    };

    AsymmetryResult {
        joint,
        left_value: left,
        right_value: right,
        difference,
        percent_diff,
        dominant_side,
        severity,
        message,
    }
}

/// 100 minus the severity deductions, floored at 0
pub fn balance_score(results: &[AsymmetryResult]) -> f64 {
    let deductions: f64 = results.iter().map(|r| r.severity.deduction()).sum();
    (100.0 - deductions).max(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RomStatus {
    Normal,
    Limited,
    Excessive,
}

/// Normal range of motion in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RomRange {
    pub min: f64,
    pub max: f64,
}

impl RomRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// One range-of-motion check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RomResult {
    pub joint: BodyJoint,

    /// `None` for the trunk
    pub side: Option<Side>,

    pub measured: f64,
    pub normal_min: f64,
    pub normal_max: f64,
    pub status: RomStatus,

    /// Signed distance past the violated bound; 0 when normal
    pub deviation: f64,

    pub message: String,
}

/// Classify `measured` against `range`
pub fn analyze_rom(joint: BodyJoint, side: Option<Side>, measured: f64, range: RomRange) -> RomResult {
    let (status, deviation) = if measured < range.min {
        (RomStatus::Limited, measured - range.min)
    } else if measured > range.max {
        (RomStatus::Excessive, measured - range.max)
    } else {
        (RomStatus::Normal, 0.0)
    };

    let label = match side {
        Some(Side::Left) => format!("{} (left)", joint),
        Some(Side::Right) => format!("{} (right)", joint),
        None => joint.to_string(),
    };
    let message = match status {
        RomStatus::Normal => format!("{}: {:.1}° is within the normal range", label, measured),
        RomStatus::Limited => format!(
            "{}: {:.1}° is {:.1}° short of the normal minimum {:.0}°",
            label,
            measured,
            -deviation,
            range.min
        ),
        RomStatus::Excessive => format!(
            "{}: {:.1}° exceeds the normal maximum {:.0}° by {:.1}°",
            label, measured, range.max, deviation
        ),
    };

    RomResult {
        joint,
        side,
        measured,
        normal_min: range.min,
        normal_max: range.max,
        status,
        deviation: round1(deviation),
        message,
    }
}

/// Percentage of checks within range; 100 when nothing was checked
pub fn rom_score(results: &[RomResult]) -> f64 {
    if results.is_empty() {
        return 100.0;
    }
    let normal = results
        .iter()
        .filter(|r| r.status == RomStatus::Normal)
        .count();
    round1(normal as f64 / results.len() as f64 * 100.0)
}

/// Range-of-motion norms per joint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RomNorms {
    pub trunk: RomRange,
    pub shoulder: RomRange,
    pub hip: RomRange,
    pub knee: RomRange,
}

impl Default for RomNorms {
    fn default() -> Self {
        Self {
            trunk: RomRange::new(0.0, 15.0),
            shoulder: RomRange::new(0.0, 180.0),
            hip: RomRange::new(160.0, 180.0),
            knee: RomRange::new(165.0, 180.0),
        }
    }
}

impl RomNorms {
    pub fn get(&self, joint: BodyJoint) -> RomRange {
        match joint {
            BodyJoint::Trunk => self.trunk,
            BodyJoint::Shoulder => self.shoulder,
            BodyJoint::Hip => self.hip,
            BodyJoint::Knee => self.knee,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for joint in [
            BodyJoint::Trunk,
            BodyJoint::Shoulder,
            BodyJoint::Hip,
            BodyJoint::Knee,
        ] {
            let range = self.get(joint);
            if !range.min.is_finite() || !range.max.is_finite() || range.min > range.max {
                return Err(ConfigError::invalid(
                    &format!("rom.{}", joint.name().to_lowercase()),
                    format!("{}..{}", range.min, range.max),
                    "min must not exceed max",
                ));
            }
        }
        Ok(())
    }
}

/// Asymmetry and ROM for one set of joint angles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyBalanceReport {
    pub asymmetries: Vec<AsymmetryResult>,
    pub rom: Vec<RomResult>,
    pub balance_score: f64,
    pub rom_score: f64,
}

impl BodyBalanceReport {
    /// Worst asymmetry, if any pair was compared
    pub fn worst_asymmetry(&self) -> Option<&AsymmetryResult> {
        self.asymmetries.iter().max_by_key(|r| r.severity)
    }

    pub fn out_of_range(&self) -> impl Iterator<Item = &RomResult> {
        self.rom.iter().filter(|r| r.status != RomStatus::Normal)
    }
}

/// Runs every pair comparison and ROM check.
///
/// Limb angles that read exactly 0 were not measured and are skipped; the
/// trunk is always checked since 0 means upright.
#[derive(Debug, Clone, Default)]
pub struct AsymmetryAnalyzer {
    norms: RomNorms,
}

impl AsymmetryAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_norms(norms: RomNorms) -> Self {
        Self { norms }
    }

    pub fn norms(&self) -> &RomNorms {
        &self.norms
    }

    pub fn analyze(&self, angles: &JointAngles) -> BodyBalanceReport {
        let mut asymmetries = Vec::new();
        let mut rom = vec![analyze_rom(
            BodyJoint::Trunk,
            None,
            angles.trunk,
            self.norms.trunk,
        )];

        for joint in BodyJoint::PAIRED {
            let (left, right) = joint.sides(angles);
            let range = self.norms.get(joint);

            if left != 0.0 && right != 0.0 {
                asymmetries.push(analyze_asymmetry(joint, left, right));
            }
            if left != 0.0 {
                rom.push(analyze_rom(joint, Some(Side::Left), left, range));
            }
            if right != 0.0 {
                rom.push(analyze_rom(joint, Some(Side::Right), right, range));
            }
        }

        BodyBalanceReport {
            balance_score: balance_score(&asymmetries),
            rom_score: rom_score(&rom),
            asymmetries,
            rom,
        }
    }
}
