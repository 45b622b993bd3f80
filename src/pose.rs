//! Target poses and pose classification
//!
//! A pose is a list of predicates over one frame. The predicate vocabulary
//! is closed: joint angle ranges, relative landmark positions and
//! visibility gates. [`PredicateClassifier`] is the one interpreter for it.

use serde::{Deserialize, Serialize};

use crate::landmarks::{LandmarkFrame, LandmarkIndex};
use crate::metrics::{JointAngleKind, JointAngles, MetricsConfig};

/// Image axis for position comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    Y,
}

/// Direction of a position comparison.
///
/// On the Y axis `Above` means higher on screen, i.e. a smaller y. On the X
/// axis `Above` means a larger x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Above,
    Below,
}

/// One condition a frame must satisfy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PosePredicate {
    /// Joint angle within `[min, max]` degrees
    AngleRange {
        joint: JointAngleKind,
        min: f64,
        max: f64,
    },

    /// `landmark` lies beyond `reference` along `axis` by at least `margin`
    PositionThreshold {
        landmark: LandmarkIndex,
        reference: LandmarkIndex,
        axis: Axis,
        comparison: Comparison,
        #[serde(default)]
        margin: f64,
    },

    /// Every listed landmark is seen with at least `min_confidence`
    VisibilityGate {
        landmarks: Vec<LandmarkIndex>,
        min_confidence: f64,
    },
}

/// Named target pose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseDefinition {
    pub name: String,
    #[serde(default)]
    pub predicates: Vec<PosePredicate>,
}

impl PoseDefinition {
    pub fn new(name: impl Into<String>, predicates: Vec<PosePredicate>) -> Self {
        Self {
            name: name.into(),
            predicates,
        }
    }
}

/// Pose matched in a frame and its position in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoseMatch {
    pub name: String,
    pub index: usize,
}

/// Decides which catalog pose, if any, a frame shows
pub trait PoseClassifier {
    fn classify(&self, frame: &LandmarkFrame, poses: &[PoseDefinition]) -> Option<PoseMatch>;
}

/// Evaluates pose predicates directly against the frame.
///
/// The first pose in catalog order whose predicates all hold wins. A pose
/// with no predicates never matches.
#[derive(Debug, Clone, Default)]
pub struct PredicateClassifier {
    config: MetricsConfig,
}

impl PredicateClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Whether every predicate of `pose` holds for `frame`
    pub fn matches(&self, frame: &LandmarkFrame, pose: &PoseDefinition) -> bool {
        let angles = self.checked_angles(frame);
        self.matches_with(frame, &angles, pose)
    }

    fn checked_angles(&self, frame: &LandmarkFrame) -> Vec<(JointAngleKind, Option<f64>)> {
        JointAngles::from_frame_checked(frame, &self.config)
    }

    fn matches_with(
        &self,
        frame: &LandmarkFrame,
        angles: &[(JointAngleKind, Option<f64>)],
        pose: &PoseDefinition,
    ) -> bool {
        !pose.predicates.is_empty()
            && pose
                .predicates
                .iter()
                .all(|p| self.holds(frame, angles, p))
    }

    fn holds(
        &self,
        frame: &LandmarkFrame,
        angles: &[(JointAngleKind, Option<f64>)],
        predicate: &PosePredicate,
    ) -> bool {
        match predicate {
            PosePredicate::AngleRange { joint, min, max } => angles
                .iter()
                .find(|(kind, _)| kind == joint)
                .and_then(|(_, value)| *value)
                .map(|angle| angle >= *min && angle <= *max)
                .unwrap_or(false),

            PosePredicate::PositionThreshold {
                landmark,
                reference,
                axis,
                comparison,
                margin,
            } => {
                let threshold = self.config.visibility_threshold;
                let (Some(subject), Some(reference)) =
                    (frame.visible(*landmark, threshold), frame.visible(*reference, threshold))
                else {
                    return false;
                };
                match (axis, comparison) {
                    (Axis::Y, Comparison::Above) => subject.y < reference.y - margin,
                    (Axis::Y, Comparison::Below) => subject.y > reference.y + margin,
                    (Axis::X, Comparison::Above) => subject.x > reference.x + margin,
                    (Axis::X, Comparison::Below) => subject.x < reference.x - margin,
                }
            }

            PosePredicate::VisibilityGate {
                landmarks,
                min_confidence,
            } => landmarks
                .iter()
                .all(|&idx| frame.get(idx).confidence >= *min_confidence),
        }
    }
}

impl PoseClassifier for PredicateClassifier {
    fn classify(&self, frame: &LandmarkFrame, poses: &[PoseDefinition]) -> Option<PoseMatch> {
        let angles = self.checked_angles(frame);
        poses
            .iter()
            .enumerate()
            .find(|(_, pose)| self.matches_with(frame, &angles, pose))
            .map(|(index, pose)| PoseMatch {
                name: pose.name.clone(),
                index,
            })
    }
}

/// Predicates shared by the built-in poses
pub mod library {
    use super::*;
    use LandmarkIndex as L;

    fn angle(joint: JointAngleKind, min: f64, max: f64) -> PosePredicate {
        PosePredicate::AngleRange { joint, min, max }
    }

    fn above(landmark: L, reference: L, margin: f64) -> PosePredicate {
        PosePredicate::PositionThreshold {
            landmark,
            reference,
            axis: Axis::Y,
            comparison: Comparison::Above,
            margin,
        }
    }

    fn gate(landmarks: &[L]) -> PosePredicate {
        PosePredicate::VisibilityGate {
            landmarks: landmarks.to_vec(),
            min_confidence: 0.5,
        }
    }

    /// Upright with straight legs
    pub fn standing() -> PoseDefinition {
        PoseDefinition::new(
            "standing",
            vec![
                gate(&[L::LeftHip, L::RightHip, L::LeftKnee, L::RightKnee]),
                angle(JointAngleKind::KneeLeft, 160.0, 180.0),
                angle(JointAngleKind::KneeRight, 160.0, 180.0),
                angle(JointAngleKind::Trunk, 0.0, 15.0),
            ],
        )
    }

    /// Thighs near parallel
    pub fn squat_bottom() -> PoseDefinition {
        PoseDefinition::new(
            "squat_bottom",
            vec![
                angle(JointAngleKind::KneeLeft, 60.0, 120.0),
                angle(JointAngleKind::KneeRight, 60.0, 120.0),
            ],
        )
    }

    /// Both wrists over the head
    pub fn arms_overhead() -> PoseDefinition {
        PoseDefinition::new(
            "arms_overhead",
            vec![
                above(L::LeftWrist, L::Nose, 0.02),
                above(L::RightWrist, L::Nose, 0.02),
                angle(JointAngleKind::ElbowLeft, 140.0, 180.0),
                angle(JointAngleKind::ElbowRight, 140.0, 180.0),
            ],
        )
    }

    /// Arms straight out to the sides
    pub fn arms_lateral() -> PoseDefinition {
        PoseDefinition::new(
            "arms_lateral",
            vec![
                angle(JointAngleKind::ShoulderLeft, 70.0, 110.0),
                angle(JointAngleKind::ShoulderRight, 70.0, 110.0),
                angle(JointAngleKind::ElbowLeft, 140.0, 180.0),
                angle(JointAngleKind::ElbowRight, 140.0, 180.0),
            ],
        )
    }

    /// Knees bent near 90° with the back upright
    pub fn wall_sit() -> PoseDefinition {
        PoseDefinition::new(
            "wall_sit",
            vec![
                angle(JointAngleKind::KneeLeft, 75.0, 110.0),
                angle(JointAngleKind::KneeRight, 75.0, 110.0),
                angle(JointAngleKind::Trunk, 0.0, 20.0),
            ],
        )
    }
}
