//! Landmark frame data contract
//!
//! A frame is the unit of input: exactly 33 body landmarks in the fixed
//! BlazePose/MediaPipe topology. Index assignment is semantic, so every
//! lookup goes through [`LandmarkIndex`] rather than raw integers.

use serde::{Deserialize, Serialize};

use crate::error::FrameError;
use crate::geometry::Point3D;

/// Number of landmarks in a full-body frame
pub const LANDMARK_COUNT: usize = 33;

/// Confidence below which a landmark is treated as not visible
pub const DEFAULT_VISIBILITY_THRESHOLD: f64 = 0.5;

/// One tracked body point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// Normalized horizontal position (0 = left edge of the image)
    pub x: f64,

    /// Normalized vertical position (0 = top edge, grows downward)
    pub y: f64,

    /// Relative depth; smaller is closer to the camera
    #[serde(default)]
    pub z: f64,

    /// Detector confidence in [0, 1]
    #[serde(alias = "visibility")]
    pub confidence: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64, confidence: f64) -> Self {
        Self { x, y, z, confidence }
    }

    /// A landmark at the origin with zero confidence
    pub fn hidden() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    pub fn is_visible(&self, threshold: f64) -> bool {
        self.confidence >= threshold
    }

    pub fn to_point(&self) -> Point3D {
        Point3D::new(self.x, self.y, self.z).with_visibility(self.confidence)
    }
}

/// Semantic landmark indices of the 33-point body topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkIndex {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl LandmarkIndex {
    /// All indices in topology order
    pub const ALL: [LandmarkIndex; LANDMARK_COUNT] = [
        Self::Nose,
        Self::LeftEyeInner,
        Self::LeftEye,
        Self::LeftEyeOuter,
        Self::RightEyeInner,
        Self::RightEye,
        Self::RightEyeOuter,
        Self::LeftEar,
        Self::RightEar,
        Self::MouthLeft,
        Self::MouthRight,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftPinky,
        Self::RightPinky,
        Self::LeftIndex,
        Self::RightIndex,
        Self::LeftThumb,
        Self::RightThumb,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
        Self::LeftHeel,
        Self::RightHeel,
        Self::LeftFootIndex,
        Self::RightFootIndex,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Get landmark name
    pub fn name(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEyeInner => "left_eye_inner",
            Self::LeftEye => "left_eye",
            Self::LeftEyeOuter => "left_eye_outer",
            Self::RightEyeInner => "right_eye_inner",
            Self::RightEye => "right_eye",
            Self::RightEyeOuter => "right_eye_outer",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::MouthLeft => "mouth_left",
            Self::MouthRight => "mouth_right",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftPinky => "left_pinky",
            Self::RightPinky => "right_pinky",
            Self::LeftIndex => "left_index",
            Self::RightIndex => "right_index",
            Self::LeftThumb => "left_thumb",
            Self::RightThumb => "right_thumb",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
            Self::LeftHeel => "left_heel",
            Self::RightHeel => "right_heel",
            Self::LeftFootIndex => "left_foot_index",
            Self::RightFootIndex => "right_foot_index",
        }
    }
}

/// Wire shapes accepted for a frame: a bare landmark list, or an object
/// with an optional timestamp.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawFrame {
    Bare(Vec<Landmark>),
    Stamped {
        landmarks: Vec<Landmark>,
        #[serde(default)]
        timestamp_ms: Option<u64>,
    },
}

/// One detector output: 33 landmarks and an optional capture time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFrame")]
pub struct LandmarkFrame {
    landmarks: Vec<Landmark>,

    /// Capture time in milliseconds, if the detector reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp_ms: Option<u64>,
}

impl TryFrom<RawFrame> for LandmarkFrame {
    type Error = FrameError;

    fn try_from(raw: RawFrame) -> Result<Self, Self::Error> {
        match raw {
            RawFrame::Bare(landmarks) => LandmarkFrame::new(landmarks),
            RawFrame::Stamped {
                landmarks,
                timestamp_ms,
            } => Ok(LandmarkFrame::new(landmarks)?.with_timestamp(timestamp_ms)),
        }
    }
}

impl LandmarkFrame {
    /// Build a frame, rejecting anything but the full topology
    pub fn new(landmarks: Vec<Landmark>) -> Result<Self, FrameError> {
        if landmarks.len() != LANDMARK_COUNT {
            return Err(FrameError::WrongLandmarkCount {
                expected: LANDMARK_COUNT,
                actual: landmarks.len(),
            });
        }
        Ok(Self {
            landmarks,
            timestamp_ms: None,
        })
    }

    /// A frame where the detector saw nothing
    pub fn empty() -> Self {
        Self {
            landmarks: vec![Landmark::hidden(); LANDMARK_COUNT],
            timestamp_ms: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp_ms: Option<u64>) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    pub fn timestamp_ms(&self) -> Option<u64> {
        self.timestamp_ms
    }

    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    pub fn get(&self, index: LandmarkIndex) -> &Landmark {
        &self.landmarks[index.index()]
    }

    /// Replace one landmark (used by hosts that patch detector output)
    pub fn set(&mut self, index: LandmarkIndex, landmark: Landmark) {
        self.landmarks[index.index()] = landmark;
    }

    /// The landmark if its confidence clears `threshold`
    pub fn visible(&self, index: LandmarkIndex, threshold: f64) -> Option<&Landmark> {
        let landmark = self.get(index);
        landmark.is_visible(threshold).then_some(landmark)
    }

    pub fn point(&self, index: LandmarkIndex) -> Point3D {
        self.get(index).to_point()
    }

    pub fn visible_point(&self, index: LandmarkIndex, threshold: f64) -> Option<Point3D> {
        self.visible(index, threshold).map(Landmark::to_point)
    }

    /// Number of landmarks at or above `threshold`
    pub fn visible_count(&self, threshold: f64) -> usize {
        self.landmarks
            .iter()
            .filter(|l| l.is_visible(threshold))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_indices() {
        assert_eq!(LandmarkIndex::Nose.index(), 0);
        assert_eq!(LandmarkIndex::LeftShoulder.index(), 11);
        assert_eq!(LandmarkIndex::RightHip.index(), 24);
        assert_eq!(LandmarkIndex::RightFootIndex.index(), 32);
        for (i, idx) in LandmarkIndex::ALL.iter().enumerate() {
            assert_eq!(idx.index(), i);
        }
    }

    #[test]
    fn test_wrong_landmark_count_rejected() {
        let err = LandmarkFrame::new(vec![Landmark::hidden(); 17]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::WrongLandmarkCount {
                expected: 33,
                actual: 17
            }
        ));
    }

    #[test]
    fn test_visibility_gate() {
        let mut frame = LandmarkFrame::empty();
        frame.set(LandmarkIndex::Nose, Landmark::new(0.5, 0.2, 0.0, 0.9));
        frame.set(LandmarkIndex::LeftEar, Landmark::new(0.5, 0.2, 0.0, 0.49));

        assert!(frame.visible(LandmarkIndex::Nose, 0.5).is_some());
        assert!(frame.visible(LandmarkIndex::LeftEar, 0.5).is_none());
        assert_eq!(frame.visible_count(0.5), 1);
    }

    #[test]
    fn test_deserialize_bare_and_stamped() {
        let landmark = r#"{"x":0.1,"y":0.2,"z":0.0,"visibility":0.9}"#;
        let list = vec![landmark; 33].join(",");

        let bare: LandmarkFrame = serde_json::from_str(&format!("[{}]", list)).unwrap();
        assert_eq!(bare.landmarks().len(), 33);
        assert_eq!(bare.get(LandmarkIndex::Nose).confidence, 0.9);
        assert_eq!(bare.timestamp_ms(), None);

        let stamped: LandmarkFrame = serde_json::from_str(&format!(
            r#"{{"landmarks":[{}],"timestamp_ms":1200}}"#,
            list
        ))
        .unwrap();
        assert_eq!(stamped.timestamp_ms(), Some(1200));
    }

    #[test]
    fn test_deserialize_short_frame_fails() {
        let json = r#"[{"x":0.1,"y":0.2,"confidence":0.9}]"#;
        assert!(serde_json::from_str::<LandmarkFrame>(json).is_err());
    }
}
