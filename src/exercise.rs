//! Exercise definitions and catalog
//!
//! An exercise is either a timed hold (optionally watched by a target pose)
//! or a sequence of poses performed in order for a number of cycles. Both
//! run for a number of sets separated by rest periods.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{ExerciseError, Result};
use crate::pose::{library, PoseDefinition};

/// One pose of a sequence and how long it must be held
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceStep {
    pub hold_seconds: u32,
    pub pose: PoseDefinition,
}

impl SequenceStep {
    pub fn new(pose: PoseDefinition, hold_seconds: u32) -> Self {
        Self { pose, hold_seconds }
    }
}

/// How a set is performed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExerciseKind {
    /// Hold for a fixed time; the pose, if any, only feeds accuracy
    Hold {
        hold_seconds: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pose: Option<PoseDefinition>,
    },

    /// Hit every pose in order; one pass is a cycle
    Sequence {
        target_cycles: u32,
        poses: Vec<SequenceStep>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseDefinition {
    /// Stable identifier used for lookup and in results
    pub id: String,

    /// Display name, also spoken when a set is announced
    pub name: String,

    pub sets: u32,

    #[serde(default)]
    pub rest_seconds: u32,

    pub kind: ExerciseKind,
}

impl ExerciseDefinition {
    pub fn hold(
        id: &str,
        name: &str,
        sets: u32,
        rest_seconds: u32,
        hold_seconds: u32,
        pose: Option<PoseDefinition>,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            sets,
            rest_seconds,
            kind: ExerciseKind::Hold { pose, hold_seconds },
        }
    }

    pub fn sequence(
        id: &str,
        name: &str,
        sets: u32,
        rest_seconds: u32,
        target_cycles: u32,
        poses: Vec<SequenceStep>,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            sets,
            rest_seconds,
            kind: ExerciseKind::Sequence {
                poses,
                target_cycles,
            },
        }
    }

    /// Target poses in order; empty for an unwatched hold
    pub fn poses(&self) -> Vec<&PoseDefinition> {
        match &self.kind {
            ExerciseKind::Hold { pose, .. } => pose.iter().collect(),
            ExerciseKind::Sequence { poses, .. } => poses.iter().map(|s| &s.pose).collect(),
        }
    }

    /// Fail on the first value that would make a session meaningless
    pub fn validate(&self) -> std::result::Result<(), ExerciseError> {
        let invalid = |parameter: &str, value: u32| ExerciseError::InvalidParameter {
            id: self.id.clone(),
            parameter: parameter.to_string(),
            value: value.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(ExerciseError::InvalidParameter {
                id: self.name.clone(),
                parameter: "id".to_string(),
                value: format!("{:?}", self.id),
            });
        }
        if self.sets == 0 {
            return Err(invalid("sets", self.sets));
        }

        match &self.kind {
            ExerciseKind::Hold { hold_seconds, .. } => {
                if *hold_seconds == 0 {
                    return Err(invalid("hold_seconds", *hold_seconds));
                }
            }
            ExerciseKind::Sequence {
                poses,
                target_cycles,
            } => {
                if poses.is_empty() {
                    return Err(ExerciseError::EmptyPoseList {
                        id: self.id.clone(),
                    });
                }
                if *target_cycles == 0 {
                    return Err(invalid("target_cycles", *target_cycles));
                }
                if let Some(step) = poses.iter().find(|s| s.hold_seconds == 0) {
                    return Err(ExerciseError::InvalidParameter {
                        id: self.id.clone(),
                        parameter: format!("{}.hold_seconds", step.pose.name),
                        value: "0".to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Validated set of exercises with unique ids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CatalogFile", into = "CatalogFile")]
pub struct ExerciseCatalog {
    exercises: Vec<ExerciseDefinition>,
}

/// On-disk shape: a `[[exercise]]` array of tables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default, rename = "exercise")]
    exercises: Vec<ExerciseDefinition>,
}

impl TryFrom<CatalogFile> for ExerciseCatalog {
    type Error = ExerciseError;

    fn try_from(file: CatalogFile) -> std::result::Result<Self, Self::Error> {
        ExerciseCatalog::new(file.exercises)
    }
}

impl From<ExerciseCatalog> for CatalogFile {
    fn from(catalog: ExerciseCatalog) -> Self {
        CatalogFile {
            exercises: catalog.exercises,
        }
    }
}

impl ExerciseCatalog {
    pub fn new(exercises: Vec<ExerciseDefinition>) -> std::result::Result<Self, ExerciseError> {
        let mut seen = HashSet::new();
        for exercise in &exercises {
            exercise.validate()?;
            if !seen.insert(exercise.id.as_str()) {
                return Err(ExerciseError::DuplicateId {
                    id: exercise.id.clone(),
                });
            }
        }
        Ok(Self { exercises })
    }

    /// Exercises shipped with the crate
    pub fn builtin() -> Self {
        Self {
            exercises: vec![
                ExerciseDefinition::hold("chin_tuck", "Chin Tuck", 3, 10, 10, None),
                ExerciseDefinition::hold("plank", "Plank", 3, 30, 30, None),
                ExerciseDefinition::hold(
                    "wall_sit",
                    "Wall Sit",
                    3,
                    30,
                    45,
                    Some(library::wall_sit()),
                ),
                ExerciseDefinition::sequence(
                    "squat",
                    "Bodyweight Squat",
                    3,
                    45,
                    10,
                    vec![
                        SequenceStep::new(library::standing(), 1),
                        SequenceStep::new(library::squat_bottom(), 2),
                    ],
                ),
                ExerciseDefinition::sequence(
                    "arm_raise",
                    "Arm Raise",
                    2,
                    30,
                    8,
                    vec![
                        SequenceStep::new(library::arms_lateral(), 2),
                        SequenceStep::new(library::arms_overhead(), 2),
                    ],
                ),
            ],
        }
    }

    /// Parse and validate a TOML catalog
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn get(&self, id: &str) -> std::result::Result<&ExerciseDefinition, ExerciseError> {
        self.exercises
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| ExerciseError::UnknownExercise { id: id.to_string() })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExerciseDefinition> {
        self.exercises.iter()
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }
}

impl Default for ExerciseCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
