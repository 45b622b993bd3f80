//! posturers: posture analysis and exercise-session tracking over body
//! landmark streams.
//!
//! Frames of 33 body landmarks go in; graded posture scores, left/right
//! balance reports and exercise-session effects come out. Rendering, speech
//! synthesis and persistence stay with the host.

pub mod asymmetry;
pub mod calibration;
pub mod config;
pub mod error;
pub mod exercise;
pub mod geometry;
pub mod landmarks;
pub mod logging;
pub mod metrics;
pub mod monitor;
pub mod pose;
pub mod scoring;
pub mod session;
pub mod smoothing;

// Re-export commonly used types for convenience
pub use asymmetry::{AsymmetryAnalyzer, BodyBalanceReport, RomNorms};
pub use calibration::{CalibrationProfile, Calibrator};
pub use config::AnalysisConfig;
pub use error::{PostureError, Result};
pub use exercise::{ExerciseCatalog, ExerciseDefinition, ExerciseKind};
pub use landmarks::{Landmark, LandmarkFrame, LandmarkIndex};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use metrics::{BodyMetrics, JointAngles, Metric};
pub use monitor::{MonitorUpdate, PostureMonitor, PostureSnapshot};
pub use pose::{PoseClassifier, PoseDefinition, PoseMatch, PredicateClassifier};
pub use scoring::{Grade, PostureScorer};
pub use session::{
    dispatch_effects, CycleSession, ExerciseResult, ExerciseSession, HoldSession, ResultSink,
    SessionConfig, SessionEffect, SessionFactory, SessionPhase, VoiceSink,
};
pub use smoothing::Smoother;
