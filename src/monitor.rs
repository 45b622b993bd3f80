//! Live posture monitoring
//!
//! [`PostureMonitor`] wires the per-frame pipeline for one session:
//! metrics extraction, warm-up calibration, smoothing, scoring and the
//! balance report. It owns its smoothing state; the calibration profile is
//! immutable once computed and can be shared with other consumers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::asymmetry::{AsymmetryAnalyzer, BodyBalanceReport};
use crate::calibration::{CalibrationProfile, Calibrator};
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::geometry::round1;
use crate::landmarks::LandmarkFrame;
use crate::metrics::{BodyMetrics, JointAngles, Metric};
use crate::scoring::{AnalysisItem, CompositeScore, PostureScorer};
use crate::smoothing::Smoother;

/// Scored view of one frame after calibration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostureSnapshot {
    /// Smoothed metric values
    pub metrics: BodyMetrics,

    /// Smoothed joint angles
    pub angles: JointAngles,

    pub items: Vec<AnalysisItem>,
    pub composite: Option<CompositeScore>,

    /// Smoothed value minus calibrated baseline, per available metric
    pub drift: BTreeMap<Metric, f64>,

    /// Metrics whose baseline fell back to the default
    pub low_confidence: Vec<Metric>,

    pub balance: BodyBalanceReport,
}

/// Result of feeding one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MonitorUpdate {
    /// Still collecting warm-up frames; progress in [0, 1]
    Calibrating { progress: f64 },
    Snapshot(Box<PostureSnapshot>),
}

/// Per-session frame pipeline.
///
/// Item scores and the composite come from the smoothed metrics on the
/// absolute cm/degree scoring curves. The calibrated baseline does not shift
/// them; it only feeds `drift` and the low-confidence flags.
pub struct PostureMonitor {
    config: AnalysisConfig,
    calibrator: Calibrator,
    profile: Option<Arc<CalibrationProfile>>,
    smoother: Smoother,
    scorer: PostureScorer,
    analyzer: AsymmetryAnalyzer,
    frames_processed: u64,
}

impl PostureMonitor {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            calibrator: Calibrator::new(config.calibration.clone()),
            profile: None,
            smoother: Smoother::from_config(&config.smoothing)?,
            scorer: PostureScorer::with_config(config.scoring.clone()),
            analyzer: AsymmetryAnalyzer::with_norms(config.rom.clone()),
            frames_processed: 0,
            config,
        })
    }

    /// Skip warm-up and score against an existing profile
    pub fn with_profile(config: AnalysisConfig, profile: Arc<CalibrationProfile>) -> Result<Self> {
        let mut monitor = Self::new(config)?;
        monitor.profile = Some(profile);
        Ok(monitor)
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn profile(&self) -> Option<Arc<CalibrationProfile>> {
        self.profile.clone()
    }

    pub fn is_calibrated(&self) -> bool {
        self.profile.is_some()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn process_frame(&mut self, frame: &LandmarkFrame) -> MonitorUpdate {
        self.frames_processed += 1;

        let raw = BodyMetrics::from_frame(frame, &self.config.metrics);
        let metrics = self.smooth_metrics(&raw);
        let angles = self.smooth_angles(frame);

        let profile = match &self.profile {
            Some(profile) => Arc::clone(profile),
            None => {
                self.calibrator.add_frame(&raw);
                if !self.calibrator.is_ready() {
                    return MonitorUpdate::Calibrating {
                        progress: self.calibrator.progress(),
                    };
                }
                let profile = Arc::new(self.calibrator.finish());
                info!(
                    frames = self.frames_processed,
                    fully_valid = profile.is_fully_valid(),
                    "Calibration complete"
                );
                self.profile = Some(Arc::clone(&profile));
                profile
            }
        };

        MonitorUpdate::Snapshot(Box::new(self.snapshot(metrics, angles, &profile)))
    }

    /// Drop the profile and all smoothing history; warm-up starts over
    pub fn recalibrate(&mut self) {
        debug!(frames = self.frames_processed, "Recalibrating posture monitor");
        self.profile = None;
        self.calibrator = Calibrator::new(self.config.calibration.clone());
        self.smoother.reset_all();
    }

    fn smooth_metrics(&mut self, raw: &BodyMetrics) -> BodyMetrics {
        let mut smoothed = BodyMetrics::default();
        for metric in Metric::ALL {
            let value = self.smoother.smooth(metric.key(), raw.get(metric));
            smoothed.set(metric, value.map(round1));
        }
        smoothed
    }

    fn smooth_angles(&mut self, frame: &LandmarkFrame) -> JointAngles {
        let mut angles = JointAngles::default();
        for (kind, value) in JointAngles::from_frame_checked(frame, &self.config.metrics) {
            let key = format!("angle.{}", kind.key());
            let smoothed = self.smoother.smooth(&key, value).map(round1);
            angles.set(kind, smoothed.unwrap_or(0.0));
        }
        angles
    }

    fn snapshot(
        &self,
        metrics: BodyMetrics,
        angles: JointAngles,
        profile: &CalibrationProfile,
    ) -> PostureSnapshot {
        let analysis = self.scorer.analyze(&metrics);
        let defaults = &self.config.calibration.default_baselines;

        let drift = Metric::ALL
            .iter()
            .filter_map(|&metric| {
                metrics
                    .get(metric)
                    .map(|value| (metric, round1(value - profile.baseline(metric, defaults))))
            })
            .collect();

        PostureSnapshot {
            metrics,
            angles,
            items: analysis.items,
            composite: analysis.composite,
            drift,
            low_confidence: profile.low_confidence_metrics(),
            balance: self.analyzer.analyze(&angles),
        }
    }
}
