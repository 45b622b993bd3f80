//! Warm-up calibration
//!
//! The first few seconds of a session establish a per-metric baseline: the
//! user's own neutral posture. The baseline is the median of the warm-up
//! samples, so one bad detector frame cannot drag it; the population
//! standard deviation decides whether the user held still enough for the
//! baseline to be trusted.
//!
//! An untrusted calibration is a quality signal, not a failure. Consumers
//! fall back to a configured default baseline and flag low confidence.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::metrics::{BodyMetrics, Metric};

/// Warm-up calibration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Frames collected before the baseline is computed (~3 s at 5 fps)
    pub warmup_frames: u32,

    /// Minimum samples for a trustworthy baseline
    pub min_samples: u32,

    /// Maximum spread for a trustworthy baseline, for metrics in cm
    pub max_std_dev: f64,

    /// Maximum spread for a trustworthy baseline, for angle metrics in degrees
    pub max_std_dev_deg: f64,

    /// Drop IQR outliers before computing the baseline
    pub remove_outliers: bool,

    /// Baselines used when calibration is not trustworthy
    pub default_baselines: DefaultBaselines,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            warmup_frames: 15,
            min_samples: 10,
            max_std_dev: 0.05,
            max_std_dev_deg: 1.0,
            remove_outliers: false,
            default_baselines: DefaultBaselines::default(),
        }
    }
}

impl CalibrationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.warmup_frames == 0 {
            return Err(ConfigError::invalid(
                "calibration.warmup_frames",
                self.warmup_frames,
                "must be at least 1",
            ));
        }
        if self.min_samples == 0 {
            return Err(ConfigError::invalid(
                "calibration.min_samples",
                self.min_samples,
                "must be at least 1",
            ));
        }
        if self.max_std_dev < 0.0 {
            return Err(ConfigError::invalid(
                "calibration.max_std_dev",
                self.max_std_dev,
                "must not be negative",
            ));
        }
        if self.max_std_dev_deg < 0.0 {
            return Err(ConfigError::invalid(
                "calibration.max_std_dev_deg",
                self.max_std_dev_deg,
                "must not be negative",
            ));
        }
        Ok(())
    }

    /// Spread tolerance in the metric's own unit
    pub fn max_std_dev_for(&self, metric: Metric) -> f64 {
        match metric {
            Metric::KneeAngle | Metric::TrunkTilt => self.max_std_dev_deg,
            Metric::ForwardHead | Metric::ShoulderTilt | Metric::PelvisTilt => self.max_std_dev,
        }
    }
}

/// Neutral-posture reference values per metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultBaselines {
    pub forward_head: f64,
    pub shoulder_tilt: f64,
    pub pelvis_tilt: f64,
    pub knee_angle: f64,
    pub trunk_tilt: f64,
}

impl Default for DefaultBaselines {
    fn default() -> Self {
        Self {
            forward_head: 0.0,
            shoulder_tilt: 0.0,
            pelvis_tilt: 0.0,
            knee_angle: 178.0,
            trunk_tilt: 0.0,
        }
    }
}

impl DefaultBaselines {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::ForwardHead => self.forward_head,
            Metric::ShoulderTilt => self.shoulder_tilt,
            Metric::PelvisTilt => self.pelvis_tilt,
            Metric::KneeAngle => self.knee_angle,
            Metric::TrunkTilt => self.trunk_tilt,
        }
    }
}

/// Baseline for one metric; immutable once produced
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    /// Median of the accepted samples
    pub baseline: f64,

    /// Samples the baseline was computed from
    pub sample_count: u32,

    /// Whether the baseline can be trusted
    pub is_valid: bool,

    /// Population standard deviation of the samples
    pub std_dev: f64,
}

impl CalibrationResult {
    /// The calibrated baseline if trusted, otherwise `default`
    pub fn effective_baseline(&self, default: f64) -> f64 {
        if self.is_valid {
            self.baseline
        } else {
            default
        }
    }
}

/// Median of the samples; even counts average the two middle values
pub fn median(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let sorted = sorted(samples);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// First and third quartiles by linear interpolation between order statistics
pub fn quartiles(samples: &[f64]) -> Option<(f64, f64)> {
    if samples.is_empty() {
        return None;
    }
    let sorted = sorted(samples);
    Some((percentile(&sorted, 0.25), percentile(&sorted, 0.75)))
}

/// Keep samples within `[Q1 - 1.5·IQR, Q3 + 1.5·IQR]`.
///
/// Fewer than four samples have no meaningful quartiles and pass through.
pub fn remove_outliers_iqr(samples: &[f64]) -> Vec<f64> {
    if samples.len() < 4 {
        return samples.to_vec();
    }
    let Some((q1, q3)) = quartiles(samples) else {
        return samples.to_vec();
    };
    let iqr = q3 - q1;
    let (low, high) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);
    samples
        .iter()
        .copied()
        .filter(|v| (low..=high).contains(v))
        .collect()
}

/// Turn a warm-up window into a baseline, judged against `max_std_dev`
pub fn calibrate(samples: &[f64], config: &CalibrationConfig) -> CalibrationResult {
    calibrate_within(samples, config, config.max_std_dev)
}

fn calibrate_within(
    samples: &[f64],
    config: &CalibrationConfig,
    max_std_dev: f64,
) -> CalibrationResult {
    let filtered;
    let samples = if config.remove_outliers {
        filtered = remove_outliers_iqr(samples);
        &filtered[..]
    } else {
        samples
    };

    let Some(baseline) = median(samples) else {
        return CalibrationResult {
            baseline: 0.0,
            sample_count: 0,
            is_valid: false,
            std_dev: 0.0,
        };
    };

    let std_dev = samples.iter().population_std_dev();
    let sample_count = samples.len() as u32;

    CalibrationResult {
        baseline,
        sample_count,
        is_valid: sample_count >= config.min_samples && std_dev <= max_std_dev,
        std_dev,
    }
}

fn sorted(samples: &[f64]) -> Vec<f64> {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (pos - lower as f64)
}

/// Calibrated baselines for one session; share read-only via `Arc`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
    results: BTreeMap<Metric, CalibrationResult>,
}

impl CalibrationProfile {
    pub fn get(&self, metric: Metric) -> Option<&CalibrationResult> {
        self.results.get(&metric)
    }

    /// Trusted baseline, or the configured default
    pub fn baseline(&self, metric: Metric, defaults: &DefaultBaselines) -> f64 {
        self.results
            .get(&metric)
            .map(|r| r.effective_baseline(defaults.get(metric)))
            .unwrap_or_else(|| defaults.get(metric))
    }

    /// Metrics without a trusted baseline
    pub fn low_confidence_metrics(&self) -> Vec<Metric> {
        Metric::ALL
            .iter()
            .copied()
            .filter(|m| !self.results.get(m).map(|r| r.is_valid).unwrap_or(false))
            .collect()
    }

    pub fn is_fully_valid(&self) -> bool {
        self.low_confidence_metrics().is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Metric, &CalibrationResult)> {
        self.results.iter()
    }
}

/// Accumulates warm-up samples for every metric of a session
#[derive(Debug, Clone)]
pub struct Calibrator {
    config: CalibrationConfig,
    samples: BTreeMap<Metric, Vec<f64>>,
    frames_seen: u32,
}

impl Calibrator {
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            samples: BTreeMap::new(),
            frames_seen: 0,
        }
    }

    /// Record one frame's readings; hidden metrics contribute nothing
    pub fn add_frame(&mut self, metrics: &BodyMetrics) {
        self.frames_seen += 1;
        for metric in Metric::ALL {
            if let Some(value) = metrics.get(metric) {
                self.samples.entry(metric).or_default().push(value);
            }
        }
    }

    pub fn frames_seen(&self) -> u32 {
        self.frames_seen
    }

    pub fn is_ready(&self) -> bool {
        self.frames_seen >= self.config.warmup_frames
    }

    /// Fraction of the warm-up window collected, in [0, 1]
    pub fn progress(&self) -> f64 {
        (self.frames_seen as f64 / self.config.warmup_frames as f64).min(1.0)
    }

    /// Compute every baseline and reset for a later re-calibration
    pub fn finish(&mut self) -> CalibrationProfile {
        let samples = std::mem::take(&mut self.samples);
        self.frames_seen = 0;

        let results = Metric::ALL
            .iter()
            .map(|&metric| {
                let values = samples.get(&metric).map(Vec::as_slice).unwrap_or(&[]);
                let result =
                    calibrate_within(values, &self.config, self.config.max_std_dev_for(metric));
                if !result.is_valid {
                    tracing::warn!(
                        metric = metric.key(),
                        samples = result.sample_count,
                        std_dev = result.std_dev,
                        "Calibration not trustworthy, using default baseline"
                    );
                }
                (metric, result)
            })
            .collect();

        CalibrationProfile { results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WITH_OUTLIER: [f64; 10] = [10.0, 10.4, 9.8, 10.1, 50.0, 10.2, 9.9, 10.3, 10.0, 10.1];

    #[test]
    fn test_median_odd_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_baseline_resists_outlier() {
        let result = calibrate(&WITH_OUTLIER, &CalibrationConfig::default());

        assert!((result.baseline - 10.05).abs() <= 0.06, "baseline {}", result.baseline);
        assert_eq!(result.sample_count, 10);
        // The outlier blows the spread far past 0.05
        assert!(result.std_dev > 0.05);
        assert!(!result.is_valid);
    }

    #[test]
    fn test_outlier_removal_before_baseline() {
        let filtered = remove_outliers_iqr(&WITH_OUTLIER);
        assert_eq!(filtered.len(), 9);
        assert!(!filtered.contains(&50.0));

        let config = CalibrationConfig {
            remove_outliers: true,
            min_samples: 9,
            max_std_dev: 0.2,
            ..Default::default()
        };
        let result = calibrate(&WITH_OUTLIER, &config);
        assert_eq!(result.sample_count, 9);
        assert_eq!(result.baseline, 10.1);
        assert!(result.is_valid);
    }

    #[test]
    fn test_steady_samples_valid() {
        let samples = [0.50, 0.51, 0.49, 0.50, 0.50, 0.52, 0.48, 0.50, 0.51, 0.49];
        let result = calibrate(&samples, &CalibrationConfig::default());
        assert!(result.is_valid);
        assert!((result.baseline - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_too_few_samples_invalid() {
        let result = calibrate(&[1.0, 1.0, 1.0], &CalibrationConfig::default());
        assert_eq!(result.std_dev, 0.0);
        assert!(!result.is_valid);
        assert_eq!(result.effective_baseline(7.0), 7.0);
    }

    #[test]
    fn test_empty_samples() {
        let result = calibrate(&[], &CalibrationConfig::default());
        assert_eq!(result.sample_count, 0);
        assert!(!result.is_valid);
    }

    #[test]
    fn test_quartiles_interpolate() {
        let (q1, q3) = quartiles(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!((q1, q3), (2.0, 4.0));
    }

    #[test]
    fn test_calibrator_profile() {
        let mut calibrator = Calibrator::new(CalibrationConfig {
            warmup_frames: 10,
            ..Default::default()
        });

        for i in 0..10 {
            assert!(!calibrator.is_ready());
            let metrics = BodyMetrics {
                shoulder_tilt: Some(1.0 + if i % 2 == 0 { 0.01 } else { -0.01 }),
                knee_angle: Some(170.0 + i as f64),
                ..Default::default()
            };
            calibrator.add_frame(&metrics);
        }
        assert!(calibrator.is_ready());
        assert_eq!(calibrator.progress(), 1.0);

        let profile = calibrator.finish();
        let defaults = DefaultBaselines::default();

        assert!(profile.get(Metric::ShoulderTilt).unwrap().is_valid);
        assert!((profile.baseline(Metric::ShoulderTilt, &defaults) - 1.0).abs() < 1e-9);

        // Knee samples drift by a degree per frame: untrusted, default used
        assert!(!profile.get(Metric::KneeAngle).unwrap().is_valid);
        assert_eq!(profile.baseline(Metric::KneeAngle, &defaults), 178.0);

        // Forward head never seen
        assert_eq!(profile.get(Metric::ForwardHead).unwrap().sample_count, 0);
        assert!(profile.low_confidence_metrics().contains(&Metric::ForwardHead));
        assert!(!profile.is_fully_valid());

        assert_eq!(calibrator.frames_seen(), 0);
    }

    #[test]
    fn test_angle_metrics_use_degree_tolerance() {
        let mut calibrator = Calibrator::new(CalibrationConfig {
            warmup_frames: 10,
            ..Default::default()
        });
        for i in 0..10 {
            // ±0.3° of sway on the knees, ±0.3 cm on the shoulders
            let sway = if i % 2 == 0 { 0.3 } else { -0.3 };
            calibrator.add_frame(&BodyMetrics {
                knee_angle: Some(176.0 + sway),
                shoulder_tilt: Some(1.0 + sway),
                ..Default::default()
            });
        }

        let profile = calibrator.finish();
        let knee = profile.get(Metric::KneeAngle).unwrap();
        assert!(knee.is_valid, "knee std dev {}", knee.std_dev);
        assert!((knee.baseline - 176.0).abs() < 1e-9);
        assert!(!profile.get(Metric::ShoulderTilt).unwrap().is_valid);
    }
}
