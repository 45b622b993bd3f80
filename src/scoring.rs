//! Posture scoring engine
//!
//! Maps physical metric values to 0–100 scores through piecewise-linear
//! breakpoint curves, grades each item, and combines the items into one
//! composite posture score.
//!
//! ## Curves
//! Each curve is an ordered table of `(threshold, score)` breakpoints:
//! - at or below the first threshold the first score applies
//! - between thresholds the score is linearly interpolated
//! - beyond the last threshold it decays by `tail_slope` per unit down to
//!   `floor`
//!
//! Centered curves (knee angle) evaluate the absolute deviation from the
//! center instead of the raw value.
//!
//! ## Composite
//! Weighted average of the item scores, then penalties in this order:
//! 1. two or more Warning items: −3 per Warning beyond the first
//! 2. any Danger item: −5 each
//! 3. shoulders AND pelvis both worse than Good: −5
//! 4. forward-head score below 50: −3
//!
//! The result is clamped to [0, 100] and graded against stricter bands than
//! the individual items.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ConfigError;
use crate::geometry::round1;
use crate::metrics::{BodyMetrics, Metric};

/// Metrics that take part in posture scoring
pub const SCORED_METRICS: [Metric; 4] = [
    Metric::ForwardHead,
    Metric::ShoulderTilt,
    Metric::PelvisTilt,
    Metric::KneeAngle,
];

/// Traffic-light grade of a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    Good,
    Warning,
    Danger,
}

impl Grade {
    pub fn from_score(score: f64, thresholds: &GradeThresholds) -> Self {
        if score >= thresholds.good {
            Grade::Good
        } else if score >= thresholds.warning {
            Grade::Warning
        } else {
            Grade::Danger
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grade::Good => write!(f, "Good"),
            Grade::Warning => write!(f, "Warning"),
            Grade::Danger => write!(f, "Danger"),
        }
    }
}

/// Lower score bounds for Good and Warning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeThresholds {
    pub good: f64,
    pub warning: f64,
}

impl GradeThresholds {
    /// Bands for a single metric
    pub const ITEM: GradeThresholds = GradeThresholds {
        good: 75.0,
        warning: 55.0,
    };

    /// Bands for the composite; the aggregate bar sits higher
    pub const OVERALL: GradeThresholds = GradeThresholds {
        good: 85.0,
        warning: 65.0,
    };

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if !(0.0..=100.0).contains(&self.warning)
            || !(0.0..=100.0).contains(&self.good)
            || self.good < self.warning
        {
            return Err(ConfigError::invalid(
                name,
                format!("good={}, warning={}", self.good, self.warning),
                "need 0 <= warning <= good <= 100",
            ));
        }
        Ok(())
    }
}

/// Six text bands, from ideal to severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoreBand {
    Ideal,
    Good,
    Fair,
    Mild,
    Moderate,
    Severe,
}

impl ScoreBand {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 95.0 => ScoreBand::Ideal,
            s if s >= 85.0 => ScoreBand::Good,
            s if s >= 75.0 => ScoreBand::Fair,
            s if s >= 65.0 => ScoreBand::Mild,
            s if s >= 55.0 => ScoreBand::Moderate,
            _ => ScoreBand::Severe,
        }
    }
}

/// One `(threshold, score)` point of a curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub value: f64,
    pub score: f64,
}

const fn bp(value: f64, score: f64) -> Breakpoint {
    Breakpoint { value, score }
}

/// Piecewise-linear, non-increasing value → score mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringCurve {
    /// Evaluate `|value - center|` instead of `|value|`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<f64>,

    /// Score lost per unit beyond the last breakpoint
    pub tail_slope: f64,

    /// Lowest score the tail can reach
    pub floor: f64,

    /// Ascending thresholds with non-increasing scores
    pub breakpoints: Vec<Breakpoint>,
}

impl ScoringCurve {
    /// Forward-head distance in cm
    pub fn forward_head() -> Self {
        Self {
            center: None,
            tail_slope: 9.0,
            floor: 10.0,
            breakpoints: vec![
                bp(1.0, 100.0),
                bp(2.0, 95.0),
                bp(2.5, 88.0),
                bp(3.0, 80.0),
                bp(4.0, 70.0),
                bp(5.0, 55.0),
            ],
        }
    }

    /// Shoulder or pelvis height difference in cm
    pub fn tilt() -> Self {
        Self {
            center: None,
            tail_slope: 12.0,
            floor: 15.0,
            breakpoints: vec![
                bp(0.3, 100.0),
                bp(0.5, 97.0),
                bp(0.8, 93.0),
                bp(1.0, 85.0),
                bp(1.5, 75.0),
                bp(2.0, 58.0),
            ],
        }
    }

    /// Standing knee angle in degrees, ideal at 178°
    pub fn knee_angle() -> Self {
        Self {
            center: Some(178.0),
            tail_slope: 9.0,
            floor: 15.0,
            breakpoints: vec![bp(2.0, 100.0), bp(5.0, 92.0), bp(8.0, 82.0), bp(13.0, 67.0)],
        }
    }

    /// Score for a raw value; non-finite input scores the floor
    pub fn evaluate(&self, value: f64) -> f64 {
        if !value.is_finite() || self.breakpoints.is_empty() {
            return self.floor;
        }
        let x = match self.center {
            Some(center) => (value - center).abs(),
            None => value.abs(),
        };

        let first = self.breakpoints[0];
        if x <= first.value {
            return first.score.clamp(0.0, 100.0);
        }

        for pair in self.breakpoints.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if x <= hi.value {
                let t = (x - lo.value) / (hi.value - lo.value);
                return (lo.score + (hi.score - lo.score) * t).clamp(0.0, 100.0);
            }
        }

        let last = self.breakpoints[self.breakpoints.len() - 1];
        (last.score - (x - last.value) * self.tail_slope)
            .max(self.floor)
            .clamp(0.0, 100.0)
    }

    pub fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.breakpoints.is_empty() {
            return Err(ConfigError::invalid(name, "[]", "curve needs at least one breakpoint"));
        }
        for pair in self.breakpoints.windows(2) {
            if pair[1].value <= pair[0].value {
                return Err(ConfigError::invalid(
                    name,
                    pair[1].value,
                    "breakpoint thresholds must be strictly ascending",
                ));
            }
            if pair[1].score > pair[0].score {
                return Err(ConfigError::invalid(
                    name,
                    pair[1].score,
                    "breakpoint scores must not increase",
                ));
            }
        }
        if self
            .breakpoints
            .iter()
            .any(|b| !(0.0..=100.0).contains(&b.score))
        {
            return Err(ConfigError::invalid(name, "score", "scores must be within [0, 100]"));
        }
        if self.tail_slope < 0.0 || !(0.0..=100.0).contains(&self.floor) {
            return Err(ConfigError::invalid(
                name,
                format!("tail_slope={}, floor={}", self.tail_slope, self.floor),
                "tail slope must be >= 0 and floor within [0, 100]",
            ));
        }
        Ok(())
    }
}

/// Curve per scored metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveSet {
    pub forward_head: ScoringCurve,
    pub shoulder_tilt: ScoringCurve,
    pub pelvis_tilt: ScoringCurve,
    pub knee_angle: ScoringCurve,
}

impl Default for CurveSet {
    fn default() -> Self {
        Self {
            forward_head: ScoringCurve::forward_head(),
            shoulder_tilt: ScoringCurve::tilt(),
            pelvis_tilt: ScoringCurve::tilt(),
            knee_angle: ScoringCurve::knee_angle(),
        }
    }
}

impl CurveSet {
    /// Curve for `metric`; trunk tilt is not scored
    pub fn get(&self, metric: Metric) -> Option<&ScoringCurve> {
        match metric {
            Metric::ForwardHead => Some(&self.forward_head),
            Metric::ShoulderTilt => Some(&self.shoulder_tilt),
            Metric::PelvisTilt => Some(&self.pelvis_tilt),
            Metric::KneeAngle => Some(&self.knee_angle),
            Metric::TrunkTilt => None,
        }
    }
}

/// Composite weights per scored metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub forward_head: f64,
    pub shoulder_tilt: f64,
    pub pelvis_tilt: f64,
    pub knee_angle: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            forward_head: 0.35,
            shoulder_tilt: 0.25,
            pelvis_tilt: 0.25,
            knee_angle: 0.15,
        }
    }
}

impl ScoringWeights {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::ForwardHead => self.forward_head,
            Metric::ShoulderTilt => self.shoulder_tilt,
            Metric::PelvisTilt => self.pelvis_tilt,
            Metric::KneeAngle => self.knee_angle,
            Metric::TrunkTilt => 0.0,
        }
    }
}

/// Scoring settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
    pub item_grades: GradeThresholds,
    pub overall_grades: GradeThresholds,
    pub curves: CurveSet,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            item_grades: GradeThresholds::ITEM,
            overall_grades: GradeThresholds::OVERALL,
            curves: CurveSet::default(),
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let weights: Vec<f64> = SCORED_METRICS.iter().map(|&m| self.weights.get(m)).collect();
        if weights.iter().any(|w| *w < 0.0) || weights.iter().sum::<f64>() <= 0.0 {
            return Err(ConfigError::invalid(
                "scoring.weights",
                format!("{:?}", weights),
                "weights must be non-negative with a positive sum",
            ));
        }
        self.item_grades.validate("scoring.item_grades")?;
        self.overall_grades.validate("scoring.overall_grades")?;
        self.curves.forward_head.validate("scoring.curves.forward_head")?;
        self.curves.shoulder_tilt.validate("scoring.curves.shoulder_tilt")?;
        self.curves.pelvis_tilt.validate("scoring.curves.pelvis_tilt")?;
        self.curves.knee_angle.validate("scoring.curves.knee_angle")?;
        Ok(())
    }
}

/// Scored reading of one metric; a new frame produces a new item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisItem {
    pub id: Metric,
    pub raw_value: f64,
    pub score: f64,
    pub grade: Grade,
    pub band: ScoreBand,
    pub diagnosis: String,
    pub recommendation: String,
}

/// Composite penalty reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PenaltyKind {
    /// Several metrics at Warning
    MultipleWarnings,
    /// Metrics at Danger
    Danger,
    /// Shoulders and pelvis both out of line
    CorrelatedMisalignment,
    /// Forward head severe enough to load the whole chain
    SevereForwardHead,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Penalty {
    pub kind: PenaltyKind,
    pub points: f64,
}

/// Overall posture score with the penalties that shaped it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    /// Weighted average before penalties
    pub weighted_average: f64,
    pub penalties: Vec<Penalty>,
    /// Final score in [0, 100]
    pub score: f64,
    pub grade: Grade,
}

impl CompositeScore {
    pub fn total_penalty(&self) -> f64 {
        self.penalties.iter().map(|p| p.points).sum()
    }

    pub fn has_penalty(&self, kind: PenaltyKind) -> bool {
        self.penalties.iter().any(|p| p.kind == kind)
    }
}

/// Items plus composite for one set of metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostureAnalysis {
    pub items: Vec<AnalysisItem>,
    /// `None` when no scored metric was available
    pub composite: Option<CompositeScore>,
}

/// Stateless scorer over a fixed configuration
#[derive(Debug, Clone, Default)]
pub struct PostureScorer {
    config: ScoringConfig,
}

impl PostureScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score a single reading, or `None` for unscored metrics
    pub fn score_metric(&self, metric: Metric, raw_value: f64) -> Option<AnalysisItem> {
        let curve = self.config.curves.get(metric)?;
        let score = round1(curve.evaluate(raw_value));
        let band = ScoreBand::from_score(score);
        let (diagnosis, recommendation) = diagnosis_text(metric, band);

        Some(AnalysisItem {
            id: metric,
            raw_value,
            score,
            grade: Grade::from_score(score, &self.config.item_grades),
            band,
            diagnosis: diagnosis.to_string(),
            recommendation: recommendation.to_string(),
        })
    }

    /// One item per scored metric that has a reading
    pub fn score(&self, metrics: &BodyMetrics) -> Vec<AnalysisItem> {
        SCORED_METRICS
            .iter()
            .filter_map(|&m| metrics.get(m).and_then(|v| self.score_metric(m, v)))
            .collect()
    }

    /// Weighted, penalized composite of `items`.
    ///
    /// Missing metrics drop out and the remaining weights are renormalized.
    pub fn composite(&self, items: &[AnalysisItem]) -> Option<CompositeScore> {
        let weights = &self.config.weights;
        let weight_sum: f64 = items.iter().map(|i| weights.get(i.id)).sum();
        if items.is_empty() || weight_sum <= 0.0 {
            return None;
        }
        let weighted_average =
            items.iter().map(|i| weights.get(i.id) * i.score).sum::<f64>() / weight_sum;

        let count = |grade: Grade| items.iter().filter(|i| i.grade == grade).count();
        let grade_of = |metric: Metric| items.iter().find(|i| i.id == metric).map(|i| i.grade);

        let mut penalties = Vec::new();

        let warnings = count(Grade::Warning);
        if warnings >= 2 {
            penalties.push(Penalty {
                kind: PenaltyKind::MultipleWarnings,
                points: (warnings - 1) as f64 * 3.0,
            });
        }

        let dangers = count(Grade::Danger);
        if dangers >= 1 {
            penalties.push(Penalty {
                kind: PenaltyKind::Danger,
                points: dangers as f64 * 5.0,
            });
        }

        let off = |g: Option<Grade>| matches!(g, Some(g) if g != Grade::Good);
        if off(grade_of(Metric::ShoulderTilt)) && off(grade_of(Metric::PelvisTilt)) {
            penalties.push(Penalty {
                kind: PenaltyKind::CorrelatedMisalignment,
                points: 5.0,
            });
        }

        let forward_head = items.iter().find(|i| i.id == Metric::ForwardHead);
        if forward_head.map(|i| i.score < 50.0).unwrap_or(false) {
            penalties.push(Penalty {
                kind: PenaltyKind::SevereForwardHead,
                points: 3.0,
            });
        }

        let total: f64 = penalties.iter().map(|p| p.points).sum();
        let score = round1((weighted_average - total).clamp(0.0, 100.0));

        Some(CompositeScore {
            weighted_average: round1(weighted_average),
            penalties,
            score,
            grade: Grade::from_score(score, &self.config.overall_grades),
        })
    }

    /// Score every metric and combine
    pub fn analyze(&self, metrics: &BodyMetrics) -> PostureAnalysis {
        let items = self.score(metrics);
        let composite = self.composite(&items);
        PostureAnalysis { items, composite }
    }
}

/// Diagnosis and recommendation for a metric in a band
pub fn diagnosis_text(metric: Metric, band: ScoreBand) -> (&'static str, &'static str) {
    use ScoreBand::*;
    match metric {
        Metric::ForwardHead => match band {
            Ideal => (
                "Head is stacked directly over the shoulders.",
                "Keep your current head position.",
            ),
            Good => (
                "Head sits slightly ahead of the shoulders, within the normal range.",
                "Check in on your head position during long screen sessions.",
            ),
            Fair => (
                "Mild forward head posture.",
                "Practice chin tucks: draw the chin straight back, hold 5 seconds, 10 repetitions.",
            ),
            Mild => (
                "Noticeable forward head posture adds load to the neck.",
                "Raise your screen to eye level and do chin tucks several times a day.",
            ),
            Moderate => (
                "Forward head posture is straining the neck and upper back muscles.",
                "Add upper-back strengthening and chest stretches to daily chin tucks.",
            ),
            Severe => (
                "Severe forward head posture.",
                "Consider an assessment by a physiotherapist before starting loaded exercise.",
            ),
        },
        Metric::ShoulderTilt => match band {
            Ideal => (
                "Shoulders are level.",
                "Keep your current shoulder alignment.",
            ),
            Good => (
                "Shoulders are nearly level.",
                "Alternate the shoulder you carry bags on.",
            ),
            Fair => (
                "Slight shoulder height difference.",
                "Stretch the upper trapezius on the higher side.",
            ),
            Mild => (
                "One shoulder sits visibly higher than the other.",
                "Stretch the higher side and strengthen the lower side with shrugs.",
            ),
            Moderate => (
                "Marked shoulder imbalance.",
                "Follow a daily routine of side-specific stretches and check your desk setup.",
            ),
            Severe => (
                "Severe shoulder height difference.",
                "Have the imbalance assessed; scoliosis or a leg length difference may be involved.",
            ),
        },
        Metric::PelvisTilt => match band {
            Ideal => ("Pelvis is level.", "Keep your current hip alignment."),
            Good => (
                "Pelvis is nearly level.",
                "Stand with your weight spread evenly across both feet.",
            ),
            Fair => (
                "Slight pelvic tilt to one side.",
                "Avoid standing with your weight shifted onto one leg.",
            ),
            Mild => (
                "Visible lateral pelvic tilt.",
                "Strengthen the glutes on the lower side with side-lying leg raises.",
            ),
            Moderate => (
                "Marked pelvic imbalance.",
                "Combine hip abductor strengthening with quadratus lumborum stretches daily.",
            ),
            Severe => (
                "Severe pelvic tilt.",
                "Have the imbalance assessed; a leg length difference may be involved.",
            ),
        },
        Metric::KneeAngle => match band {
            Ideal => (
                "Knees are straight with healthy alignment.",
                "Keep your current stance.",
            ),
            Good => (
                "Knees are close to neutral.",
                "Keep a soft, relaxed knee when standing.",
            ),
            Fair => (
                "Knees are slightly bent or slightly locked back.",
                "Stand tall with the weight over the middle of the foot.",
            ),
            Mild => (
                "Knee alignment deviates noticeably from neutral.",
                "Strengthen quadriceps and hamstrings evenly; avoid locking the knees.",
            ),
            Moderate => (
                "Knees are markedly bent or hyperextended while standing.",
                "Work on hamstring flexibility and quadriceps control.",
            ),
            Severe => (
                "Severe knee misalignment while standing.",
                "Have the knees assessed before loaded leg exercise.",
            ),
        },
        Metric::TrunkTilt => match band {
            Ideal | Good => ("Trunk is upright.", "Keep your current trunk position."),
            Fair | Mild => (
                "Trunk leans away from vertical.",
                "Strengthen the core and check for uneven weight bearing.",
            ),
            Moderate | Severe => (
                "Trunk leans markedly away from vertical.",
                "Have your posture assessed by a professional.",
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn metrics(fh: f64, shoulder: f64, pelvis: f64, knee: f64) -> BodyMetrics {
        BodyMetrics {
            forward_head: Some(fh),
            shoulder_tilt: Some(shoulder),
            pelvis_tilt: Some(pelvis),
            knee_angle: Some(knee),
            trunk_tilt: None,
        }
    }

    #[test]
    fn test_forward_head_breakpoints() {
        let curve = ScoringCurve::forward_head();
        assert_eq!(curve.evaluate(0.0), 100.0);
        assert_eq!(curve.evaluate(1.0), 100.0);
        assert_eq!(curve.evaluate(2.0), 95.0);
        assert_eq!(curve.evaluate(5.0), 55.0);
        assert!((curve.evaluate(3.5) - 75.0).abs() < 1e-9);
        // Tail: 55 - 9/cm, floored
        assert!((curve.evaluate(6.0) - 46.0).abs() < 1e-9);
        assert_eq!(curve.evaluate(40.0), 10.0);
    }

    #[test]
    fn test_knee_curve() {
        let scorer = PostureScorer::new();
        assert_eq!(scorer.score_metric(Metric::KneeAngle, 178.0).unwrap().score, 100.0);
        assert_eq!(scorer.score_metric(Metric::KneeAngle, 176.0).unwrap().score, 100.0);
        assert_eq!(scorer.score_metric(Metric::KneeAngle, 180.0).unwrap().score, 100.0);
        assert_eq!(scorer.score_metric(Metric::KneeAngle, 173.0).unwrap().score, 92.0);
        assert_eq!(scorer.score_metric(Metric::KneeAngle, 183.0).unwrap().score, 92.0);
        assert_eq!(scorer.score_metric(Metric::KneeAngle, 170.0).unwrap().score, 82.0);
        assert_eq!(scorer.score_metric(Metric::KneeAngle, 165.0).unwrap().score, 67.0);
        assert!(scorer.score_metric(Metric::KneeAngle, 160.0).unwrap().score <= 25.0);
        assert!(scorer.score_metric(Metric::KneeAngle, 90.0).unwrap().score >= 15.0);
    }

    #[test]
    fn test_item_grades() {
        let scorer = PostureScorer::new();
        let good = scorer.score_metric(Metric::ShoulderTilt, 0.9).unwrap();
        assert_eq!(good.score, 89.0);
        assert_eq!(good.grade, Grade::Good);
        assert_eq!(good.band, ScoreBand::Good);

        let warning = scorer.score_metric(Metric::ShoulderTilt, 1.8).unwrap();
        assert_eq!(warning.score, 64.8);
        assert_eq!(warning.grade, Grade::Warning);

        let danger = scorer.score_metric(Metric::ForwardHead, 8.0).unwrap();
        assert_eq!(danger.grade, Grade::Danger);
        assert_eq!(danger.band, ScoreBand::Severe);
        assert!(danger.diagnosis.contains("Severe"));
    }

    #[test]
    fn test_trunk_tilt_not_scored() {
        let scorer = PostureScorer::new();
        assert!(scorer.score_metric(Metric::TrunkTilt, 3.0).is_none());
    }

    #[test]
    fn test_perfect_posture_composite() {
        let scorer = PostureScorer::new();
        let analysis = scorer.analyze(&metrics(0.5, 0.1, 0.1, 178.0));
        let composite = analysis.composite.unwrap();
        assert_eq!(composite.score, 100.0);
        assert_eq!(composite.grade, Grade::Good);
        assert!(composite.penalties.is_empty());
    }

    #[test]
    fn test_shoulder_and_pelvis_warnings_penalized() {
        let scorer = PostureScorer::new();
        let analysis = scorer.analyze(&metrics(0.5, 1.8, 1.8, 178.0));
        let composite = analysis.composite.unwrap();

        assert!((composite.weighted_average - 82.4).abs() < 1e-9);
        assert!(composite.has_penalty(PenaltyKind::MultipleWarnings));
        assert!(composite.has_penalty(PenaltyKind::CorrelatedMisalignment));
        assert!(!composite.has_penalty(PenaltyKind::Danger));
        assert_eq!(composite.total_penalty(), 8.0);
        assert!((composite.score - 74.4).abs() < 1e-9);
        assert_eq!(composite.grade, Grade::Warning);
    }

    #[test]
    fn test_danger_and_forward_head_penalties() {
        let scorer = PostureScorer::new();
        let analysis = scorer.analyze(&metrics(8.0, 0.1, 0.1, 178.0));
        let composite = analysis.composite.unwrap();

        assert!(composite.has_penalty(PenaltyKind::Danger));
        assert!(composite.has_penalty(PenaltyKind::SevereForwardHead));
        assert_eq!(composite.total_penalty(), 8.0);
        assert_eq!(composite.grade, Grade::Danger);
    }

    #[test]
    fn test_missing_metrics_renormalize() {
        let scorer = PostureScorer::new();
        let only_knee = BodyMetrics {
            knee_angle: Some(178.0),
            ..Default::default()
        };
        let analysis = scorer.analyze(&only_knee);
        assert_eq!(analysis.items.len(), 1);
        assert_eq!(analysis.composite.unwrap().score, 100.0);

        assert!(scorer.analyze(&BodyMetrics::default()).composite.is_none());
    }

    #[test]
    fn test_invalid_curve_rejected() {
        let mut curve = ScoringCurve::tilt();
        curve.breakpoints.swap(0, 1);
        assert!(curve.validate("test").is_err());

        let mut config = ScoringConfig::default();
        config.weights = ScoringWeights {
            forward_head: 0.0,
            shoulder_tilt: 0.0,
            pelvis_tilt: 0.0,
            knee_angle: 0.0,
        };
        assert!(config.validate().is_err());
        assert!(ScoringConfig::default().validate().is_ok());
    }

    #[test]
    fn test_every_band_has_text() {
        for metric in Metric::ALL {
            for band in [
                ScoreBand::Ideal,
                ScoreBand::Good,
                ScoreBand::Fair,
                ScoreBand::Mild,
                ScoreBand::Moderate,
                ScoreBand::Severe,
            ] {
                let (diagnosis, recommendation) = diagnosis_text(metric, band);
                assert!(!diagnosis.is_empty());
                assert!(!recommendation.is_empty());
            }
        }
    }

    proptest! {
        #[test]
        fn test_forward_head_monotonic(a in 0.0f64..30.0, b in 0.0f64..30.0) {
            let curve = ScoringCurve::forward_head();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(curve.evaluate(hi) <= curve.evaluate(lo));
        }

        #[test]
        fn test_composite_clamped(
            fh in 0.0f64..50.0,
            shoulder in 0.0f64..20.0,
            pelvis in 0.0f64..20.0,
            knee in 0.0f64..200.0,
        ) {
            let scorer = PostureScorer::new();
            let composite = scorer.analyze(&metrics(fh, shoulder, pelvis, knee)).composite.unwrap();
            prop_assert!((0.0..=100.0).contains(&composite.score));
            for item in scorer.score(&metrics(fh, shoulder, pelvis, knee)) {
                prop_assert!((0.0..=100.0).contains(&item.score));
            }
        }
    }
}
