//! Per-metric moving-average smoothing
//!
//! One [`Smoother`] belongs to one session. A missing reading (landmark
//! hidden this frame) is not pushed: the smoother keeps reporting the mean
//! of the history it has, so a single dropped frame holds the last trend
//! instead of snapping to zero.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::error::ConfigError;

/// Smoothing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Readings averaged per metric
    pub window_size: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self { window_size: 5 }
    }
}

impl SmoothingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::invalid(
                "smoothing.window_size",
                self.window_size,
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Bounded moving average keyed by metric name
#[derive(Debug, Clone)]
pub struct Smoother {
    window_size: usize,
    history: HashMap<String, VecDeque<f64>>,
}

impl Smoother {
    /// Create a smoother; a zero window is a configuration error
    pub fn new(window_size: usize) -> Result<Self, ConfigError> {
        SmoothingConfig { window_size }.validate()?;
        Ok(Self {
            window_size,
            history: HashMap::new(),
        })
    }

    pub fn from_config(config: &SmoothingConfig) -> Result<Self, ConfigError> {
        Self::new(config.window_size)
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Push `value` (if present) and return the window mean.
    ///
    /// Returns `None` only when the metric has no history at all.
    pub fn smooth(&mut self, metric: &str, value: Option<f64>) -> Option<f64> {
        match value {
            Some(v) => {
                let window = self.history.entry(metric.to_string()).or_default();
                window.push_back(v);
                while window.len() > self.window_size {
                    window.pop_front();
                }
                Some(mean(window))
            }
            None => self
                .history
                .get(metric)
                .filter(|w| !w.is_empty())
                .map(mean),
        }
    }

    /// Current mean without pushing anything
    pub fn current(&self, metric: &str) -> Option<f64> {
        self.history.get(metric).filter(|w| !w.is_empty()).map(mean)
    }

    /// Readings currently held for `metric`
    pub fn len(&self, metric: &str) -> usize {
        self.history.get(metric).map(VecDeque::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.history.values().all(VecDeque::is_empty)
    }

    pub fn reset(&mut self, metric: &str) {
        self.history.remove(metric);
    }

    pub fn reset_all(&mut self) {
        self.history.clear();
    }
}

fn mean(window: &VecDeque<f64>) -> f64 {
    window.iter().sum::<f64>() / window.len() as f64
}
