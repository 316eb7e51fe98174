use hrl_core::{HrlError, HrlResult};
use serde::Serialize;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Rates at or below this are treated as dropped frames or startup noise.
pub const DEFAULT_MIN_RATE_HZ: f64 = 100.0;

/// Rolling window of frame intervals.
#[derive(Debug, Clone)]
pub struct FrameLog {
    pub frame_times: VecDeque<Duration>,
    pub max_samples: usize,
}

impl FrameLog {
    pub fn new(max_samples: usize) -> Self {
        Self {
            frame_times: VecDeque::with_capacity(max_samples),
            max_samples,
        }
    }

    pub fn record_frame(&mut self, d: Duration) {
        if self.frame_times.len() >= self.max_samples {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(d);
    }

    pub fn len(&self) -> usize {
        self.frame_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame_times.is_empty()
    }

    /// Intervals in seconds, oldest first.
    pub fn deltas(&self) -> Vec<f64> {
        self.frame_times.iter().map(Duration::as_secs_f64).collect()
    }
}

impl Default for FrameLog {
    fn default() -> Self {
        Self::new(1000)
    }
}

/// Refresh rate derived from a series of frame intervals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateSummary {
    /// Frames that passed the rate threshold.
    pub count: usize,
    /// Frames dropped by the threshold.
    pub rejected: usize,
    pub mean_hz: f64,
    /// Sample standard deviation; zero with fewer than two frames.
    pub std_hz: f64,
}

impl RateSummary {
    /// Summarizes the rates `1 / delta` that exceed `min_rate_hz`.
    pub fn from_deltas(deltas: &[f64], min_rate_hz: f64) -> Self {
        let rates: Vec<f64> = deltas
            .iter()
            .filter(|d| **d > 0.0)
            .map(|d| 1.0 / d)
            .filter(|r| *r > min_rate_hz)
            .collect();
        let count = rates.len();
        let rejected = deltas.len() - count;
        if count == 0 {
            return Self {
                count,
                rejected,
                mean_hz: 0.0,
                std_hz: 0.0,
            };
        }
        let mean = rates.iter().sum::<f64>() / count as f64;
        let std = if count > 1 {
            let ss = rates.iter().map(|r| (r - mean).powi(2)).sum::<f64>();
            (ss / (count - 1) as f64).sqrt()
        } else {
            0.0
        };
        Self {
            count,
            rejected,
            mean_hz: mean,
            std_hz: std,
        }
    }
}

/// Reads a frame-interval log: one interval in seconds per line.
pub fn read_deltas(path: &Path) -> HrlResult<Vec<f64>> {
    let content = fs::read_to_string(path)?;
    let mut deltas = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let value = line.trim();
        if value.is_empty() {
            continue;
        }
        let delta = value.parse::<f64>().map_err(|_| HrlError::NotANumber {
            path: path.to_path_buf(),
            line: idx + 1,
            value: value.to_string(),
        })?;
        deltas.push(delta);
    }
    tracing::debug!(path = %path.display(), frames = deltas.len(), "read frame intervals");
    Ok(deltas)
}
