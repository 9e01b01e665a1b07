//! Volume spike detection against a trailing rolling mean.
//!
//! The baseline is the simple mean of the most recent `window` observations
//! *including* the latest one, so a spike raises its own baseline. Partial
//! windows are never evaluated.

use serde::{Deserialize, Serialize};

use rd_types::{RiskError, RiskResult};

/// Outcome of checking the latest volume against its rolling mean
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeCheck {
    pub latest: f64,
    pub rolling_mean: f64,
    /// `latest / rolling_mean`; infinite when the mean is zero and the latest volume is not.
    pub multiple: f64,
    pub unusual: bool,
}

/// Rolling-mean volume anomaly detector
///
/// Only constructible through [`VolumeAnomalyDetector::new`]; deserialisation
/// applies the same checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DetectorParams")]
pub struct VolumeAnomalyDetector {
    window: usize,
    threshold: f64,
}

#[derive(Deserialize)]
struct DetectorParams {
    window: usize,
    threshold: f64,
}

impl TryFrom<DetectorParams> for VolumeAnomalyDetector {
    type Error = RiskError;

    fn try_from(params: DetectorParams) -> RiskResult<Self> {
        Self::new(params.window, params.threshold)
    }
}

impl Default for VolumeAnomalyDetector {
    fn default() -> Self {
        Self {
            window: 20,
            threshold: 2.5,
        }
    }
}

impl VolumeAnomalyDetector {
    pub fn new(window: usize, threshold: f64) -> RiskResult<Self> {
        if window == 0 {
            return Err(RiskError::invalid("window", "must be at least 1"));
        }
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(RiskError::invalid(
                "threshold",
                format!("must be a positive multiple, got {threshold}"),
            ));
        }
        Ok(Self { window, threshold })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Check the last element of `volumes`.
    pub fn inspect(&self, volumes: &[f64]) -> RiskResult<VolumeCheck> {
        if volumes.len() < self.window {
            return Err(RiskError::insufficient(
                "volume anomaly",
                self.window,
                volumes.len(),
            ));
        }

        let tail = &volumes[volumes.len() - self.window..];
        let observed = tail.iter().filter(|v| v.is_finite()).count();
        if observed < self.window {
            tracing::debug!(window = self.window, observed, "missing volume in rolling window");
            return Err(RiskError::insufficient(
                "volume anomaly (missing volume in window)",
                self.window,
                observed,
            ));
        }

        let latest = tail[tail.len() - 1];
        let rolling_mean = tail.iter().sum::<f64>() / self.window as f64;
        let multiple = if rolling_mean > 0.0 {
            latest / rolling_mean
        } else if latest > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        Ok(VolumeCheck {
            latest,
            rolling_mean,
            multiple,
            unusual: latest > self.threshold * rolling_mean,
        })
    }
}

/// Whether the most recent volume exceeds `threshold` times its rolling mean.
pub fn is_unusual(volumes: &[f64], window: usize, threshold: f64) -> RiskResult<bool> {
    Ok(VolumeAnomalyDetector::new(window, threshold)?
        .inspect(volumes)?
        .unusual)
}
