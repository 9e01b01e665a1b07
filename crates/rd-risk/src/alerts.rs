//! Alert thresholds, alert events and the threshold evaluator.

use serde::{Deserialize, Serialize};

use rd_types::{AssetId, RiskError, RiskResult};

use crate::aggregator::AssetMetrics;

/// User-configured alert thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertThresholds {
    /// Annualised volatility, in percent, above which an asset breaches.
    pub volatility_pct_threshold: f64,
    /// Multiple of the rolling mean volume that counts as unusual.
    pub volume_multiple_threshold: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            volatility_pct_threshold: 80.0,
            volume_multiple_threshold: 3.0,
        }
    }
}

impl AlertThresholds {
    pub fn validate(&self) -> RiskResult<()> {
        let vol = self.volatility_pct_threshold;
        if !vol.is_finite() || vol < 0.0 {
            return Err(RiskError::invalid(
                "volatility_pct_threshold",
                format!("must be a non-negative percentage, got {vol}"),
            ));
        }
        let multiple = self.volume_multiple_threshold;
        if !multiple.is_finite() || multiple <= 0.0 {
            return Err(RiskError::invalid(
                "volume_multiple_threshold",
                format!("must be a positive multiple, got {multiple}"),
            ));
        }
        Ok(())
    }
}

/// Discriminant for the kind of alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertKind {
    /// Annualised volatility above the configured threshold.
    VolatilityBreach,
    /// Latest volume flagged as unusual.
    VolumeAnomaly,
}

/// A single alert raised by the evaluator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub kind: AlertKind,
    pub asset_id: AssetId,
    pub name: String,
    pub observed_value: f64,
    pub threshold_value: f64,
    pub message: String,
}

/// Stateless evaluator of metrics against thresholds.
pub struct AlertEvaluator;

impl AlertEvaluator {
    /// Alerts for `metrics` in input order; for one asset the volatility
    /// alert precedes the volume alert.
    pub fn evaluate(
        metrics: &[AssetMetrics],
        thresholds: &AlertThresholds,
    ) -> RiskResult<Vec<AlertEvent>> {
        thresholds.validate()?;

        let mut events = Vec::new();
        for m in metrics {
            if m.volatility_pct > thresholds.volatility_pct_threshold {
                events.push(AlertEvent {
                    kind: AlertKind::VolatilityBreach,
                    asset_id: m.asset_id.clone(),
                    name: m.name.clone(),
                    observed_value: m.volatility_pct,
                    threshold_value: thresholds.volatility_pct_threshold,
                    message: format!(
                        "{} volatility {:.2}% exceeds the {}% threshold",
                        m.name, m.volatility_pct, thresholds.volatility_pct_threshold
                    ),
                });
            }
            if m.unusual_volume {
                events.push(AlertEvent {
                    kind: AlertKind::VolumeAnomaly,
                    asset_id: m.asset_id.clone(),
                    name: m.name.clone(),
                    observed_value: m.volume_multiple,
                    threshold_value: thresholds.volume_multiple_threshold,
                    message: format!(
                        "{} volume is {:.2}x its rolling mean (threshold {}x)",
                        m.name, m.volume_multiple, thresholds.volume_multiple_threshold
                    ),
                });
            }
        }

        Ok(events)
    }
}
