//! Alert monitor: one evaluation cycle with alert emission.
//!
//! The [`AlertMonitor`] takes a materialised [`MarketSnapshot`], aggregates
//! metrics, evaluates thresholds and price targets, and emits every
//! [`AlertEvent`] via a channel.

use chrono::{DateTime, Utc};
use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use rd_types::{AssetId, MarketSnapshot, RiskResult};

use crate::aggregator::{AggregatorConfig, AssetMetrics, MarketSummary, MetricsAggregator, PartialResult};
use crate::alerts::{AlertEvaluator, AlertEvent, AlertThresholds};
use crate::targets::{evaluate_targets, AlertTargets, TargetHit};

/// Everything produced by one cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub metrics: Vec<AssetMetrics>,
    pub summary: MarketSummary,
    pub partial: PartialResult,
    pub alerts: Vec<AlertEvent>,
    pub target_hits: Vec<TargetHit>,
}

/// Evaluation-cycle driver.
///
/// Call [`AlertMonitor::run_cycle`] once per refresh. Alerts are emitted on
/// the channel supplied at construction time.
pub struct AlertMonitor {
    aggregator: MetricsAggregator,
    thresholds: AlertThresholds,
    alert_tx: Sender<AlertEvent>,
    last_report: Option<CycleReport>,
}

impl AlertMonitor {
    /// Create a monitor. The volume flag uses the thresholds' volume multiple.
    pub fn new(
        config: AggregatorConfig,
        thresholds: AlertThresholds,
        alert_tx: Sender<AlertEvent>,
    ) -> RiskResult<Self> {
        thresholds.validate()?;
        let aggregator = MetricsAggregator::new(config.with_thresholds(&thresholds))?;
        Ok(Self {
            aggregator,
            thresholds,
            alert_tx,
            last_report: None,
        })
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    /// Get the most recently completed report, if any.
    pub fn last_report(&self) -> Option<&CycleReport> {
        self.last_report.as_ref()
    }

    /// Main entry point: aggregate, evaluate, emit alerts.
    pub fn run_cycle(
        &mut self,
        asset_ids: &[AssetId],
        snapshot: &MarketSnapshot,
        targets: &AlertTargets,
    ) -> RiskResult<CycleReport> {
        let cycle_id = Uuid::new_v4();
        let aggregate = self.aggregator.aggregate(asset_ids, snapshot)?;
        let alerts = AlertEvaluator::evaluate(&aggregate.metrics, &self.thresholds)?;
        let target_hits = evaluate_targets(&aggregate.metrics, targets);

        info!(
            %cycle_id,
            assets = aggregate.metrics.len(),
            missing = aggregate.partial.missing.len(),
            alerts = alerts.len(),
            "risk cycle complete"
        );

        for alert in &alerts {
            self.emit(alert.clone());
        }
        for hit in &target_hits {
            info!(asset = %hit.asset_id, spot = %hit.spot_price, target = %hit.target.target_price, "price target reached");
        }

        let report = CycleReport {
            cycle_id,
            generated_at: Utc::now(),
            metrics: aggregate.metrics,
            summary: aggregate.summary,
            partial: aggregate.partial,
            alerts,
            target_hits,
        };
        self.last_report = Some(report.clone());
        Ok(report)
    }

    fn emit(&self, alert: AlertEvent) {
        warn!(kind = ?alert.kind, asset = %alert.asset_id, %alert.message, "RISK ALERT");
        // A disconnected receiver is not an error for the cycle.
        let _ = self.alert_tx.try_send(alert);
    }
}
