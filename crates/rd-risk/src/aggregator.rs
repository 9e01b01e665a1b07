//! Per-cycle metrics aggregation.
//!
//! [`MetricsAggregator`] runs the estimators for every requested asset of a
//! [`MarketSnapshot`] and assembles the [`AssetMetrics`] records plus a
//! [`MarketSummary`] across them. Assets whose data is missing or whose
//! estimators fail are reported in [`PartialResult`] instead of aborting
//! the batch.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use rd_types::{AssetId, MarketSnapshot, RiskError, RiskResult};

use crate::alerts::AlertThresholds;
use crate::returns::returns;
use crate::var::{value_at_risk, DEFAULT_VAR_CONFIDENCE};
use crate::volatility::{volatility_with_cadence, SamplingCadence};
use crate::volume::VolumeAnomalyDetector;

/// Risk metrics of one asset for one cycle.
///
/// Percentages are already multiplied by 100; prices are in the quote
/// currency of the spot feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMetrics {
    pub asset_id: AssetId,
    pub name: String,
    pub spot_price: Decimal,
    pub change_24h_pct: Decimal,
    /// Annualised historical volatility.
    pub volatility_pct: f64,
    /// One-day historical VaR at `var_confidence`.
    pub var_pct: f64,
    pub var_confidence: f64,
    pub unusual_volume: bool,
    /// Latest volume divided by its rolling mean.
    pub volume_multiple: f64,
}

/// Cross-asset statistics for one cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSummary {
    pub average_volatility_pct: f64,
    /// Record with the largest 24h change (first one on ties).
    pub top_gainer: AssetMetrics,
    /// Record with the smallest 24h change (first one on ties).
    pub top_loser: AssetMetrics,
}

impl MarketSummary {
    pub fn from_metrics(metrics: &[AssetMetrics]) -> RiskResult<Self> {
        let first = metrics.first().ok_or(RiskError::NoData)?;

        let mut gainer = first;
        let mut loser = first;
        for m in &metrics[1..] {
            if m.change_24h_pct > gainer.change_24h_pct {
                gainer = m;
            }
            if m.change_24h_pct < loser.change_24h_pct {
                loser = m;
            }
        }

        let average_volatility_pct =
            metrics.iter().map(|m| m.volatility_pct).sum::<f64>() / metrics.len() as f64;

        Ok(Self {
            average_volatility_pct,
            top_gainer: gainer.clone(),
            top_loser: loser.clone(),
        })
    }
}

/// Assets left out of a cycle and why
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialResult {
    pub missing: BTreeSet<AssetId>,
    pub reasons: BTreeMap<AssetId, String>,
}

impl PartialResult {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    fn record(&mut self, asset: AssetId, reason: &SkipReason) {
        self.reasons.insert(asset.clone(), reason.to_string());
        self.missing.insert(asset);
    }
}

/// Why a single asset produced no metrics.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SkipReason {
    #[error("no price history available")]
    NoHistory,

    #[error("no spot quote available")]
    NoSpotPrice,

    #[error("{0}")]
    Estimator(#[from] RiskError),
}

/// Output of [`MetricsAggregator::aggregate`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub metrics: Vec<AssetMetrics>,
    pub summary: MarketSummary,
    pub partial: PartialResult,
}

/// Estimator settings applied to every asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    pub var_confidence: f64,
    pub volume_window: usize,
    /// Multiple of the rolling mean that flags unusual volume.
    pub volume_threshold: f64,
    pub cadence: SamplingCadence,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        let detector = VolumeAnomalyDetector::default();
        Self {
            var_confidence: DEFAULT_VAR_CONFIDENCE,
            volume_window: detector.window(),
            volume_threshold: detector.threshold(),
            cadence: SamplingCadence::Daily,
        }
    }
}

impl AggregatorConfig {
    /// Use the alert thresholds' volume multiple for the volume flag.
    pub fn with_thresholds(mut self, thresholds: &AlertThresholds) -> Self {
        self.volume_threshold = thresholds.volume_multiple_threshold;
        self
    }
}

/// Runs the per-asset estimators and assembles the cycle's records.
#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    config: AggregatorConfig,
    detector: VolumeAnomalyDetector,
}

impl MetricsAggregator {
    pub fn new(config: AggregatorConfig) -> RiskResult<Self> {
        if !(config.var_confidence > 0.0 && config.var_confidence < 1.0) {
            return Err(RiskError::invalid(
                "var_confidence",
                format!("must lie in (0, 1), got {}", config.var_confidence),
            ));
        }
        let detector = VolumeAnomalyDetector::new(config.volume_window, config.volume_threshold)?;
        Ok(Self { config, detector })
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Metrics for one asset of the snapshot.
    pub fn compute_asset(
        &self,
        asset: &AssetId,
        snapshot: &MarketSnapshot,
    ) -> Result<AssetMetrics, SkipReason> {
        let history = snapshot.histories.get(asset).ok_or(SkipReason::NoHistory)?;
        let quote = snapshot.quotes.get(asset).ok_or(SkipReason::NoSpotPrice)?;

        let rets = returns(history)?;
        let volatility_pct = volatility_with_cadence(&rets, self.config.cadence)?;
        let var_pct = value_at_risk(&rets, self.config.var_confidence)?;
        let volume = self.detector.inspect(&history.volumes())?;

        debug!(
            asset = %asset,
            volatility_pct,
            var_pct,
            volume_multiple = volume.multiple,
            "computed asset metrics"
        );

        Ok(AssetMetrics {
            asset_id: asset.clone(),
            name: snapshot.name_of(asset),
            spot_price: quote.price,
            change_24h_pct: quote.change_24h_pct,
            volatility_pct,
            var_pct,
            var_confidence: self.config.var_confidence,
            unusual_volume: volume.unusual,
            volume_multiple: volume.multiple,
        })
    }

    /// Compute metrics for `asset_ids` (duplicates collapse onto the first
    /// occurrence) and summarise them.
    ///
    /// Per-asset work runs on the rayon pool; the summary is only computed
    /// once every asset has finished. Fails with [`RiskError::NoData`] when
    /// no asset succeeded.
    pub fn aggregate(
        &self,
        asset_ids: &[AssetId],
        snapshot: &MarketSnapshot,
    ) -> RiskResult<AggregateReport> {
        let mut seen = HashSet::new();
        let unique: Vec<&AssetId> = asset_ids.iter().filter(|id| seen.insert(*id)).collect();

        let outcomes: Vec<(&AssetId, Result<AssetMetrics, SkipReason>)> = unique
            .par_iter()
            .map(|id| (*id, self.compute_asset(id, snapshot)))
            .collect();

        let mut metrics = Vec::with_capacity(outcomes.len());
        let mut partial = PartialResult::default();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(m) => metrics.push(m),
                Err(reason) => {
                    warn!(asset = %id, %reason, "skipping asset for this cycle");
                    partial.record(id.clone(), &reason);
                }
            }
        }

        let summary = MarketSummary::from_metrics(&metrics)?;

        Ok(AggregateReport {
            metrics,
            summary,
            partial,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rd_types::{PricePoint, PriceSeries, SpotQuote};
    use rust_decimal_macros::dec;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
    }

    fn history(id: &str, n: usize, last_volume: f64) -> PriceSeries {
        let points = (0..n)
            .map(|i| {
                let price = 100.0 + (i as f64 * 0.7).sin() * 5.0;
                let volume = if i == n - 1 { last_volume } else { 1_000.0 };
                PricePoint::new(start() + Duration::days(i as i64), price, volume)
            })
            .collect();
        PriceSeries::new(AssetId::new(id), points).unwrap()
    }

    fn snapshot() -> MarketSnapshot {
        let mut s = MarketSnapshot::new();
        s.insert_name(AssetId::new("bitcoin"), "Bitcoin");
        s.insert_name(AssetId::new("ethereum"), "Ethereum");
        s.insert_history(history("bitcoin", 30, 1_000.0));
        s.insert_history(history("ethereum", 30, 10_000.0));
        s.insert_quote(AssetId::new("bitcoin"), SpotQuote::new(dec!(65000), dec!(2.5)));
        s.insert_quote(AssetId::new("ethereum"), SpotQuote::new(dec!(3500), dec!(-1.25)));
        s
    }

    fn ids(names: &[&str]) -> Vec<AssetId> {
        names.iter().map(|n| AssetId::new(n)).collect()
    }

    fn aggregator() -> MetricsAggregator {
        MetricsAggregator::new(AggregatorConfig::default()).unwrap()
    }

    #[test]
    fn metrics_follow_input_order() {
        let report = aggregator()
            .aggregate(&ids(&["ethereum", "bitcoin"]), &snapshot())
            .unwrap();
        let order: Vec<&str> = report.metrics.iter().map(|m| m.asset_id.as_str()).collect();
        assert_eq!(order, vec!["ethereum", "bitcoin"]);
        assert!(report.partial.is_complete());
    }

    #[test]
    fn per_asset_values() {
        let report = aggregator()
            .aggregate(&ids(&["bitcoin", "ethereum"]), &snapshot())
            .unwrap();
        let btc = &report.metrics[0];
        assert_eq!(btc.name, "Bitcoin");
        assert_eq!(btc.spot_price, dec!(65000));
        assert!(btc.volatility_pct > 0.0);
        assert!(btc.var_pct >= 0.0);
        assert_eq!(btc.var_confidence, 0.95);
        assert!(!btc.unusual_volume);

        // 10k against nineteen 1k: mean 1450, multiple ~6.9.
        let eth = &report.metrics[1];
        assert!(eth.unusual_volume);
        assert!((eth.volume_multiple - 10_000.0 / 1_450.0).abs() < 1e-9);
    }

    #[test]
    fn summary_statistics() {
        let report = aggregator()
            .aggregate(&ids(&["bitcoin", "ethereum"]), &snapshot())
            .unwrap();
        let mean = report.metrics.iter().map(|m| m.volatility_pct).sum::<f64>() / 2.0;
        assert!((report.summary.average_volatility_pct - mean).abs() < 1e-12);
        assert_eq!(report.summary.top_gainer.asset_id, AssetId::new("bitcoin"));
        assert_eq!(report.summary.top_loser.asset_id, AssetId::new("ethereum"));
    }

    #[test]
    fn unavailable_assets_are_skipped_not_fatal() {
        let mut snap = snapshot();
        snap.insert_history(history("solana", 30, 1_000.0)); // no quote
        snap.insert_quote(AssetId::new("cardano"), SpotQuote::new(dec!(0.45), dec!(0))); // no history
        snap.insert_history(PriceSeries::empty(AssetId::new("dogecoin")));
        snap.insert_quote(AssetId::new("dogecoin"), SpotQuote::new(dec!(0.1), dec!(3)));

        let report = aggregator()
            .aggregate(
                &ids(&["bitcoin", "solana", "cardano", "dogecoin", "ripple"]),
                &snap,
            )
            .unwrap();

        assert_eq!(report.metrics.len(), 1);
        let missing: Vec<&str> = report.partial.missing.iter().map(|a| a.as_str()).collect();
        assert_eq!(missing, vec!["cardano", "dogecoin", "ripple", "solana"]);
        assert!(report.partial.reasons[&AssetId::new("dogecoin")].contains("Insufficient data"));
        assert_eq!(
            report.partial.reasons[&AssetId::new("solana")],
            "no spot quote available"
        );
    }

    #[test]
    fn short_history_skips_asset() {
        let mut snap = snapshot();
        snap.insert_history(history("ethereum", 10, 1_000.0)); // shorter than the volume window
        let report = aggregator()
            .aggregate(&ids(&["bitcoin", "ethereum"]), &snap)
            .unwrap();
        assert_eq!(report.metrics.len(), 1);
        assert!(report.partial.missing.contains(&AssetId::new("ethereum")));
    }

    #[test]
    fn empty_batch_is_no_data() {
        let err = aggregator()
            .aggregate(&ids(&["ripple"]), &snapshot())
            .unwrap_err();
        assert_eq!(err, RiskError::NoData);
        assert_eq!(
            aggregator().aggregate(&[], &snapshot()).unwrap_err(),
            RiskError::NoData
        );
    }

    #[test]
    fn duplicate_ids_collapse() {
        let report = aggregator()
            .aggregate(&ids(&["bitcoin", "bitcoin"]), &snapshot())
            .unwrap();
        assert_eq!(report.metrics.len(), 1);
    }

    #[test]
    fn ties_keep_first_record() {
        let mut snap = snapshot();
        snap.insert_quote(AssetId::new("ethereum"), SpotQuote::new(dec!(3500), dec!(2.5)));
        let report = aggregator()
            .aggregate(&ids(&["ethereum", "bitcoin"]), &snap)
            .unwrap();
        assert_eq!(report.summary.top_gainer.asset_id, AssetId::new("ethereum"));
        assert_eq!(report.summary.top_loser.asset_id, AssetId::new("ethereum"));
    }

    #[test]
    fn thresholds_drive_volume_flag() {
        let thresholds = AlertThresholds {
            volatility_pct_threshold: 80.0,
            volume_multiple_threshold: 8.0,
        };
        let agg =
            MetricsAggregator::new(AggregatorConfig::default().with_thresholds(&thresholds)).unwrap();
        let report = agg.aggregate(&ids(&["ethereum"]), &snapshot()).unwrap();
        assert!(!report.metrics[0].unusual_volume);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = AggregatorConfig {
            var_confidence: 1.0,
            ..AggregatorConfig::default()
        };
        assert!(MetricsAggregator::new(config).is_err());

        let config = AggregatorConfig {
            volume_window: 0,
            ..AggregatorConfig::default()
        };
        assert!(MetricsAggregator::new(config).is_err());
    }

    #[test]
    fn summary_requires_records() {
        assert_eq!(MarketSummary::from_metrics(&[]).unwrap_err(), RiskError::NoData);
    }
}
