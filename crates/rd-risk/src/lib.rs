//! Quantitative risk core for riskdesk.
//!
//! Provides:
//! - Return series preprocessing with gap handling
//! - Historical volatility, historical VaR, Pearson correlation
//! - Rolling-mean volume anomaly detection and OLS trend projection
//! - Per-cycle aggregation into asset metrics and a market summary
//! - Threshold evaluation into alert events, plus user price targets

pub mod aggregator;
pub mod alerts;
pub mod correlation;
pub mod monitor;
pub mod returns;
pub mod targets;
pub mod trend;
pub mod var;
pub mod volatility;
pub mod volume;

pub use aggregator::{
    AggregateReport, AggregatorConfig, AssetMetrics, MarketSummary, MetricsAggregator,
    PartialResult, SkipReason,
};
pub use alerts::{AlertEvaluator, AlertEvent, AlertKind, AlertThresholds};
pub use correlation::{correlation, pearson};
pub use monitor::{AlertMonitor, CycleReport};
pub use returns::returns;
pub use targets::{evaluate_targets, AlertTargets, PriceTarget, TargetDirection, TargetHit};
pub use trend::{project, ProjectionPoint, TrendProjection, TrendProjector, PROJECTION_ADVISORY};
pub use var::{value_at_risk, DEFAULT_VAR_CONFIDENCE};
pub use volatility::{
    volatility, volatility_with_cadence, SamplingCadence, TRADING_DAYS_PER_YEAR,
};
pub use volume::{is_unusual, VolumeAnomalyDetector, VolumeCheck};
