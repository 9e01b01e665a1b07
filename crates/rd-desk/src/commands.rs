use std::sync::Arc;

use anyhow::{bail, Context, Result};
use crossbeam_channel::unbounded;
use serde::Serialize;
use tracing::info;

use rd_data::{CachedProvider, CsvProvider, MarketDataManager};
use rd_risk::{
    correlation, returns, value_at_risk, volatility_with_cadence, AlertMonitor, CycleReport,
    TrendProjection, TrendProjector,
};
use rd_types::AssetId;

use crate::config::Config;

pub fn manager(cfg: &Config) -> MarketDataManager {
    let csv = CsvProvider::new(&cfg.data.dir);
    let cached = CachedProvider::with_ttl(csv, cfg.cache_ttl());
    MarketDataManager::new(Arc::new(cached))
}

/// Run `cycles` evaluation cycles, `interval` apart.
pub async fn monitor(
    cfg: &Config,
    data: &MarketDataManager,
    cycles: u32,
    interval: std::time::Duration,
) -> Result<Vec<CycleReport>> {
    let (tx, rx) = unbounded();
    let mut monitor = AlertMonitor::new(cfg.aggregator(), cfg.alerts.clone(), tx)
        .context("build alert monitor")?;
    let assets = cfg.asset_ids();
    let targets = cfg.targets();

    let mut reports = Vec::new();
    for cycle in 0..cycles {
        if cycle > 0 {
            tokio::time::sleep(interval).await;
        }
        let snapshot = data.snapshot(&assets, cfg.data.history_days).await;
        let report = monitor
            .run_cycle(&assets, &snapshot, &targets)
            .context("risk cycle failed")?;
        let delivered = rx.try_iter().count();
        info!(cycle, delivered, "alerts delivered");
        reports.push(report);
    }
    Ok(reports)
}

#[derive(Debug, Serialize)]
pub struct AssetAnalysis {
    pub asset_id: AssetId,
    pub days: u32,
    pub observations: usize,
    pub volatility_pct: f64,
    pub var_pct: f64,
    pub var_confidence: f64,
}

/// Volatility and VaR for one asset over a longer lookback.
pub async fn analyze(cfg: &Config, data: &MarketDataManager, asset: &AssetId, days: u32) -> Result<AssetAnalysis> {
    let series = data
        .fetch_history(asset, days)
        .await
        .with_context(|| format!("no history for {asset}"))?;
    let agg = cfg.aggregator();
    let rets = returns(&series)?;
    Ok(AssetAnalysis {
        asset_id: asset.clone(),
        days,
        observations: series.len(),
        volatility_pct: volatility_with_cadence(&rets, agg.cadence)?,
        var_pct: value_at_risk(&rets, agg.var_confidence)?,
        var_confidence: agg.var_confidence,
    })
}

pub async fn project(data: &MarketDataManager, asset: &AssetId, days: u32, horizon: usize) -> Result<TrendProjection> {
    let series = data
        .fetch_history(asset, days)
        .await
        .with_context(|| format!("no history for {asset}"))?;
    Ok(TrendProjector::fit(&series, horizon)?)
}

#[derive(Debug, Serialize)]
pub struct CorrelationReport {
    pub asset_a: AssetId,
    pub asset_b: AssetId,
    pub days: u32,
    pub correlation: f64,
}

pub async fn correlate(data: &MarketDataManager, a: &AssetId, b: &AssetId, days: u32) -> Result<CorrelationReport> {
    if a == b {
        bail!("select two different assets");
    }
    let series_a = data.fetch_history(a, days).await.with_context(|| format!("no history for {a}"))?;
    let series_b = data.fetch_history(b, days).await.with_context(|| format!("no history for {b}"))?;
    let correlation = correlation(&returns(&series_a)?, &returns(&series_b)?)?;
    Ok(CorrelationReport {
        asset_a: a.clone(),
        asset_b: b.clone(),
        days,
        correlation,
    })
}
