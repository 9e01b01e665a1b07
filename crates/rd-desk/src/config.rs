use anyhow::{Context, Result};
use rd_risk::{AggregatorConfig, AlertTargets, AlertThresholds, PriceTarget, TargetDirection};
use rd_types::AssetId;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::{fs, path::Path, path::PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataCfg {
    pub dir: PathBuf,
    pub history_days: u32,
    pub cache_ttl_secs: i64,
}

impl Default for DataCfg {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./data/sample"),
            history_days: 90,
            cache_ttl_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisCfg {
    pub var_confidence: f64,
    pub volume_window: usize,
}

impl Default for AnalysisCfg {
    fn default() -> Self {
        let defaults = AggregatorConfig::default();
        Self {
            var_confidence: defaults.var_confidence,
            volume_window: defaults.volume_window,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetsCfg {
    pub ids: Vec<String>,
}

impl Default for AssetsCfg {
    fn default() -> Self {
        Self {
            ids: ["bitcoin", "ethereum", "cardano", "solana", "dogecoin"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetCfg {
    pub asset_id: String,
    pub name: String,
    pub target_price: Decimal,
    #[serde(default = "default_direction")]
    pub direction: TargetDirection,
}

fn default_direction() -> TargetDirection {
    TargetDirection::Above
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataCfg,
    pub analysis: AnalysisCfg,
    pub alerts: AlertThresholds,
    pub assets: AssetsCfg,
    pub targets: Vec<TargetCfg>,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path.as_ref())
            .with_context(|| format!("read {}", path.as_ref().display()))?;
        Self::from_toml(&s)
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(s).context("parse riskdesk config")?;
        cfg.alerts.validate().context("invalid [alerts] section")?;
        Ok(cfg)
    }

    pub fn asset_ids(&self) -> Vec<AssetId> {
        self.assets.ids.iter().map(|id| AssetId::new(id)).collect()
    }

    pub fn aggregator(&self) -> AggregatorConfig {
        AggregatorConfig {
            var_confidence: self.analysis.var_confidence,
            volume_window: self.analysis.volume_window,
            ..AggregatorConfig::default()
        }
        .with_thresholds(&self.alerts)
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.data.cache_ttl_secs.max(0))
    }

    /// Price targets keyed by asset; later duplicates are ignored.
    pub fn targets(&self) -> AlertTargets {
        let mut targets = AlertTargets::new();
        for t in &self.targets {
            let added = targets.add(
                AssetId::new(&t.asset_id),
                PriceTarget {
                    name: t.name.clone(),
                    target_price: t.target_price,
                    direction: t.direction,
                },
            );
            if !added {
                warn!(asset = %t.asset_id, "duplicate price target ignored");
            }
        }
        targets
    }
}
