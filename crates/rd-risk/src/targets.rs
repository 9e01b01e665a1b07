//! User-defined price targets, keyed by asset.
//!
//! The collection is owned by the caller and handed to each cycle; nothing
//! here keeps state between cycles.

use std::collections::{BTreeMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use rd_types::AssetId;

use crate::aggregator::AssetMetrics;

/// Side of the target that counts as reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetDirection {
    /// Reached when the spot price is at or above the target.
    Above,
    /// Reached when the spot price is at or below the target.
    Below,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTarget {
    pub name: String,
    pub target_price: Decimal,
    pub direction: TargetDirection,
}

impl PriceTarget {
    pub fn is_reached(&self, spot: Decimal) -> bool {
        match self.direction {
            TargetDirection::Above => spot >= self.target_price,
            TargetDirection::Below => spot <= self.target_price,
        }
    }
}

/// At most one price target per asset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertTargets {
    targets: BTreeMap<AssetId, PriceTarget>,
}

impl AlertTargets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a target. Returns `false` and leaves the existing target in
    /// place when the asset already has one.
    pub fn add(&mut self, asset: AssetId, target: PriceTarget) -> bool {
        if self.targets.contains_key(&asset) {
            return false;
        }
        self.targets.insert(asset, target);
        true
    }

    pub fn remove(&mut self, assets: &[AssetId]) {
        let drop: HashSet<&AssetId> = assets.iter().collect();
        self.targets.retain(|id, _| !drop.contains(id));
    }

    pub fn get(&self, asset: &AssetId) -> Option<&PriceTarget> {
        self.targets.get(asset)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AssetId, &PriceTarget)> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// A price target reached in this cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetHit {
    pub asset_id: AssetId,
    pub name: String,
    pub spot_price: Decimal,
    pub target: PriceTarget,
}

/// Targets reached by the cycle's spot prices, in metrics order.
pub fn evaluate_targets(metrics: &[AssetMetrics], targets: &AlertTargets) -> Vec<TargetHit> {
    metrics
        .iter()
        .filter_map(|m| {
            let target = targets.get(&m.asset_id)?;
            target.is_reached(m.spot_price).then(|| TargetHit {
                asset_id: m.asset_id.clone(),
                name: m.name.clone(),
                spot_price: m.spot_price,
                target: target.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn target(price: Decimal, direction: TargetDirection) -> PriceTarget {
        PriceTarget {
            name: "Bitcoin".into(),
            target_price: price,
            direction,
        }
    }

    fn metrics(id: &str, spot: Decimal) -> AssetMetrics {
        AssetMetrics {
            asset_id: AssetId::new(id),
            name: id.into(),
            spot_price: spot,
            change_24h_pct: dec!(0),
            volatility_pct: 50.0,
            var_pct: 2.0,
            var_confidence: 0.95,
            unusual_volume: false,
            volume_multiple: 1.0,
        }
    }

    #[test]
    fn duplicate_asset_is_refused() {
        let mut targets = AlertTargets::new();
        assert!(targets.add(AssetId::new("bitcoin"), target(dec!(70000), TargetDirection::Above)));
        assert!(!targets.add(AssetId::new("bitcoin"), target(dec!(1), TargetDirection::Below)));
        assert_eq!(targets.len(), 1);
        assert_eq!(
            targets.get(&AssetId::new("bitcoin")).unwrap().target_price,
            dec!(70000)
        );
    }

    #[test]
    fn remove_drops_listed_assets() {
        let mut targets = AlertTargets::new();
        targets.add(AssetId::new("bitcoin"), target(dec!(1), TargetDirection::Above));
        targets.add(AssetId::new("ethereum"), target(dec!(1), TargetDirection::Above));
        targets.remove(&[AssetId::new("bitcoin"), AssetId::new("solana")]);
        let left: Vec<&str> = targets.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(left, vec!["ethereum"]);
    }

    #[test]
    fn hits_respect_direction_and_order() {
        let mut targets = AlertTargets::new();
        targets.add(AssetId::new("bitcoin"), target(dec!(60000), TargetDirection::Above));
        targets.add(AssetId::new("ethereum"), target(dec!(3000), TargetDirection::Below));
        targets.add(AssetId::new("solana"), target(dec!(200), TargetDirection::Above));

        let hits = evaluate_targets(
            &[
                metrics("solana", dec!(150)),
                metrics("ethereum", dec!(3000)),
                metrics("bitcoin", dec!(65000)),
                metrics("cardano", dec!(1)),
            ],
            &targets,
        );
        let hit_ids: Vec<&str> = hits.iter().map(|h| h.asset_id.as_str()).collect();
        assert_eq!(hit_ids, vec!["ethereum", "bitcoin"]);
    }
}
