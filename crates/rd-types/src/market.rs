use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::errors::{RiskError, RiskResult};

/// Identifier of an asset as issued by the market-data provider (e.g. `bitcoin`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AssetId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A single observation of an asset's price and traded volume.
///
/// A non-finite `price` or `volume` marks that field as missing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub volume: f64,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, price: f64, volume: f64) -> Self {
        Self {
            timestamp,
            price,
            volume,
        }
    }

    pub fn has_price(&self) -> bool {
        self.price.is_finite()
    }
}

/// Timestamp-ordered price/volume history for one asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPriceSeries")]
pub struct PriceSeries {
    asset: AssetId,
    points: Vec<PricePoint>,
}

#[derive(Deserialize)]
struct RawPriceSeries {
    asset: AssetId,
    points: Vec<PricePoint>,
}

impl TryFrom<RawPriceSeries> for PriceSeries {
    type Error = RiskError;

    fn try_from(raw: RawPriceSeries) -> RiskResult<Self> {
        Self::new(raw.asset, raw.points)
    }
}

impl PriceSeries {
    /// Build a series, rejecting duplicate or out-of-order timestamps.
    pub fn new(asset: AssetId, points: Vec<PricePoint>) -> RiskResult<Self> {
        if let Some(pair) = points
            .windows(2)
            .find(|pair| pair[1].timestamp <= pair[0].timestamp)
        {
            return Err(RiskError::InvalidSeries {
                message: format!(
                    "timestamps for {} must be strictly increasing ({} followed by {})",
                    asset, pair[0].timestamp, pair[1].timestamp
                ),
            });
        }

        Ok(Self { asset, points })
    }

    /// Series with no observations, as returned by a failed fetch.
    pub fn empty(asset: AssetId) -> Self {
        Self {
            asset,
            points: Vec::new(),
        }
    }

    /// Build a daily series from bare prices, starting at `start`. Volumes are zero.
    pub fn daily(asset: AssetId, start: DateTime<Utc>, prices: &[f64]) -> Self {
        let points = prices
            .iter()
            .enumerate()
            .map(|(i, &price)| PricePoint::new(start + Duration::days(i as i64), price, 0.0))
            .collect();
        Self { asset, points }
    }

    pub fn asset(&self) -> &AssetId {
        &self.asset
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.volume).collect()
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.points.last().map(|p| p.timestamp)
    }
}

/// Simple returns keyed by the timestamp of the later price of each pair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    points: Vec<(DateTime<Utc>, f64)>,
}

impl ReturnSeries {
    pub fn new(points: Vec<(DateTime<Utc>, f64)>) -> Self {
        Self { points }
    }

    /// Co-indexed returns with synthetic daily timestamps from the Unix epoch.
    pub fn from_values(values: &[f64]) -> Self {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, &v)| (DateTime::<Utc>::default() + Duration::days(i as i64), v))
            .collect();
        Self { points }
    }

    pub fn points(&self) -> &[(DateTime<Utc>, f64)] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|&(_, v)| v).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Latest quote for an asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotQuote {
    /// Price in the provider's quote currency.
    pub price: Decimal,
    /// Change over the trailing 24 hours, in percent.
    pub change_24h_pct: Decimal,
}

impl SpotQuote {
    pub fn new(price: Decimal, change_24h_pct: Decimal) -> Self {
        Self {
            price,
            change_24h_pct,
        }
    }
}

/// Everything one evaluation cycle reads, already fetched.
///
/// An asset absent from `histories` or `quotes` had no data available.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub names: HashMap<AssetId, String>,
    pub histories: HashMap<AssetId, PriceSeries>,
    pub quotes: HashMap<AssetId, SpotQuote>,
}

impl MarketSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_history(&mut self, series: PriceSeries) {
        self.histories.insert(series.asset().clone(), series);
    }

    pub fn insert_quote(&mut self, asset: AssetId, quote: SpotQuote) {
        self.quotes.insert(asset, quote);
    }

    pub fn insert_name(&mut self, asset: AssetId, name: &str) {
        self.names.insert(asset, name.to_string());
    }

    /// Display name, falling back to the identifier.
    pub fn name_of(&self, asset: &AssetId) -> String {
        self.names
            .get(asset)
            .cloned()
            .unwrap_or_else(|| asset.to_string())
    }
}
