use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use csv::ReaderBuilder;
use rd_types::{AssetId, DataError, DataResult, PricePoint, PriceSeries, SpotQuote};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Trait for market-data collaborators (CSV files, remote APIs, fixtures)
#[async_trait]
pub trait MarketDataProvider: Send + Sync + std::fmt::Debug {
    /// History covering the trailing `days` days, anchored at the newest
    /// observation. An empty series means the provider had nothing.
    async fn fetch_history(&self, asset: &AssetId, days: u32) -> DataResult<PriceSeries>;

    /// Latest quotes for whichever of `assets` the provider knows.
    async fn spot_quotes(&self, assets: &[AssetId]) -> DataResult<HashMap<AssetId, SpotQuote>>;

    /// Display names of known assets.
    async fn asset_names(&self) -> DataResult<HashMap<AssetId, String>>;

    /// Get provider name
    fn name(&self) -> &str;
}

/// Keep the points within `days` days of the last observation.
pub fn trailing_days(series: &PriceSeries, days: u32) -> DataResult<PriceSeries> {
    let Some(last) = series.last_timestamp() else {
        return Ok(series.clone());
    };
    let cutoff = last - Duration::days(days as i64);
    let points = series
        .points()
        .iter()
        .filter(|p| p.timestamp >= cutoff)
        .copied()
        .collect();
    Ok(PriceSeries::new(series.asset().clone(), points)?)
}

/// Provider backed by series and quotes held in memory
#[derive(Debug, Default, Clone)]
pub struct InMemoryProvider {
    histories: HashMap<AssetId, PriceSeries>,
    quotes: HashMap<AssetId, SpotQuote>,
    names: HashMap<AssetId, String>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(mut self, series: PriceSeries) -> Self {
        self.histories.insert(series.asset().clone(), series);
        self
    }

    pub fn with_quote(mut self, asset: AssetId, name: &str, quote: SpotQuote) -> Self {
        self.names.insert(asset.clone(), name.to_string());
        self.quotes.insert(asset, quote);
        self
    }
}

#[async_trait]
impl MarketDataProvider for InMemoryProvider {
    async fn fetch_history(&self, asset: &AssetId, days: u32) -> DataResult<PriceSeries> {
        let series = self
            .histories
            .get(asset)
            .ok_or_else(|| DataError::AssetNotFound {
                asset: asset.to_string(),
            })?;
        trailing_days(series, days)
    }

    async fn spot_quotes(&self, assets: &[AssetId]) -> DataResult<HashMap<AssetId, SpotQuote>> {
        Ok(assets
            .iter()
            .filter_map(|a| self.quotes.get(a).map(|q| (a.clone(), q.clone())))
            .collect())
    }

    async fn asset_names(&self) -> DataResult<HashMap<AssetId, String>> {
        Ok(self.names.clone())
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

/// CSV provider reading `<dir>/<asset>.csv` histories and `<dir>/quotes.csv`
#[derive(Debug)]
pub struct CsvProvider {
    pub data_directory: PathBuf,
    pub quotes_file: String,
}

#[derive(Debug, Deserialize)]
struct HistoryRecord {
    #[serde(alias = "Date", alias = "date")]
    timestamp: String,
    #[serde(alias = "Price", alias = "close")]
    price: Option<f64>,
    #[serde(alias = "Volume", alias = "total_volume")]
    volume: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct QuoteRecord {
    #[serde(alias = "id")]
    asset_id: String,
    name: String,
    price: Decimal,
    #[serde(alias = "usd_24h_change")]
    change_24h_pct: Decimal,
}

impl CsvProvider {
    pub fn new<P: AsRef<Path>>(data_directory: P) -> Self {
        Self {
            data_directory: data_directory.as_ref().to_path_buf(),
            quotes_file: "quotes.csv".to_string(),
        }
    }

    fn history_path(&self, asset: &AssetId) -> PathBuf {
        self.data_directory.join(format!("{}.csv", asset))
    }

    fn read_history(&self, asset: &AssetId) -> DataResult<PriceSeries> {
        let path = self.history_path(asset);
        if !path.exists() {
            return Err(DataError::SourceNotFound(path.to_string_lossy().to_string()));
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|e| DataError::LoadingFailed {
                message: format!("Failed to open {}: {}", path.display(), e),
            })?;

        let mut points = Vec::new();
        for result in reader.deserialize() {
            let record: HistoryRecord = result.map_err(|e| DataError::ParseError {
                message: format!("CSV parsing error in {}: {}", path.display(), e),
            })?;
            points.push(PricePoint::new(
                parse_timestamp(&record.timestamp)?,
                record.price.unwrap_or(f64::NAN),
                record.volume.unwrap_or(f64::NAN),
            ));
        }

        points.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        tracing::debug!("Loaded {} points for {} from {}", points.len(), asset, path.display());
        Ok(PriceSeries::new(asset.clone(), points)?)
    }

    fn read_quotes(&self) -> DataResult<Vec<QuoteRecord>> {
        let path = self.data_directory.join(&self.quotes_file);
        if !path.exists() {
            return Err(DataError::SourceNotFound(path.to_string_lossy().to_string()));
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|e| DataError::LoadingFailed {
                message: format!("Failed to open {}: {}", path.display(), e),
            })?;

        reader
            .deserialize()
            .map(|r| {
                r.map_err(|e| DataError::ParseError {
                    message: format!("CSV parsing error in {}: {}", path.display(), e),
                })
            })
            .collect()
    }
}

/// RFC 3339, `%Y-%m-%d`, `%Y-%m-%d %H:%M:%S`, or epoch milliseconds.
fn parse_timestamp(raw: &str) -> DataResult<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc());
        }
    }
    if let Some(ts) = raw
        .parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
    {
        return Ok(ts);
    }
    Err(DataError::ParseError {
        message: format!("Unrecognised timestamp: {}", raw),
    })
}

#[async_trait]
impl MarketDataProvider for CsvProvider {
    async fn fetch_history(&self, asset: &AssetId, days: u32) -> DataResult<PriceSeries> {
        trailing_days(&self.read_history(asset)?, days)
    }

    async fn spot_quotes(&self, assets: &[AssetId]) -> DataResult<HashMap<AssetId, SpotQuote>> {
        let wanted: std::collections::HashSet<&AssetId> = assets.iter().collect();
        Ok(self
            .read_quotes()?
            .into_iter()
            .map(|r| (AssetId::new(&r.asset_id), SpotQuote::new(r.price, r.change_24h_pct)))
            .filter(|(id, _)| wanted.contains(id))
            .collect())
    }

    async fn asset_names(&self) -> DataResult<HashMap<AssetId, String>> {
        Ok(self
            .read_quotes()?
            .into_iter()
            .map(|r| (AssetId::new(&r.asset_id), r.name))
            .collect())
    }

    fn name(&self) -> &str {
        "csv"
    }
}
