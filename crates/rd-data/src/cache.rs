use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use rd_types::{AssetId, DataResult, PriceSeries, SpotQuote};
use std::collections::HashMap;

use crate::providers::MarketDataProvider;

/// Default staleness bound for histories and quotes.
pub fn default_freshness() -> Duration {
    Duration::hours(1)
}

/// Staleness bound for the asset-name listing, which rarely changes.
pub fn names_freshness() -> Duration {
    Duration::hours(24)
}

/// Cached value with the time it was fetched
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    fetched_at: DateTime<Utc>,
}

impl<T: Clone> CacheEntry<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            fetched_at: Utc::now(),
        }
    }

    fn fresh(&self, ttl: Duration) -> Option<T> {
        (Utc::now() - self.fetched_at < ttl).then(|| self.value.clone())
    }
}

/// Memoising wrapper around a [`MarketDataProvider`].
///
/// Anything it returns may be up to [`CachedProvider::freshness`] old.
/// Errors and empty histories are never cached.
#[derive(Debug)]
pub struct CachedProvider<P> {
    inner: P,
    ttl: Duration,
    histories: DashMap<(AssetId, u32), CacheEntry<PriceSeries>>,
    quotes: DashMap<AssetId, CacheEntry<SpotQuote>>,
    names: RwLock<Option<CacheEntry<HashMap<AssetId, String>>>>,
    stats: RwLock<CacheStats>,
}

impl<P: MarketDataProvider> CachedProvider<P> {
    pub fn new(inner: P) -> Self {
        Self::with_ttl(inner, default_freshness())
    }

    pub fn with_ttl(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            histories: DashMap::new(),
            quotes: DashMap::new(),
            names: RwLock::new(None),
            stats: RwLock::new(CacheStats::default()),
        }
    }

    /// Maximum age of any value served from the cache.
    pub fn freshness(&self) -> Duration {
        self.ttl
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn clear(&self) {
        self.histories.clear();
        self.quotes.clear();
        *self.names.write() = None;

        // Reset stats
        {
            let mut stats = self.stats.write();
            *stats = CacheStats::default();
        }
    }

    pub fn get_stats(&self) -> CacheStats {
        self.stats.read().clone()
    }

    fn hit(&self) {
        self.stats.write().hits += 1;
    }

    fn miss(&self) {
        self.stats.write().misses += 1;
    }
}

#[async_trait]
impl<P: MarketDataProvider> MarketDataProvider for CachedProvider<P> {
    async fn fetch_history(&self, asset: &AssetId, days: u32) -> DataResult<PriceSeries> {
        let key = (asset.clone(), days);
        let cached = self.histories.get(&key).and_then(|e| e.fresh(self.ttl));
        if let Some(series) = cached {
            self.hit();
            return Ok(series);
        }

        self.miss();
        let series = self.inner.fetch_history(asset, days).await?;
        if !series.is_empty() {
            self.histories.insert(key, CacheEntry::new(series.clone()));
            self.stats.write().stores += 1;
        }
        Ok(series)
    }

    async fn spot_quotes(&self, assets: &[AssetId]) -> DataResult<HashMap<AssetId, SpotQuote>> {
        let mut found = HashMap::new();
        let mut stale = Vec::new();
        for asset in assets {
            match self.quotes.get(asset).and_then(|e| e.fresh(self.ttl)) {
                Some(quote) => {
                    found.insert(asset.clone(), quote);
                }
                None => stale.push(asset.clone()),
            }
        }

        if stale.is_empty() {
            self.hit();
            return Ok(found);
        }

        self.miss();
        let fetched = self.inner.spot_quotes(&stale).await?;
        for (asset, quote) in fetched {
            self.quotes.insert(asset.clone(), CacheEntry::new(quote.clone()));
            found.insert(asset, quote);
        }
        self.stats.write().stores += 1;
        Ok(found)
    }

    async fn asset_names(&self) -> DataResult<HashMap<AssetId, String>> {
        let cached = self
            .names
            .read()
            .as_ref()
            .and_then(|e| e.fresh(names_freshness()));
        if let Some(names) = cached {
            self.hit();
            return Ok(names);
        }

        self.miss();
        let names = self.inner.asset_names().await?;
        *self.names.write() = Some(CacheEntry::new(names.clone()));
        Ok(names)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}
