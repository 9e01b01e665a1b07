pub mod providers;
pub mod cache;

pub use providers::*;
pub use cache::*;

use std::sync::Arc;

use rd_types::{AssetId, DataResult, MarketSnapshot, PriceSeries};
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Data manager materialises one cycle's inputs from a provider
#[derive(Debug, Clone)]
pub struct MarketDataManager {
    provider: Arc<dyn MarketDataProvider>,
}

impl MarketDataManager {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &dyn MarketDataProvider {
        self.provider.as_ref()
    }

    pub async fn fetch_history(&self, asset: &AssetId, days: u32) -> DataResult<PriceSeries> {
        self.provider.fetch_history(asset, days).await
    }

    /// Fetch histories (concurrently), quotes and names for `assets`.
    ///
    /// Never fails: an asset whose fetch errors or panics is simply absent
    /// from the snapshot, and the aggregator reports it as missing.
    pub async fn snapshot(&self, assets: &[AssetId], days: u32) -> MarketSnapshot {
        info!("Loading market data for {} assets from {}", assets.len(), self.provider.name());
        let mut snapshot = MarketSnapshot::new();

        let mut tasks = JoinSet::new();
        for asset in assets {
            let provider = Arc::clone(&self.provider);
            let asset = asset.clone();
            tasks.spawn(async move {
                let result = provider.fetch_history(&asset, days).await;
                (asset, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((asset, Ok(series))) => {
                    snapshot.histories.insert(asset, series);
                }
                Ok((asset, Err(e))) => {
                    warn!("Failed to load history for {}: {}", asset, e);
                }
                Err(e) => {
                    warn!("History fetch task aborted: {}", e);
                }
            }
        }

        match self.provider.spot_quotes(assets).await {
            Ok(quotes) => snapshot.quotes = quotes,
            Err(e) => warn!("Failed to load spot quotes: {}", e),
        }

        match self.provider.asset_names().await {
            Ok(names) => snapshot.names = names,
            Err(e) => warn!("Failed to load asset names: {}", e),
        }

        snapshot
    }
}
