pub mod csqaq;
pub mod sales;
pub mod types;

use anyhow::Result;
use types::{ChartSeries, ItemSnapshot, Platform, SearchResult, SeriesKey, SeriesSummary};

/// Lookback used for the charts shown next to an item.
pub const SERIES_PERIOD_DAYS: u32 = 30;
/// Lookback used when pricing a single style variant.
pub const STYLE_PRICE_PERIOD_DAYS: u32 = 7;
/// Style filter meaning "every finish of the item".
pub const ALL_STYLES: &str = "all_style";
pub const HOT_LIST_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesQuery {
    pub item_id: i64,
    pub key: SeriesKey,
    pub platform: Platform,
    pub period_days: u32,
    pub style: String,
}

/// Market-data operations. Implementations are expected to pace every call
/// through a shared [`crate::gateway::Gateway`].
#[async_trait::async_trait]
pub trait MarketDataClient: Send + Sync {
    async fn search_items(&self, query: &str) -> Result<Vec<SearchResult>>;

    async fn fetch_item_snapshot(&self, item_id: i64) -> Result<ItemSnapshot>;

    /// `Ok(None)` means the upstream answered successfully but had no chart.
    async fn fetch_series(&self, query: &SeriesQuery) -> Result<Option<ChartSeries>>;

    async fn fetch_hot_list(&self, page: u32, page_size: u32) -> Result<Vec<SeriesSummary>>;

    /// Latest BUFF price of one style variant over the last week; `0.0` when
    /// the upstream has no non-null sample.
    async fn fetch_style_price(&self, item_id: i64, style: &str) -> Result<f64> {
        let query = SeriesQuery {
            item_id,
            key: SeriesKey::SellPrice,
            platform: Platform::Buff,
            period_days: STYLE_PRICE_PERIOD_DAYS,
            style: style.to_string(),
        };
        let series = self.fetch_series(&query).await?;
        Ok(series.and_then(|s| s.latest_value()).unwrap_or(0.0))
    }
}
