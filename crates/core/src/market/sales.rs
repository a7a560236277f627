use crate::market::types::{ChartSeries, Platform, SeriesKey};
use crate::market::{MarketDataClient, SeriesQuery, ALL_STYLES, SERIES_PERIOD_DAYS};
use serde::{Deserialize, Serialize};

/// Listing-count, turnover, and price charts for one item.
///
/// A `None` series whose key is absent from `missing` means the upstream had no
/// data; a key listed in `missing` means that sub-fetch failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesBundle {
    pub sell_num_data: Option<ChartSeries>,
    pub turnover_data: Option<ChartSeries>,
    pub price_data: Option<ChartSeries>,
    #[serde(default)]
    pub missing: Vec<SeriesKey>,
}

impl SalesBundle {
    pub fn is_empty(&self) -> bool {
        self.sell_num_data.is_none() && self.turnover_data.is_none() && self.price_data.is_none()
    }

    pub fn series(&self, key: SeriesKey) -> Option<&ChartSeries> {
        match key {
            SeriesKey::SellNum => self.sell_num_data.as_ref(),
            SeriesKey::TurnoverNumber => self.turnover_data.as_ref(),
            SeriesKey::SellPrice => self.price_data.as_ref(),
        }
    }

    fn slot(&mut self, key: SeriesKey) -> &mut Option<ChartSeries> {
        match key {
            SeriesKey::SellNum => &mut self.sell_num_data,
            SeriesKey::TurnoverNumber => &mut self.turnover_data,
            SeriesKey::SellPrice => &mut self.price_data,
        }
    }
}

/// Fetches the three charts one after another, each paced by the client's
/// gateway. A failed sub-fetch is logged and recorded in `missing`; it never
/// fails the bundle. Turnover is only published for Steam.
pub async fn fetch_sales_bundle(
    client: &dyn MarketDataClient,
    item_id: i64,
    platform: Platform,
) -> SalesBundle {
    let plan = [
        (SeriesKey::SellNum, platform),
        (SeriesKey::TurnoverNumber, Platform::Steam),
        (SeriesKey::SellPrice, platform),
    ];

    let mut bundle = SalesBundle::default();
    for (key, platform) in plan {
        let query = SeriesQuery {
            item_id,
            key,
            platform,
            period_days: SERIES_PERIOD_DAYS,
            style: ALL_STYLES.to_string(),
        };

        match client.fetch_series(&query).await {
            Ok(series) => *bundle.slot(key) = series,
            Err(err) => {
                tracing::warn!(
                    item_id,
                    metric = %key,
                    platform = platform.label(),
                    error = %err,
                    "series fetch failed; continuing without it"
                );
                bundle.missing.push(key);
            }
        }
    }

    bundle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::types::{ItemSnapshot, SearchResult, SeriesSummary};
    use std::sync::Mutex;

    /// Serves a fixed chart per key; keys in `fail` error out.
    struct ScriptedCharts {
        fail: Vec<SeriesKey>,
        seen: Mutex<Vec<SeriesQuery>>,
    }

    impl ScriptedCharts {
        fn failing(fail: &[SeriesKey]) -> Self {
            Self {
                fail: fail.to_vec(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl MarketDataClient for ScriptedCharts {
        async fn search_items(&self, _query: &str) -> anyhow::Result<Vec<SearchResult>> {
            unreachable!()
        }

        async fn fetch_item_snapshot(&self, _item_id: i64) -> anyhow::Result<ItemSnapshot> {
            unreachable!()
        }

        async fn fetch_series(&self, query: &SeriesQuery) -> anyhow::Result<Option<ChartSeries>> {
            self.seen.lock().unwrap().push(query.clone());
            if self.fail.contains(&query.key) {
                anyhow::bail!("boom");
            }
            Ok(Some(ChartSeries {
                timestamp: vec![1],
                main_data: vec![serde_json::json!(query.platform.code())],
                ..Default::default()
            }))
        }

        async fn fetch_hot_list(&self, _page: u32, _page_size: u32) -> anyhow::Result<Vec<SeriesSummary>> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn fetches_in_order_with_turnover_pinned_to_steam() {
        let client = ScriptedCharts::failing(&[]);
        let bundle = fetch_sales_bundle(&client, 9, Platform::Yyyp).await;

        let seen = client.seen.lock().unwrap();
        let keys: Vec<_> = seen.iter().map(|q| (q.key, q.platform)).collect();
        assert_eq!(
            keys,
            vec![
                (SeriesKey::SellNum, Platform::Yyyp),
                (SeriesKey::TurnoverNumber, Platform::Steam),
                (SeriesKey::SellPrice, Platform::Yyyp),
            ]
        );
        assert!(seen.iter().all(|q| q.period_days == 30 && q.style == "all_style"));
        assert!(bundle.missing.is_empty());
        assert_eq!(bundle.turnover_data.unwrap().latest_value(), Some(3.0));
    }

    #[tokio::test]
    async fn one_failed_metric_leaves_the_others() {
        let client = ScriptedCharts::failing(&[SeriesKey::TurnoverNumber]);
        let bundle = fetch_sales_bundle(&client, 9, Platform::Buff).await;

        assert!(bundle.sell_num_data.is_some());
        assert!(bundle.turnover_data.is_none());
        assert!(bundle.price_data.is_some());
        assert_eq!(bundle.missing, vec![SeriesKey::TurnoverNumber]);
    }

    #[tokio::test]
    async fn all_metrics_failing_is_still_a_bundle() {
        let client = ScriptedCharts::failing(&[
            SeriesKey::SellNum,
            SeriesKey::TurnoverNumber,
            SeriesKey::SellPrice,
        ]);
        let bundle = fetch_sales_bundle(&client, 9, Platform::Buff).await;
        assert!(bundle.is_empty());
        assert_eq!(bundle.missing.len(), 3);
    }

    #[test]
    fn serializes_to_flat_metric_fields() {
        let bundle = SalesBundle {
            missing: vec![SeriesKey::SellPrice],
            ..Default::default()
        };
        let v = serde_json::to_value(&bundle).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "sell_num_data": null,
                "turnover_data": null,
                "price_data": null,
                "missing": ["sell_price"],
            })
        );
    }
}
