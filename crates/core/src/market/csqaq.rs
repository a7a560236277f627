use crate::config::Settings;
use crate::error::{Upstream, UpstreamError};
use crate::gateway::Gateway;
use crate::market::types::{
    ApiEnvelope, ChartSeries, ItemSnapshot, SearchResult, SeriesSummary, Suggestion, API_CODE_OK,
};
use crate::market::{MarketDataClient, SeriesQuery};
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

const PATH_SEARCH: &str = "search/suggest";
const PATH_ITEM: &str = "info/good";
const PATH_CHART: &str = "info/chart";
const PATH_SERIES_LIST: &str = "info/get_series_list";

/// HTTP client for the CSQAQ market-data API. Every request waits on the
/// shared [`Gateway`] first; there are no retries.
#[derive(Debug, Clone)]
pub struct CsqaqClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
    gateway: Arc<Gateway>,
}

#[derive(Debug, Serialize)]
struct ChartRequest<'a> {
    good_id: i64,
    key: &'a str,
    platform: i64,
    period: u32,
    style: &'a str,
}

#[derive(Debug, Serialize)]
struct SeriesListRequest {
    page: u32,
    page_size: u32,
}

impl CsqaqClient {
    pub fn from_settings(settings: &Settings, gateway: Arc<Gateway>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.csqaq_timeout)
            .build()
            .context("failed to build market-data http client")?;

        Ok(Self {
            http,
            base_url: settings.csqaq_base_url.clone(),
            api_token: settings.csqaq_api_token.clone(),
            gateway,
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let token = HeaderValue::from_str(&self.api_token).map_err(|e| {
            UpstreamError::new(
                Upstream::MarketData,
                "config",
                format!("CSQAQ_API_TOKEN is not a valid header value: {e}"),
            )
        })?;
        headers.insert("ApiToken", token);
        Ok(headers)
    }

    /// Paces, sends, and unwraps the `{code, msg, data}` envelope. Returns the
    /// raw body alongside the parsed envelope.
    async fn send(
        &self,
        req: reqwest::RequestBuilder,
        path: &'static str,
    ) -> Result<(Value, ApiEnvelope<Value>)> {
        self.gateway.acquire().await;
        tracing::debug!(path, "market-data request");

        let res = req.send().await.map_err(|e| {
            UpstreamError::new(Upstream::MarketData, "transport", format!("{path}: {e}"))
        })?;

        let status = res.status();
        let text = res.text().await.map_err(|e| {
            UpstreamError::new(
                Upstream::MarketData,
                "transport",
                format!("{path}: failed to read body: {e}"),
            )
        })?;
        if !status.is_success() {
            return Err(UpstreamError::new(
                Upstream::MarketData,
                "http",
                format!("{path}: status={status} body={text}"),
            )
            .into());
        }

        let raw_json = serde_json::from_str::<Value>(&text).map_err(|e| {
            UpstreamError::new(
                Upstream::MarketData,
                "decode",
                format!("{path}: body is not JSON ({e}): {text}"),
            )
        })?;
        let envelope = serde_json::from_value::<ApiEnvelope<Value>>(raw_json.clone()).map_err(|e| {
            UpstreamError::new(
                Upstream::MarketData,
                "decode",
                format!("{path}: missing envelope fields: {e}"),
            )
        })?;

        if envelope.code != API_CODE_OK {
            return Err(UpstreamError::rejected(Upstream::MarketData, envelope.code, envelope.msg).into());
        }
        Ok((raw_json, envelope))
    }

    async fn send_for_data<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
        path: &'static str,
    ) -> Result<Option<T>> {
        let (_, envelope) = self.send(req, path).await?;
        match envelope.data {
            None | Some(Value::Null) => Ok(None),
            Some(data) => serde_json::from_value::<T>(data).map(Some).map_err(|e| {
                UpstreamError::new(
                    Upstream::MarketData,
                    "decode",
                    format!("{path}: unexpected data shape: {e}"),
                )
                .into()
            }),
        }
    }
}

#[async_trait::async_trait]
impl MarketDataClient for CsqaqClient {
    async fn search_items(&self, query: &str) -> Result<Vec<SearchResult>> {
        let req = self
            .http
            .get(self.url(PATH_SEARCH))
            .headers(self.headers()?)
            .query(&[("text", query)]);

        let rows: Vec<Suggestion> = self.send_for_data(req, PATH_SEARCH).await?.unwrap_or_default();
        Ok(rows
            .into_iter()
            .filter_map(Suggestion::into_search_result)
            .collect())
    }

    async fn fetch_item_snapshot(&self, item_id: i64) -> Result<ItemSnapshot> {
        let req = self
            .http
            .get(self.url(PATH_ITEM))
            .headers(self.headers()?)
            .query(&[("id", item_id)]);

        let (raw_json, _) = self.send(req, PATH_ITEM).await?;
        Ok(ItemSnapshot(raw_json))
    }

    async fn fetch_series(&self, query: &SeriesQuery) -> Result<Option<ChartSeries>> {
        let body = ChartRequest {
            good_id: query.item_id,
            key: query.key.as_str(),
            platform: query.platform.code(),
            period: query.period_days,
            style: &query.style,
        };
        let req = self
            .http
            .post(self.url(PATH_CHART))
            .headers(self.headers()?)
            .json(&body);

        self.send_for_data(req, PATH_CHART).await
    }

    async fn fetch_hot_list(&self, page: u32, page_size: u32) -> Result<Vec<SeriesSummary>> {
        let req = self
            .http
            .post(self.url(PATH_SERIES_LIST))
            .headers(self.headers()?)
            .json(&SeriesListRequest { page, page_size });

        let mut rows: Vec<SeriesSummary> = self
            .send_for_data(req, PATH_SERIES_LIST)
            .await?
            .unwrap_or_default();
        rows.truncate(page_size as usize);
        Ok(rows)
    }
}
