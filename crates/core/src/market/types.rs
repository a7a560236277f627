use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Body envelope every market-data endpoint answers with.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    pub data: Option<T>,
}

pub const API_CODE_OK: i64 = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub name: String,
    pub market_hash_name: String,
}

/// Raw suggestion row as returned by `/search/suggest`.
#[derive(Debug, Clone, Deserialize)]
pub struct Suggestion {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub value: Option<String>,
}

impl Suggestion {
    pub fn into_search_result(self) -> Option<SearchResult> {
        let id = id_to_string(&self.id)?;
        let name = self.value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())?;
        Some(SearchResult {
            id,
            market_hash_name: name.clone(),
            name,
        })
    }
}

/// Renders a numeric or string identifier; anything else (or blank) is `None`.
pub fn id_to_string(v: &Value) -> Option<String> {
    let s = match v {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

/// Full upstream body of the item-detail call. Passed through untouched; the
/// typed view used for prompting is [`GoodsInfo`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemSnapshot(pub Value);

impl ItemSnapshot {
    /// Extracts `data.goods_info`, if present.
    pub fn goods_info(&self) -> anyhow::Result<GoodsInfo> {
        let raw = self
            .0
            .get("data")
            .and_then(|d| d.get("goods_info"))
            .filter(|g| g.is_object())
            .ok_or_else(|| anyhow::anyhow!("snapshot has no data.goods_info object"))?;
        Ok(serde_json::from_value(raw.clone())?)
    }
}

/// Subset of `goods_info` the forecast prompt reads.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GoodsInfo {
    #[serde(default)]
    pub market_hash_name: Option<String>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub buff_sell_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub yyyp_sell_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub steam_sell_price: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub buff_sell_num: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub yyyp_sell_num: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub steam_sell_num: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub turnover_number: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub sell_price_rate_1: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub sell_price_rate_7: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub sell_price_rate_30: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub sell_price_rate_90: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub sell_price_rate_180: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub sell_price_rate_365: Option<f64>,
}

impl GoodsInfo {
    /// `(days, percent)` for every change period the upstream reported.
    pub fn price_changes(&self) -> Vec<(u32, f64)> {
        [
            (1, self.sell_price_rate_1),
            (7, self.sell_price_rate_7),
            (30, self.sell_price_rate_30),
            (90, self.sell_price_rate_90),
            (180, self.sell_price_rate_180),
            (365, self.sell_price_rate_365),
        ]
        .into_iter()
        .filter_map(|(days, v)| v.map(|v| (days, v)))
        .collect()
    }
}

/// Accepts a JSON number, a numeric string, or null.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;
    Ok(v.as_ref().and_then(value_f64))
}

fn value_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_num(s),
        _ => None,
    }
}

fn parse_num(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    t.parse::<f64>().ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKey {
    /// Number of active listings.
    SellNum,
    TurnoverNumber,
    SellPrice,
}

impl SeriesKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SeriesKey::SellNum => "sell_num",
            SeriesKey::TurnoverNumber => "turnover_number",
            SeriesKey::SellPrice => "sell_price",
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Platform {
    #[default]
    Buff,
    Yyyp,
    Steam,
}

impl Platform {
    pub fn code(self) -> i64 {
        match self {
            Platform::Buff => 1,
            Platform::Yyyp => 2,
            Platform::Steam => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Platform::Buff => "BUFF",
            Platform::Yyyp => "YYYP",
            Platform::Steam => "Steam",
        }
    }
}

impl FromStr for Platform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "buff" => Ok(Platform::Buff),
            "2" | "yyyp" => Ok(Platform::Yyyp),
            "3" | "steam" => Ok(Platform::Steam),
            other => anyhow::bail!("unknown platform: {other:?}"),
        }
    }
}

/// One historical chart as returned by `/info/chart`. Samples and unknown
/// fields are kept as raw JSON so the series round-trips to the browser
/// unchanged; they are only read as numbers on lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    #[serde(default)]
    pub timestamp: Vec<i64>,
    #[serde(default)]
    pub main_data: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub value: Option<f64>,
}

impl ChartSeries {
    pub fn points(&self) -> impl Iterator<Item = SeriesPoint> + '_ {
        self.timestamp
            .iter()
            .zip(self.main_data.iter())
            .map(|(ts, v)| SeriesPoint {
                timestamp: *ts,
                value: value_f64(v),
            })
    }

    fn aligned(&self) -> bool {
        !self.timestamp.is_empty() && self.timestamp.len() == self.main_data.len()
    }

    /// Most recent non-null sample. Ordered by timestamp when timestamps line up
    /// with the samples; otherwise by position, newest last.
    pub fn latest_value(&self) -> Option<f64> {
        if self.aligned() {
            return self
                .points()
                .filter(|p| p.value.is_some())
                .max_by_key(|p| p.timestamp)
                .and_then(|p| p.value);
        }
        self.main_data.iter().rev().find_map(value_f64)
    }

    /// Oldest non-null sample, mirroring [`ChartSeries::latest_value`].
    pub fn earliest_value(&self) -> Option<f64> {
        if self.aligned() {
            return self
                .points()
                .filter(|p| p.value.is_some())
                .min_by_key(|p| p.timestamp)
                .and_then(|p| p.value);
        }
        self.main_data.iter().find_map(value_f64)
    }
}

/// One row of the hot-series list. Only the fields the front end reads are
/// typed; the rest is passed through. No typed field rejects a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub sell_price_7: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn suggestion_maps_numeric_and_string_ids() {
        let s: Suggestion = serde_json::from_value(json!({"id": 7310, "value": "AK-47 | Redline"})).unwrap();
        let r = s.into_search_result().unwrap();
        assert_eq!(r.id, "7310");
        assert_eq!(r.name, "AK-47 | Redline");
        assert_eq!(r.market_hash_name, r.name);

        let s: Suggestion = serde_json::from_value(json!({"id": "abc", "value": "Knife"})).unwrap();
        assert_eq!(s.into_search_result().unwrap().id, "abc");
    }

    #[test]
    fn suggestion_without_name_or_id_is_dropped() {
        let s: Suggestion = serde_json::from_value(json!({"id": 1, "value": "  "})).unwrap();
        assert!(s.into_search_result().is_none());
        let s: Suggestion = serde_json::from_value(json!({"value": "x"})).unwrap();
        assert!(s.into_search_result().is_none());
    }

    #[test]
    fn goods_info_reads_numbers_strings_and_nulls() {
        let snap = ItemSnapshot(json!({
            "code": 200,
            "data": {"goods_info": {
                "market_hash_name": "AWP | Asiimov",
                "buff_sell_price": 89.5,
                "yyyp_sell_price": "88.00",
                "steam_sell_price": null,
                "sell_price_rate_7": -1.2,
                "sell_price_rate_30": 4
            }}
        }));
        let info = snap.goods_info().unwrap();
        assert_eq!(info.buff_sell_price, Some(89.5));
        assert_eq!(info.yyyp_sell_price, Some(88.0));
        assert_eq!(info.steam_sell_price, None);
        assert_eq!(info.price_changes(), vec![(7, -1.2), (30, 4.0)]);
    }

    #[test]
    fn goods_info_missing_is_an_error() {
        let snap = ItemSnapshot(json!({"code": 200, "data": {}}));
        assert!(snap.goods_info().is_err());
    }

    #[test]
    fn platform_parses_codes_and_names() {
        assert_eq!("1".parse::<Platform>().unwrap(), Platform::Buff);
        assert_eq!(" Steam ".parse::<Platform>().unwrap(), Platform::Steam);
        assert_eq!("2".parse::<Platform>().unwrap().code(), 2);
        assert!("9".parse::<Platform>().is_err());
    }

    #[test]
    fn latest_uses_time_order() {
        let oldest_first = ChartSeries {
            timestamp: vec![1, 2, 3, 4],
            main_data: vec![Value::Null, Value::Null, json!(12.5), json!(10.0)],
            ..Default::default()
        };
        assert_eq!(oldest_first.latest_value(), Some(10.0));
        assert_eq!(oldest_first.earliest_value(), Some(12.5));

        let newest_first = ChartSeries {
            timestamp: vec![4, 3, 2, 1],
            main_data: vec![json!(10.0), json!(12.5), Value::Null, Value::Null],
            ..Default::default()
        };
        assert_eq!(newest_first.latest_value(), Some(10.0));
    }

    #[test]
    fn latest_falls_back_to_position_without_timestamps() {
        let s = ChartSeries {
            timestamp: vec![],
            main_data: vec![json!(3), json!("4.0"), Value::Null],
            ..Default::default()
        };
        assert_eq!(s.latest_value(), Some(4.0));
        assert_eq!(s.earliest_value(), Some(3.0));
    }

    #[test]
    fn all_null_series_has_no_latest() {
        let s = ChartSeries {
            timestamp: vec![1, 2],
            main_data: vec![Value::Null, Value::Null],
            ..Default::default()
        };
        assert!(s.latest_value().is_none());
    }

    #[test]
    fn chart_series_keeps_unknown_fields() {
        let v = json!({"timestamp": [1], "main_data": [2.0], "num_data": [5]});
        let s: ChartSeries = serde_json::from_value(v.clone()).unwrap();
        assert_eq!(serde_json::to_value(&s).unwrap(), v);
    }

    #[test]
    fn whole_number_samples_round_trip_as_integers() {
        let v = json!({"timestamp": [1000, 2000, 3000], "main_data": [120, null, 130]});
        let s: ChartSeries = serde_json::from_value(v.clone()).unwrap();
        assert_eq!(serde_json::to_value(&s).unwrap(), v);
        assert!(serde_json::to_string(&s).unwrap().contains("[120,null,130]"));
        assert_eq!(s.latest_value(), Some(130.0));
        assert_eq!(s.earliest_value(), Some(120.0));
    }

    #[test]
    fn series_summary_tolerates_null_and_string_fields() {
        let row: SeriesSummary = serde_json::from_value(json!({
            "name": null,
            "total_value": "1234.5",
            "sell_price_7": null,
            "id": 9
        }))
        .unwrap();
        assert_eq!(row.name, None);
        assert_eq!(row.total_value, Some(1234.5));
        assert_eq!(row.extra["id"], 9);
    }
}
