use crate::llm::ForecastRequest;
use crate::market::sales::SalesBundle;
use crate::market::types::{GoodsInfo, SeriesKey};
use chrono::{TimeZone, Utc};

pub const SYSTEM_PROMPT: &str =
    "You are a senior CS2 skin market analyst with ten years of trading experience.";

// Fixed market rules the model must account for.
const MARKET_NOTES: &[&str] = &[
    "Every item gets a 7-day trade cooldown after purchase.",
    "The CS skin market is highly sentiment-driven; factor that into the analysis.",
    "Since the trade-reversal update, sale proceeds are frozen on the trading platform for 7 days.",
    "Seller fees: YYYP 1%, BUFF 2.5%, Steam 15% (buyer pays = seller receives + 15% of seller receives).",
    "Withdrawal fees (minimum withdrawal 10 CNY): YYYP 1% (minimum 2 CNY), BUFF 1%, Steam balance cannot be withdrawn.",
    "If the Steam price is 0, leave Steam out of the comparison.",
];

const QUESTIONS: &[&str] = &[
    "Price trend and supply/demand: combine the price history with recent listing-count and turnover changes, judge the current trend, and analyse supply versus demand.",
    "Platform choice: which platform offers a buying opportunity? As a seller, after trading and withdrawal fees, which platform nets the most?",
    "Short term (1-7 days): predict the direction (up, down, sideways) and give the core reasons.",
    "Medium term (8-15 days): predict the direction (up, down, sideways) and give the core reasons.",
    "Long term (beyond 15 days): predict the direction (up, down, sideways) and give the core reasons.",
    "Investment advice: give a clear recommendation.",
];

pub fn user_prompt(req: &ForecastRequest) -> String {
    let info = &req.goods_info;
    let name = info
        .market_hash_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(req.item_name.trim());

    let mut lines: Vec<String> = vec![
        "Using the live data and price history below, produce a thorough investment analysis of this item.".to_string(),
        String::new(),
        format!("Item: {name}"),
        String::new(),
        "1. Price change history:".to_string(),
    ];

    let changes = info.price_changes();
    if changes.is_empty() {
        lines.push("- no change figures available".to_string());
    }
    lines.extend(
        changes
            .into_iter()
            .map(|(days, pct)| format!("- {days}-day change: {pct:.2}%")),
    );

    lines.push(String::new());
    lines.push("2. Current prices:".to_string());
    lines.push(format!("- BUFF: {}", money(info.buff_sell_price)));
    lines.push(format!("- YYYP: {}", money(info.yyyp_sell_price)));
    lines.push(format!("- Steam: {}", money(info.steam_sell_price)));

    lines.push(String::new());
    lines.push("3. Supply and demand:".to_string());
    lines.extend(supply_lines(info));

    if let Some(sales) = req.sales.as_ref().filter(|s| !s.is_empty()) {
        lines.push(String::new());
        lines.push("4. Recent 30-day series:".to_string());
        lines.extend(series_digest(sales));
    }

    lines.push(String::new());
    lines.push("Market notes:".to_string());
    lines.extend(MARKET_NOTES.iter().map(|note| format!("- {note}")));

    lines.push(String::new());
    lines.push("Answer each of the following:".to_string());
    lines.extend(
        QUESTIONS
            .iter()
            .enumerate()
            .map(|(i, q)| format!("{}. {q}", i + 1)),
    );

    lines.push(String::new());
    lines.push(
        "Format: plain text, no markdown. Start each answer with its number, e.g. \"1. \". Separate paragraphs with a blank line.".to_string(),
    );
    lines.join("\n")
}

fn supply_lines(info: &GoodsInfo) -> Vec<String> {
    vec![
        format!("- BUFF listings: {}", count(info.buff_sell_num)),
        format!("- YYYP listings: {}", count(info.yyyp_sell_num)),
        format!("- Steam listings: {}", count(info.steam_sell_num)),
        format!("- Steam latest daily turnover: {}", count(info.turnover_number)),
    ]
}

fn series_digest(sales: &SalesBundle) -> Vec<String> {
    let labels = [
        (SeriesKey::SellNum, "Listings"),
        (SeriesKey::TurnoverNumber, "Steam turnover"),
        (SeriesKey::SellPrice, "Price"),
    ];

    let mut lines = Vec::new();
    for (key, label) in labels {
        let Some(series) = sales.series(key) else {
            continue;
        };
        let (Some(first), Some(last)) = (series.earliest_value(), series.latest_value()) else {
            continue;
        };
        let span = match (series.timestamp.iter().min(), series.timestamp.iter().max()) {
            (Some(a), Some(b)) => format!(" ({} to {})", day(*a), day(*b)),
            _ => String::new(),
        };
        lines.push(format!("- {label}: {} -> {}{span}", trim_num(first), trim_num(last)));
    }
    lines
}

fn money(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("CNY {}", trim_num(v)),
        None => "N/A".to_string(),
    }
}

fn count(v: Option<f64>) -> String {
    v.map(trim_num).unwrap_or_else(|| "N/A".to_string())
}

fn trim_num(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v:.2}")
    }
}

fn day(ts_ms: i64) -> String {
    match Utc.timestamp_millis_opt(ts_ms).single() {
        Some(dt) => dt.format("%Y-%m-%d").to_string(),
        None => ts_ms.to_string(),
    }
}
