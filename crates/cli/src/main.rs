use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skinscope_core::config::Settings;
use skinscope_core::gateway::Gateway;
use skinscope_core::llm::openai::OpenAiClient;
use skinscope_core::llm::{self, ForecastRequest};
use skinscope_core::market::csqaq::CsqaqClient;
use skinscope_core::market::sales::fetch_sales_bundle;
use skinscope_core::market::types::Platform;
use skinscope_core::market::{MarketDataClient, HOT_LIST_PAGE_SIZE};

#[derive(Debug, Parser)]
#[command(name = "skinscope", about = "Query the skin market through the paced upstream gateway")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Search items by name.
    Search { query: String },

    /// Print the raw item detail body.
    Snapshot { item_id: i64 },

    /// Fetch the 30-day listing, turnover and price series.
    Sales {
        item_id: i64,
        /// Platform code (1, 2, 3) or name (buff, yyyp, steam).
        #[arg(long, default_value = "buff")]
        platform: Platform,
    },

    /// First page of the hot-series list.
    Hot {
        #[arg(long, default_value_t = HOT_LIST_PAGE_SIZE)]
        page_size: u32,
    },

    /// Latest 7-day BUFF price for one style of an item.
    StylePrice { item_id: i64, style: String },

    /// Fetch snapshot and series, then ask the language model for a forecast.
    Forecast {
        item_id: i64,
        /// Display name used when the snapshot has none.
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value = "buff")]
        platform: Platform,
        /// Skip the series fetch and prompt with the snapshot only.
        #[arg(long)]
        no_sales: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let gateway = Arc::new(Gateway::from_settings(&settings));
    let market = CsqaqClient::from_settings(&settings, gateway)?;

    match run(&settings, &market, args.command).await {
        Ok(out) => {
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(())
        }
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "command failed");
            Err(err)
        }
    }
}

async fn run(
    settings: &Settings,
    market: &dyn MarketDataClient,
    command: Command,
) -> anyhow::Result<serde_json::Value> {
    let out = match command {
        Command::Search { query } => serde_json::to_value(market.search_items(&query).await?)?,
        Command::Snapshot { item_id } => {
            serde_json::to_value(market.fetch_item_snapshot(item_id).await?)?
        }
        Command::Sales { item_id, platform } => {
            let bundle = fetch_sales_bundle(market, item_id, platform).await;
            if !bundle.missing.is_empty() {
                tracing::warn!(item_id, missing = ?bundle.missing, "some series are unavailable");
            }
            serde_json::to_value(bundle)?
        }
        Command::Hot { page_size } => serde_json::to_value(market.fetch_hot_list(1, page_size).await?)?,
        Command::StylePrice { item_id, style } => {
            let price = market.fetch_style_price(item_id, &style).await?;
            json!({ "item_id": item_id, "style": style, "price": price })
        }
        Command::Forecast {
            item_id,
            name,
            platform,
            no_sales,
        } => {
            let snapshot = market.fetch_item_snapshot(item_id).await?;
            let goods_info = snapshot
                .goods_info()
                .with_context(|| format!("item {item_id} returned no goods_info"))?;
            let sales = if no_sales {
                None
            } else {
                Some(fetch_sales_bundle(market, item_id, platform).await)
            };

            let req = ForecastRequest {
                item_name: name.unwrap_or_else(|| item_id.to_string()),
                goods_info,
                sales,
            };
            let forecaster = OpenAiClient::from_settings(settings)?;
            let prediction = llm::forecast(&forecaster, &req).await?;
            json!({ "item_id": item_id, "prediction": prediction })
        }
    };
    Ok(out)
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sales_platform_accepts_codes_and_names() {
        let args = Args::try_parse_from(["skinscope", "sales", "7310", "--platform", "3"]).unwrap();
        match args.command {
            Command::Sales { item_id, platform } => {
                assert_eq!(item_id, 7310);
                assert_eq!(platform, Platform::Steam);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let args = Args::try_parse_from(["skinscope", "sales", "7310", "--platform", "yyyp"]).unwrap();
        assert!(matches!(args.command, Command::Sales { platform: Platform::Yyyp, .. }));

        assert!(Args::try_parse_from(["skinscope", "sales", "7310", "--platform", "csgo"]).is_err());
    }

    #[test]
    fn forecast_defaults() {
        let args = Args::try_parse_from(["skinscope", "forecast", "42"]).unwrap();
        match args.command {
            Command::Forecast {
                item_id,
                name,
                platform,
                no_sales,
            } => {
                assert_eq!(item_id, 42);
                assert_eq!(name, None);
                assert_eq!(platform, Platform::Buff);
                assert!(!no_sales);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn style_price_takes_item_and_style() {
        let args = Args::try_parse_from(["skinscope", "style-price", "42", "Phase 2"]).unwrap();
        assert!(matches!(
            args.command,
            Command::StylePrice { item_id: 42, ref style } if style == "Phase 2"
        ));
    }
}
