use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skinscope_core::config::Settings;
use skinscope_core::gateway::Gateway;
use skinscope_core::llm::openai::OpenAiClient;
use skinscope_core::market::csqaq::CsqaqClient;

mod envelope;
mod routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    if settings.csqaq_api_token.trim().is_empty() {
        tracing::warn!("CSQAQ_API_TOKEN is not set; market data calls will be rejected upstream");
    }
    if settings.openai_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; price forecasts will fail");
    }

    let gateway = Arc::new(Gateway::from_settings(&settings));
    let min_interval = gateway.min_interval();
    let market = CsqaqClient::from_settings(&settings, gateway)?;
    let forecaster = OpenAiClient::from_settings(&settings)?;

    let state = routes::AppState {
        market: Arc::new(market),
        forecaster: Arc::new(forecaster),
    };
    let app = routes::router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], settings.port));
    tracing::info!(
        %addr,
        min_interval_ms = min_interval.as_millis() as u64,
        model = %settings.openai_model,
        "api listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
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
