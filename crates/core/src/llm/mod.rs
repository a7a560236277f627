pub mod openai;
pub mod prompt;

use crate::market::sales::SalesBundle;
use crate::market::types::GoodsInfo;

/// Everything the forecast prompt is built from.
#[derive(Debug, Clone)]
pub struct ForecastRequest {
    pub goods_info: GoodsInfo,
    pub item_name: String,
    pub sales: Option<SalesBundle>,
}

#[async_trait::async_trait]
pub trait ForecastClient: Send + Sync {
    fn model(&self) -> &str;

    /// Single non-streaming completion; the narrative comes back verbatim.
    async fn request_forecast(&self, system: &str, prompt: &str) -> anyhow::Result<String>;
}

/// Builds the prompt for `req` and asks `client` for the narrative.
pub async fn forecast(client: &dyn ForecastClient, req: &ForecastRequest) -> anyhow::Result<String> {
    let prompt = prompt::user_prompt(req);
    tracing::info!(
        model = client.model(),
        item_name = %req.item_name,
        prompt_chars = prompt.chars().count(),
        "requesting price forecast"
    );
    client.request_forecast(prompt::SYSTEM_PROMPT, &prompt).await
}
