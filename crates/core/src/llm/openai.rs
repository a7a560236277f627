use crate::config::Settings;
use crate::error::{Upstream, UpstreamError};
use crate::llm::ForecastClient;
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    /// A missing API key is not an error here; forecasts fail when attempted.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.openai_timeout)
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key: settings.openai_api_key.clone(),
            base_url: settings.openai_base_url.clone(),
            model: settings.openai_model.clone(),
        })
    }

    fn headers(&self) -> anyhow::Result<HeaderMap> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            UpstreamError::new(Upstream::LanguageModel, "config", "OPENAI_API_KEY is not set")
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|e| {
                UpstreamError::new(
                    Upstream::LanguageModel,
                    "config",
                    format!("OPENAI_API_KEY is not a valid header value: {e}"),
                )
            })?,
        );
        Ok(headers)
    }

    async fn create_completion(&self, req: &ChatCompletionRequest<'_>) -> anyhow::Result<ChatCompletionResponse> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(self.headers()?)
            .json(req)
            .send()
            .await
            .map_err(|e| UpstreamError::new(Upstream::LanguageModel, "transport", e.to_string()))?;

        let status = res.status();
        let text = res.text().await.map_err(|e| {
            UpstreamError::new(
                Upstream::LanguageModel,
                "transport",
                format!("failed to read response body: {e}"),
            )
        })?;
        if !status.is_success() {
            return Err(UpstreamError::new(
                Upstream::LanguageModel,
                "http",
                format!("status={status} body={text}"),
            )
            .into());
        }

        serde_json::from_str::<ChatCompletionResponse>(&text).map_err(|e| {
            UpstreamError::new(
                Upstream::LanguageModel,
                "decode",
                format!("failed to decode chat completion ({e}): {text}"),
            )
            .into()
        })
    }

    fn response_text(res: ChatCompletionResponse) -> Option<String> {
        res.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
    }
}

#[async_trait::async_trait]
impl ForecastClient for OpenAiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn request_forecast(&self, system: &str, prompt: &str) -> anyhow::Result<String> {
        let req = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: system,
                },
                Message {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let res = self.create_completion(&req).await?;
        Self::response_text(res).ok_or_else(|| {
            UpstreamError::new(
                Upstream::LanguageModel,
                "empty",
                "completion had no message content",
            )
            .into()
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
