use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    MarketData,
    LanguageModel,
}

/// Typed failure of a single upstream call. Travels inside `anyhow::Error`;
/// callers that need to branch on it use `downcast_ref::<UpstreamError>()`.
#[derive(Debug, Clone)]
pub struct UpstreamError {
    pub upstream: Upstream,
    pub stage: &'static str,
    pub detail: String,
    /// Message supplied by the upstream itself when it rejected the request.
    pub upstream_msg: Option<String>,
}

impl UpstreamError {
    pub fn new(upstream: Upstream, stage: &'static str, detail: impl Into<String>) -> Self {
        Self {
            upstream,
            stage,
            detail: detail.into(),
            upstream_msg: None,
        }
    }

    pub fn rejected(upstream: Upstream, code: i64, msg: Option<String>) -> Self {
        let msg = msg.filter(|m| !m.trim().is_empty());
        Self {
            upstream,
            stage: "rejected",
            detail: format!("code={code} msg={}", msg.as_deref().unwrap_or("")),
            upstream_msg: msg,
        }
    }

    pub fn is_rejection(&self) -> bool {
        self.stage == "rejected"
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "upstream error (upstream={:?}, stage={}): {}",
            self.upstream, self.stage, self.detail
        )
    }
}

impl std::error::Error for UpstreamError {}
