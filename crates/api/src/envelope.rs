use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use skinscope_core::error::UpstreamError;
use std::any::Any;

/// Caller-facing messages for one operation.
#[derive(Debug, Clone, Copy)]
pub struct Messages {
    /// Validation failure.
    pub invalid: &'static str,
    /// Upstream refused the request without a message of its own.
    pub rejected: &'static str,
    /// Any other upstream or internal failure.
    pub unavailable: &'static str,
}

pub const SEARCH: Messages = Messages {
    invalid: "a search query is required",
    rejected: "search failed",
    unavailable: "search service is temporarily unavailable",
};

pub const PRICE_DATA: Messages = Messages {
    invalid: "a numeric item id is required",
    rejected: "failed to fetch price data",
    unavailable: "price data service is temporarily unavailable",
};

pub const SALES_DATA: Messages = Messages {
    invalid: "a numeric item id and a known platform are required",
    rejected: "failed to fetch sales data",
    unavailable: "sales data service is temporarily unavailable",
};

pub const HOT_ITEMS: Messages = Messages {
    invalid: "invalid hot item request",
    rejected: "failed to fetch hot items",
    unavailable: "hot item service is temporarily unavailable",
};

pub const PREDICT: Messages = Messages {
    invalid: "missing required forecast data",
    rejected: "price forecast failed",
    unavailable: "price forecast service is temporarily unavailable",
};

pub const STYLE_PRICE: Messages = Messages {
    invalid: "itemId and style are required",
    rejected: "failed to fetch style price",
    unavailable: "style price service is temporarily unavailable",
};

pub const NOT_FOUND: &str = "route not found";
pub const INTERNAL: &str = "internal server error";

/// `{"success": true, ...body}`.
#[derive(Debug, Serialize)]
pub struct Success<T> {
    success: bool,
    #[serde(flatten)]
    body: T,
}

#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}

pub fn success<T: Serialize>(body: T) -> Json<Success<T>> {
    Json(Success {
        success: true,
        body,
    })
}

/// Renders as `{"success": false, "error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn validation(messages: &Messages) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: messages.invalid.to_string(),
        }
    }

    /// Maps a failed operation. Upstream rejections keep the upstream's own
    /// message; everything else is logged and reported, and the caller gets
    /// the generic text.
    pub fn upstream(err: anyhow::Error, messages: &Messages) -> Self {
        if let Some(diag) = err.downcast_ref::<UpstreamError>() {
            if diag.is_rejection() {
                tracing::warn!(error = %err, "upstream rejected request");
                return Self {
                    status: StatusCode::BAD_REQUEST,
                    message: diag
                        .upstream_msg
                        .clone()
                        .unwrap_or_else(|| messages.rejected.to_string()),
                };
            }
        }

        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %err, "request failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: messages.unavailable.to_string(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: NOT_FOUND.to_string(),
        }
    }

    pub fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: INTERNAL.to_string(),
        }
    }
}

#[derive(Serialize)]
struct Failure<'a> {
    success: bool,
    error: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Failure {
            success: false,
            error: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

pub async fn not_found() -> ApiError {
    ApiError::not_found()
}

pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    tracing::error!(panic = detail, "handler panicked");
    ApiError::internal().into_response()
}
