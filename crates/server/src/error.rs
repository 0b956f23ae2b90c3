use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chainlens_core::dispatch::DispatchError;
use serde_json::json;
use std::time::Duration;

/// Error returned by the HTTP handlers.
///
/// Rendered as `{"error": {"code": "<kind>", "message": "<text>"}}`.
#[derive(Debug)]
pub enum ApiError {
    Dispatch(DispatchError),
    /// The search ran and no chain knows the hash.
    TransactionNotFound(String),
    /// The request outlived the server-wide deadline.
    Timeout(Duration),
    /// A middleware layer failed for a reason other than the deadline.
    Layer(String),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Dispatch(e) => match e {
                DispatchError::Validation(_) |
                DispatchError::UnsupportedChain(_) |
                DispatchError::TxCountUnsupported(_) => StatusCode::BAD_REQUEST,
                DispatchError::BlockNotFound(_) => StatusCode::NOT_FOUND,
                DispatchError::ClientConnection { .. } |
                DispatchError::Upstream { .. } |
                DispatchError::Analytics(_) |
                DispatchError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::TransactionNotFound(_) => StatusCode::NOT_FOUND,
            Self::Timeout(_) | Self::Layer(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Dispatch(e) => e.code(),
            Self::TransactionNotFound(_) => "transaction_not_found",
            Self::Timeout(_) => "timeout",
            Self::Layer(_) => "internal_error",
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Dispatch(e) => e.to_string(),
            Self::TransactionNotFound(hash) => format!("Transaction {hash} not found on any chain"),
            Self::Timeout(limit) => format!("Request did not complete within {}s", limit.as_secs_f64()),
            Self::Layer(reason) => format!("Internal error: {reason}"),
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        Self::Dispatch(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.message(),
            }
        });
        (self.status(), Json(body)).into_response()
    }
}
