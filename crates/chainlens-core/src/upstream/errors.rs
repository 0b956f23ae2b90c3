use thiserror::Error;

/// Errors that can occur when talking to a chain's RPC endpoint or the analytics API.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum UpstreamError {
    /// Request exceeded the configured timeout duration.
    #[error("Request timeout")]
    Timeout,

    /// Failed to establish a connection to the upstream endpoint.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The configured endpoint is not a usable URL.
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    /// HTTP-level error occurred (non-2xx status code).
    ///
    /// First field is the HTTP status code, second is the (truncated) body.
    #[error("HTTP error {0}: {1}")]
    HttpError(u16, String),

    /// JSON-RPC error object returned by the endpoint.
    ///
    /// First field is the RPC error code, second is the error message.
    #[error("RPC error {0}: {1}")]
    RpcError(i32, String),

    /// Network-level error while reading a response body.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response could not be parsed or did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The HTTP client's concurrency limit is closed.
    #[error("Concurrency limit reached: {0}")]
    ConcurrencyLimit(String),

    /// The chain's method table has no entry for the requested operation.
    #[error("Operation {0} not supported by this chain")]
    UnsupportedOperation(&'static str),
}

impl UpstreamError {
    /// Returns `true` if the endpoint could not be reached at all.
    ///
    /// Covers invalid endpoint URLs, refused or failed connections and timeouts. Callers
    /// surface these uniformly as connection failures regardless of the protocol adapter.
    #[must_use]
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, Self::Timeout | Self::ConnectionFailed(_) | Self::InvalidUrl(_))
    }

    /// Returns `true` if this error is transient and the request may be retried.
    ///
    /// Transient errors include:
    /// - Timeouts and connection failures
    /// - Network errors while reading the body
    /// - HTTP 5xx server errors and HTTP 429 rate limiting
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Network(_) | Self::ConnectionFailed(_) => true,
            Self::HttpError(status, _) => (500..=599).contains(status) || *status == 429,
            _ => false,
        }
    }

    /// Short label for metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::ConnectionFailed(_) => "connection_failed",
            Self::InvalidUrl(_) => "invalid_url",
            Self::HttpError(..) => "http_error",
            Self::RpcError(..) => "rpc_error",
            Self::Network(_) => "network",
            Self::InvalidResponse(_) => "invalid_response",
            Self::ConcurrencyLimit(_) => "concurrency_limit",
            Self::UnsupportedOperation(_) => "unsupported_operation",
        }
    }
}
