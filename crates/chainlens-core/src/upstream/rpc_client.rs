use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tracing::trace;

use crate::{
    types::{JsonRpcRequest, JsonRpcResponse},
    upstream::{HttpClient, UpstreamError},
    utils::parse_http_url,
};

/// JSON-RPC 2.0 call layer bound to one endpoint.
///
/// Cheap to construct: it borrows the shared [`HttpClient`] pool through an `Arc`, so each
/// fan-out unit builds its own.
pub struct RpcClient {
    http: Arc<HttpClient>,
    endpoint: Arc<str>,
    timeout: Duration,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Binds a client to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::InvalidUrl`] if the endpoint is not an absolute http(s) URL.
    pub fn connect(
        http: Arc<HttpClient>,
        endpoint: &str,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        parse_http_url(endpoint).map_err(UpstreamError::InvalidUrl)?;

        Ok(Self { http, endpoint: Arc::from(endpoint), timeout, next_id: AtomicU64::new(1) })
    }

    /// Issues `method(params)` and decodes the `result` field.
    ///
    /// A `null` or missing result yields `Ok(None)`: the endpoint answered but has no such
    /// object.
    ///
    /// # Errors
    ///
    /// - Transport failures from [`HttpClient::send_request`]
    /// - [`UpstreamError::RpcError`] if the response carries a JSON-RPC error object
    /// - [`UpstreamError::InvalidResponse`] if the body or result cannot be decoded as `T`
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Option<T>, UpstreamError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(method, Some(params), Value::from(id));
        let body = serde_json::to_vec(&request)
            .map_err(|e| UpstreamError::InvalidResponse(format!("request encoding: {e}")))?;

        trace!(method = method, id = id, "rpc call");
        let raw = self.http.send_request(&self.endpoint, Bytes::from(body), self.timeout).await?;

        let response: JsonRpcResponse = serde_json::from_slice(&raw)
            .map_err(|e| UpstreamError::InvalidResponse(format!("{method}: {e}")))?;

        if let Some(error) = response.error {
            return Err(UpstreamError::RpcError(error.code, error.message));
        }

        match response.result {
            None | Some(Value::Null) => Ok(None),
            Some(result) => serde_json::from_value(result)
                .map(Some)
                .map_err(|e| UpstreamError::InvalidResponse(format!("{method}: {e}"))),
        }
    }
}
