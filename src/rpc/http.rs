use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context as _, Result};
use futures::future::BoxFuture;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::{parse_response, RpcCall, RpcError, RpcResult, Transport};
use crate::config::ServerConfig;

/// JSON-RPC over HTTP POST
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    credentials: Option<(String, Option<String>)>,
    next_id: AtomicU64,
}

impl HttpTransport {
    /// Create a transport talking to `http://host:port/jsonrpc`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(server: &ServerConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: format!("http://{}:{}/jsonrpc", server.host, server.port),
            credentials: server
                .username
                .clone()
                .map(|username| (username, server.password.clone())),
            next_id: AtomicU64::new(1),
        })
    }
}

impl Transport for HttpTransport {
    fn call(&self, call: RpcCall) -> BoxFuture<'static, RpcResult> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut request = self.client.post(&self.endpoint).json(&call.to_request(id));
        if let Some((username, password)) = &self.credentials {
            request = request.basic_auth(username, password.as_ref());
        }
        if let Some(timeout) = call.timeout {
            request = request.timeout(timeout);
        }
        let method = call.method;

        Box::pin(async move {
            debug!(%method, id, "Sending request");
            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(RpcError::Status(response.status().as_u16()));
            }
            let body: Value = response.json().await?;
            parse_response(body)
        })
    }
}
