//! JSON-RPC request types and the transport seam.

pub mod http;

use std::{fmt, time::Duration};

use futures::future::BoxFuture;
use serde_json::{json, Map, Value};
use thiserror::Error;

pub use http::HttpTransport;

/// Remote procedures used by the trackers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    PlayerGetActivePlayers,
    PlayerGetProperties,
    PlayerPlayPause,
    PlayerStop,
    PlayerGoTo,
    PlayerOpen,
    PlaylistGetPlaylists,
    PlaylistGetItems,
    PlaylistAdd,
    PlaylistClear,
    ApplicationGetProperties,
    ApplicationSetVolume,
    ApplicationSetMute,
}
impl Method {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PlayerGetActivePlayers => "Player.GetActivePlayers",
            Self::PlayerGetProperties => "Player.GetProperties",
            Self::PlayerPlayPause => "Player.PlayPause",
            Self::PlayerStop => "Player.Stop",
            Self::PlayerGoTo => "Player.GoTo",
            Self::PlayerOpen => "Player.Open",
            Self::PlaylistGetPlaylists => "Playlist.GetPlaylists",
            Self::PlaylistGetItems => "Playlist.GetItems",
            Self::PlaylistAdd => "Playlist.Add",
            Self::PlaylistClear => "Playlist.Clear",
            Self::ApplicationGetProperties => "Application.GetProperties",
            Self::ApplicationSetVolume => "Application.SetVolume",
            Self::ApplicationSetMute => "Application.SetMute",
        }
    }
}
impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single remote call, not yet sent
#[derive(Debug, Clone, PartialEq)]
pub struct RpcCall {
    pub method: Method,
    pub params: Option<Value>,
    pub timeout: Option<Duration>,
}
impl RpcCall {
    #[must_use]
    pub const fn new(method: Method) -> Self {
        Self {
            method,
            params: None,
            timeout: None,
        }
    }
    #[must_use]
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
    /// Read a parameter back from a queued call
    #[cfg(test)]
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.as_ref()?.get(key)
    }
    /// Build the JSON-RPC 2.0 envelope for this call.
    #[must_use]
    pub fn to_request(&self, id: u64) -> Value {
        let mut request = Map::new();
        request.insert("jsonrpc".to_owned(), json!("2.0"));
        request.insert("method".to_owned(), json!(self.method.as_str()));
        if let Some(params) = &self.params {
            request.insert("params".to_owned(), params.clone());
        }
        request.insert("id".to_owned(), json!(id));
        Value::Object(request)
    }
}

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Request timed out")]
    Timeout,
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Server answered with HTTP status {0}")]
    Status(u16),
    #[error("Server returned error {code}: {message}")]
    Server { code: i64, message: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
impl From<reqwest::Error> for RpcError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::Http(e.to_string())
        }
    }
}

pub type RpcResult = Result<Value, RpcError>;

/// Unwrap a JSON-RPC response body into its `result` member.
///
/// A missing `result` is returned as [`Value::Null`].
///
/// # Errors
///
/// Returns [`RpcError::Server`] if the body carries a non-null `error` object,
/// and [`RpcError::InvalidResponse`] if the body is not a JSON object.
pub fn parse_response(mut body: Value) -> RpcResult {
    let Some(body) = body.as_object_mut() else {
        return Err(RpcError::InvalidResponse(format!(
            "expected a JSON object, got {body}"
        )));
    };
    match body.remove("error") {
        None | Some(Value::Null) => {}
        Some(error) => {
            return Err(RpcError::Server {
                code: error.get("code").and_then(Value::as_i64).unwrap_or(0),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_owned(),
            })
        }
    }
    Ok(body.remove("result").unwrap_or(Value::Null))
}

/// Something able to carry an [`RpcCall`] to the backend.
pub trait Transport: Send + Sync + 'static {
    fn call(&self, call: RpcCall) -> BoxFuture<'static, RpcResult>;
}
