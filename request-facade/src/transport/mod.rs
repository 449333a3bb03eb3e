pub mod surf_transport;

use crate::abort::AbortSignal;
use crate::error::Error;
use crate::request_options::method::Method;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// What the facade hands to the transport for a single dispatch.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub query: Option<Value>,
    pub body: Option<Value>,
    pub signal: Option<AbortSignal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

impl TransportResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            status_text: String::new(),
            headers: BTreeMap::new(),
            body,
        }
    }

    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = status_text.into();
        self
    }
}

/// The HTTP client underneath the facade.
///
/// Implementations must honour an attached [`AbortSignal`] and fail with
/// [`Error::Cancelled`] once it fires.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn dispatch(&self, request: TransportRequest) -> Result<TransportResponse, Error>;
}

pub type SharedTransport = Arc<dyn Transport>;

/// Flattens a JSON object into query pairs. Arrays repeat their key, nulls
/// are skipped and nested objects are sent as JSON text.
pub fn query_pairs(params: &Value) -> Vec<(String, String)> {
    let mut pairs = vec![];
    let Value::Object(map) = params else {
        return pairs;
    };

    for (key, value) in map {
        match value {
            Value::Array(items) => {
                for item in items {
                    if let Some(text) = query_value(item) {
                        pairs.push((key.clone(), text));
                    }
                }
            }
            other => {
                if let Some(text) = query_value(other) {
                    pairs.push((key.clone(), text));
                }
            }
        }
    }

    pairs
}

fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}
