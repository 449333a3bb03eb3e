pub mod method;

use getset::Getters;
use method::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Caller-facing description of one logical request.
#[derive(Debug, Clone, PartialEq, Getters, Serialize, Deserialize)]
#[get = "pub"]
pub struct RequestConfig {
    #[serde(default)]
    method: Method,
    url: String,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    body: Option<Value>,
    #[serde(default = "default_loading")]
    loading: bool,
    #[serde(default)]
    abort_key: Option<String>,
    /// Cache retention in milliseconds. `None` or `0` disables caching.
    #[serde(default)]
    cache: Option<u64>,
}

fn default_loading() -> bool {
    true
}

impl RequestConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            method: Method::default(),
            url: url.into(),
            headers: BTreeMap::new(),
            params: None,
            body: None,
            loading: default_loading(),
            abort_key: None,
            cache: None,
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_loading(mut self, loading: bool) -> Self {
        self.loading = loading;
        self
    }

    pub fn with_abort_key(mut self, key: impl Into<String>) -> Self {
        self.abort_key = Some(key.into());
        self
    }

    pub fn with_cache(mut self, retention_ms: u64) -> Self {
        self.cache = Some(retention_ms);
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    /// Retention window when caching is enabled for this call.
    pub fn cache_retention(&self) -> Option<chrono::Duration> {
        match self.cache {
            Some(ms) if ms > 0 => Some(chrono::Duration::milliseconds(
                i64::try_from(ms).unwrap_or(i64::MAX),
            )),
            _ => None,
        }
    }
}
