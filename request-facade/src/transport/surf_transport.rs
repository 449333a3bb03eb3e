use super::{query_pairs, Transport, TransportRequest, TransportResponse};
use crate::error::Error;
use crate::r#static::JSON_CONTENT_TYPE;
use ::utils::surf_logging::SurfLogging;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use surf::http::headers::{HeaderName, HeaderValue};
use surf::Client;
use url::Url;

/// [`Transport`] backed by a surf client.
#[derive(Clone)]
pub struct SurfTransport {
    http: Client,
    base_url: Option<Url>,
    headers: BTreeMap<String, String>,
}

impl Default for SurfTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfTransport {
    pub fn new() -> Self {
        Self {
            http: Client::new().with(SurfLogging),
            base_url: None,
            headers: BTreeMap::from([("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string())]),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, Error> {
        self.base_url = Some(Url::parse(base_url)?);
        Ok(self)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Resolves `url` against the base URL and appends the query params.
    fn resolve_url(&self, url: &str, query: Option<&Value>) -> Result<Url, Error> {
        let mut resolved = match (Url::parse(url), &self.base_url) {
            (Ok(absolute), _) => absolute,
            (Err(url::ParseError::RelativeUrlWithoutBase), Some(base)) => base.join(url)?,
            (Err(err), _) => return Err(err.into()),
        };

        if let Some(query) = query {
            let pairs = query_pairs(query);
            if !pairs.is_empty() {
                resolved.query_pairs_mut().extend_pairs(pairs);
            }
        }

        Ok(resolved)
    }

    async fn exchange(&self, request: &TransportRequest) -> Result<TransportResponse, Error> {
        let url = self.resolve_url(&request.url, request.query.as_ref())?;
        let mut req = surf::Request::new(request.method.into(), url);

        for (name, value) in self.headers.iter().chain(request.headers.iter()) {
            let (name, value) = header(name, value)?;
            req.insert_header(name, value);
        }
        if let Some(body) = &request.body {
            req.body_json(body)?;
            // body_json resets the content type
            if let Some(content_type) = request
                .headers
                .get("Content-Type")
                .or_else(|| self.headers.get("Content-Type"))
            {
                let (name, value) = header("Content-Type", content_type)?;
                req.insert_header(name, value);
            }
        }

        let mut res = self.http.send(req).await?;
        let status = res.status();

        let headers = res
            .iter()
            .map(|(name, values)| {
                let joined = values
                    .iter()
                    .map(|value| value.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                (name.as_str().to_string(), joined)
            })
            .collect();

        let bytes = res.body_bytes().await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                log::debug!("Response body from {} is not JSON: {}", request.url, err);
                Value::Null
            })
        };

        Ok(TransportResponse {
            status: u16::from(status),
            status_text: status.canonical_reason().to_string(),
            headers,
            body,
        })
    }
}

/// http-types panics on non-ASCII header text, so both halves are checked first.
fn header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), Error> {
    let name = HeaderName::from_str(name)
        .map_err(|err| Error::InvalidHeader(format!("{:?}: {}", name, err)))?;
    let value = HeaderValue::from_str(value)
        .map_err(|err| Error::InvalidHeader(format!("{}: {}", name, err)))?;
    Ok((name, value))
}

#[async_trait]
impl Transport for SurfTransport {
    async fn dispatch(&self, request: TransportRequest) -> Result<TransportResponse, Error> {
        match &request.signal {
            Some(signal) => {
                if signal.is_aborted() {
                    return Err(Error::Cancelled);
                }
                tokio::select! {
                    biased;
                    _ = signal.aborted() => {
                        log::debug!("{} {} aborted before settling", request.method, request.url);
                        Err(Error::Cancelled)
                    }
                    result = self.exchange(&request) => result,
                }
            }
            None => self.exchange(&request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abort::AbortSignal;
    use crate::request_options::method::Method;
    use serde_json::json;

    #[test]
    fn test_resolve_relative_url() {
        let transport = SurfTransport::new()
            .with_base_url("https://api.example.com/v1/")
            .unwrap();
        let url = transport
            .resolve_url("items", Some(&json!({"page": 1})))
            .unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/items?page=1");
    }

    #[test]
    fn test_absolute_url_ignores_base() {
        let transport = SurfTransport::new()
            .with_base_url("https://api.example.com/")
            .unwrap();
        let url = transport
            .resolve_url("https://other.example.com/items", None)
            .unwrap();
        assert_eq!(url.as_str(), "https://other.example.com/items");
    }

    #[test]
    fn test_relative_url_without_base_fails() {
        let transport = SurfTransport::new();
        assert!(matches!(
            transport.resolve_url("/items", None),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_header_rejects_non_ascii() {
        assert!(header("X-Request-Id", "42").is_ok());
        assert!(matches!(
            header("X-Naïve", "1"),
            Err(Error::InvalidHeader(_))
        ));
        assert!(matches!(
            header("X-Label", "café"),
            Err(Error::InvalidHeader(_))
        ));
    }

    #[tokio::test]
    async fn test_non_ascii_header_fails_before_sending() {
        let request = TransportRequest {
            method: Method::Get,
            url: "http://127.0.0.1:9/items".to_string(),
            headers: BTreeMap::from([("X-Naïve".to_string(), "1".to_string())]),
            query: None,
            body: None,
            signal: None,
        };

        let result = SurfTransport::new().dispatch(request).await;
        assert!(matches!(result, Err(Error::InvalidHeader(_))));
    }

    #[tokio::test]
    async fn test_aborted_signal_short_circuits() {
        let signal = AbortSignal::new();
        signal.abort();
        let request = TransportRequest {
            method: Method::Get,
            url: "http://127.0.0.1:9/items".to_string(),
            headers: BTreeMap::new(),
            query: None,
            body: None,
            signal: Some(signal),
        };

        let result = SurfTransport::new().dispatch(request).await;
        assert_eq!(result, Err(Error::Cancelled));
    }
}
