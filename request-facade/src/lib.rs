pub mod abort;
mod builder;
pub mod cache;
pub mod config;
mod envelope;
mod error;
pub mod hooks;
pub mod loading;
mod request_options;
mod r#static;
pub mod transport;


use abort::{AbortHandle, AbortRegistry, AbortSignal, SharedAbortRegistry};
pub use builder::RequestClientBuilder;
use cache::{CacheStats, SettledResult, SharedRequestCache};
use config::Config;
pub use envelope::{Outcome, ResponseData, CODE_SUCCESS, CODE_UNAUTHORIZED};
pub use error::Error;
pub use error::ErrorKind;
use getset::Getters;
use hooks::{Notifier, Reauthenticate};
use loading::Loading;
pub use r#static::{status_message, RESPONSE_STATUS_MESSAGES, UNKNOWN_ERROR_MESSAGE};
pub use request_options::method::Method;
pub use request_options::RequestConfig;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use transport::surf_transport::SurfTransport;
use transport::{SharedTransport, TransportRequest, TransportResponse};

/// HTTP facade adding de-duplication, cancellation, loading tracking and
/// status normalisation on top of a [`transport::Transport`].
#[derive(Clone, Getters)]
pub struct RequestClient {
    transport: SharedTransport,
    #[get = "pub"]
    aborts: SharedAbortRegistry,
    #[get = "pub"]
    cache: SharedRequestCache,
    #[get = "pub"]
    loading: Arc<Loading>,
    notifier: Arc<dyn Notifier>,
    recovery: Arc<dyn Reauthenticate>,
}

impl Default for RequestClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestClient {
    /// Create a new RequestClient backed by surf with default collaborators
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> RequestClientBuilder {
        RequestClientBuilder::default()
    }

    /// Create a surf-backed RequestClient from loaded configuration
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let mut transport = SurfTransport::new();
        if let Some(base_url) = &config.base_url {
            transport = transport.with_base_url(base_url)?;
        }
        for (name, value) in &config.headers {
            transport = transport.with_header(name, value);
        }

        Ok(Self::builder()
            .transport(transport)
            .cache(Arc::new(cache::RequestCache::new(config.cache.clone())))
            .build())
    }

    pub async fn get<T: DeserializeOwned>(&self, config: RequestConfig) -> Result<Outcome<T>, Error> {
        self.request(config.with_method(Method::Get)).await
    }

    pub async fn post<T: DeserializeOwned>(&self, config: RequestConfig) -> Result<Outcome<T>, Error> {
        self.request(config.with_method(Method::Post)).await
    }

    pub async fn put<T: DeserializeOwned>(&self, config: RequestConfig) -> Result<Outcome<T>, Error> {
        self.request(config.with_method(Method::Put)).await
    }

    pub async fn patch<T: DeserializeOwned>(&self, config: RequestConfig) -> Result<Outcome<T>, Error> {
        self.request(config.with_method(Method::Patch)).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        config: RequestConfig,
    ) -> Result<Outcome<T>, Error> {
        self.request(config.with_method(Method::Delete)).await
    }

    /// Issue a request and decode the envelope's `data` into `T`.
    ///
    /// Every failure except a cancellation is reported to the notifier before
    /// being returned.
    pub async fn request<T: DeserializeOwned>(
        &self,
        config: RequestConfig,
    ) -> Result<Outcome<T>, Error> {
        let result = self.execute(config).await.and_then(|outcome| match outcome {
            Outcome::Success(data) => Ok(Outcome::Success(T::deserialize(data.as_ref())?)),
            Outcome::Recovered => Ok(Outcome::Recovered),
        });

        result.map_err(|err| self.handle_error(err))
    }

    /// Pairs a fresh abort key with a handle that cancels every request
    /// issued under it.
    pub fn create_abort(&self) -> (String, AbortHandle) {
        self.aborts.create_abort()
    }

    /// Cancel every outstanding request registered under `key`
    pub fn abort(&self, key: &str) -> bool {
        self.aborts.force_cancel(key)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn evict_expired_cache(&self) {
        self.cache.evict_expired();
    }

    async fn execute(&self, config: RequestConfig) -> SettledResult {
        let guard = RequestGuard::open(self, &config);
        let signal = guard.signal();

        let request = TransportRequest {
            method: *config.method(),
            url: config.url().clone(),
            headers: config.headers().clone(),
            query: config.params().clone(),
            body: config.body().clone(),
            signal: signal.clone(),
        };
        let transport = Arc::clone(&self.transport);
        let recovery = Arc::clone(&self.recovery);
        let (pending, owned) = self
            .cache
            .share_or_dispatch(&config, || dispatch(transport, recovery, request));

        // A shared pending result may belong to another caller, so our own
        // signal is watched here as well as by the transport.
        let result = match signal {
            Some(signal) => tokio::select! {
                biased;
                _ = signal.aborted() => {
                    // Nobody may poll our cancelled dispatch again
                    if owned {
                        self.cache.discard(&config, &pending);
                    }
                    Err(Error::Cancelled)
                }
                result = pending.clone() => result,
            },
            None => pending.await,
        };

        drop(guard);
        result
    }

    fn handle_error(&self, err: Error) -> Error {
        if err.is_cancelled() {
            log::debug!("Request cancelled, not notifying");
            return err;
        }

        log::warn!("Request failed: {}", err);
        self.notifier.notify_error(&err.user_message());
        err
    }
}

async fn dispatch(
    transport: SharedTransport,
    recovery: Arc<dyn Reauthenticate>,
    request: TransportRequest,
) -> SettledResult {
    let response = transport.dispatch(request).await?;
    validate(response, recovery.as_ref()).await
}

/// Map a transport response onto the envelope convention.
async fn validate(response: TransportResponse, recovery: &dyn Reauthenticate) -> SettledResult {
    if response.status != 200 {
        return Err(Error::Status {
            status: response.status,
            status_text: response.status_text,
        });
    }

    let envelope = ResponseData::from_body(&response.body)?;
    match envelope.code {
        CODE_UNAUTHORIZED => {
            recovery.recover().await?;
            Ok(Outcome::Recovered)
        }
        CODE_SUCCESS => Ok(Outcome::Success(Arc::new(envelope.data))),
        code => Err(Error::Business {
            code,
            message: envelope.message,
        }),
    }
}

/// Pre-dispatch bookkeeping for one request, undone on drop so every exit
/// path closes loading and releases the abort key exactly once.
struct RequestGuard<'a> {
    loading: Option<(&'a Loading, String)>,
    abort: Option<(&'a AbortRegistry, String, AbortSignal)>,
}

impl<'a> RequestGuard<'a> {
    fn open(client: &'a RequestClient, config: &RequestConfig) -> Self {
        let loading = config.loading().then(|| {
            client.loading.open(config.url());
            (client.loading.as_ref(), config.url().clone())
        });
        let abort = config.abort_key().as_ref().map(|key| {
            let signal = client.aborts.register(key);
            (client.aborts.as_ref(), key.clone(), signal)
        });

        Self { loading, abort }
    }

    fn signal(&self) -> Option<AbortSignal> {
        self.abort.as_ref().map(|(_, _, signal)| signal.clone())
    }
}

impl Drop for RequestGuard<'_> {
    fn drop(&mut self) {
        if let Some((loading, url)) = self.loading.take() {
            loading.close(&url);
        }
        if let Some((aborts, key, signal)) = self.abort.take() {
            aborts.release_holder(&key, &signal);
        }
    }
}
