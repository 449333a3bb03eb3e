use crate::abort::{AbortRegistry, SharedAbortRegistry};
use crate::cache::{RequestCache, SharedRequestCache};
use crate::hooks::{LogNotifier, NoopRecovery, Notifier, Reauthenticate};
use crate::loading::{Loading, LoadingIndicator, LogIndicator};
use crate::transport::surf_transport::SurfTransport;
use crate::transport::{SharedTransport, Transport};
use crate::RequestClient;
use std::sync::Arc;

/// Wires the collaborators of a [`RequestClient`]. Anything left unset gets
/// its default: a surf transport, fresh registries, log-only indicator and
/// notifier, and a recovery hook that does nothing.
#[derive(Default)]
pub struct RequestClientBuilder {
    transport: Option<SharedTransport>,
    aborts: Option<SharedAbortRegistry>,
    cache: Option<SharedRequestCache>,
    indicator: Option<Arc<dyn LoadingIndicator>>,
    notifier: Option<Arc<dyn Notifier>>,
    recovery: Option<Arc<dyn Reauthenticate>>,
}

impl RequestClientBuilder {
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn shared_transport(mut self, transport: SharedTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Shares an abort registry with other clients.
    pub fn abort_registry(mut self, aborts: SharedAbortRegistry) -> Self {
        self.aborts = Some(aborts);
        self
    }

    /// Shares a request cache with other clients.
    pub fn cache(mut self, cache: SharedRequestCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn loading_indicator(mut self, indicator: Arc<dyn LoadingIndicator>) -> Self {
        self.indicator = Some(indicator);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn recovery(mut self, recovery: Arc<dyn Reauthenticate>) -> Self {
        self.recovery = Some(recovery);
        self
    }

    pub fn build(self) -> RequestClient {
        RequestClient {
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(SurfTransport::new())),
            aborts: self
                .aborts
                .unwrap_or_else(|| Arc::new(AbortRegistry::new())),
            cache: self
                .cache
                .unwrap_or_else(|| Arc::new(RequestCache::default())),
            loading: Arc::new(Loading::new(
                self.indicator.unwrap_or_else(|| Arc::new(LogIndicator)),
            )),
            notifier: self.notifier.unwrap_or_else(|| Arc::new(LogNotifier)),
            recovery: self.recovery.unwrap_or_else(|| Arc::new(NoopRecovery)),
        }
    }
}
