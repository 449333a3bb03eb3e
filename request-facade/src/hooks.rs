use crate::error::Error;
use async_trait::async_trait;

/// Surfaces a failed request to the user.
pub trait Notifier: Send + Sync {
    fn notify_error(&self, message: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_error(&self, message: &str) {
        log::error!("{}", message);
    }
}

/// Strategy run when the server reports that the session needs
/// re-authentication (business code 401).
#[async_trait]
pub trait Reauthenticate: Send + Sync {
    async fn recover(&self) -> Result<(), Error>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRecovery;

#[async_trait]
impl Reauthenticate for NoopRecovery {
    async fn recover(&self) -> Result<(), Error> {
        log::debug!("Session needs re-authentication, no recovery configured");
        Ok(())
    }
}
