//! Lifecycle wrapper used by hosts: start once, stop when the app goes away.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::ListenerConfig;
use crate::endpoint::Endpoint;
use crate::error::ListenerError;
use crate::listener::{ShutdownHandle, SyncListener};
use crate::reload::ReloadTrigger;

/// A listener running on its own task.
#[derive(Debug)]
pub struct SyncService {
    endpoint: Endpoint,
    shutdown: ShutdownHandle,
    task: JoinHandle<Result<(), ListenerError>>,
}

impl SyncService {
    /// Binds the endpoint and starts accepting on the current runtime.
    ///
    /// Binding happens before this returns, so a client may connect as soon
    /// as it succeeds.
    pub fn start(
        config: &ListenerConfig,
        reload: Arc<dyn ReloadTrigger>,
    ) -> Result<Self, ListenerError> {
        let listener = SyncListener::bind(config, reload)?;
        let endpoint = listener.endpoint().clone();
        let shutdown = listener.shutdown_handle();
        let task = tokio::spawn(listener.serve());

        Ok(Self {
            endpoint,
            shutdown,
            task,
        })
    }

    /// Returns the endpoint being served.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns a handle that stops the service from elsewhere.
    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Stops accepting new connections.
    pub fn stop(&self) {
        self.shutdown.stop();
    }

    /// Waits for the listener task to finish.
    pub async fn wait(self) -> Result<(), ListenerError> {
        self.task.await?
    }
}
