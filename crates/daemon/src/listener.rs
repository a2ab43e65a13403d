//! The accept loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use logging::trace_listener;
use tokio::net::UnixListener;
use tokio::sync::broadcast;
use tracing::{Instrument, error, info_span, warn};

use crate::config::ListenerConfig;
use crate::endpoint::Endpoint;
use crate::error::ListenerError;
use crate::reload::ReloadTrigger;
use crate::session::{Session, SessionContext};

/// Stops a running [`SyncListener`].
///
/// Cloneable; every clone controls the same listener.
#[derive(Clone, Debug)]
pub struct ShutdownHandle {
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ShutdownHandle {
    /// Asks the listener to stop accepting.
    ///
    /// Sessions already running finish on their own. Calling this more than
    /// once has no further effect.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            let _ = self.shutdown_tx.send(());
        }
    }

    /// Reports whether the listener is still accepting.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Accepts connections on an [`Endpoint`] and runs a session per connection.
pub struct SyncListener {
    listener: UnixListener,
    endpoint: Endpoint,
    context: SessionContext,
    shutdown: ShutdownHandle,
    shutdown_rx: broadcast::Receiver<()>,
}

impl SyncListener {
    /// Binds the configured endpoint.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(
        config: &ListenerConfig,
        reload: Arc<dyn ReloadTrigger>,
    ) -> Result<Self, ListenerError> {
        let endpoint = config.endpoint().clone();
        let listener = endpoint.bind().map_err(|source| ListenerError::Bind {
            endpoint: endpoint.to_string(),
            source,
        })?;
        // Subscribe now so a stop issued before `serve` starts is not lost.
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        trace_listener!(endpoint = %endpoint, root = %config.sandbox_root(), "bound");
        Ok(Self {
            listener,
            endpoint,
            context: SessionContext::from_config(config, reload),
            shutdown: ShutdownHandle {
                running: Arc::new(AtomicBool::new(true)),
                shutdown_tx,
            },
            shutdown_rx,
        })
    }

    /// Returns the bound endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns a handle that stops this listener.
    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Accepts connections until stopped or until accepting fails.
    ///
    /// Each connection is served on its own task. The listening socket is
    /// closed, and a socket file removed, before this returns.
    pub async fn serve(self) -> Result<(), ListenerError> {
        let Self {
            listener,
            endpoint,
            context,
            shutdown,
            mut shutdown_rx,
        } = self;
        let next_session = AtomicU64::new(1);

        trace_listener!(endpoint = %endpoint, "accepting connections");
        let result = loop {
            if !shutdown.is_running() {
                break Ok(());
            }

            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, _peer)) => {
                        let id = next_session.fetch_add(1, Ordering::Relaxed);
                        let session = Session::new(stream, context.clone());
                        tokio::spawn(
                            async move {
                                // Failures are logged inside the session.
                                let _ = session.run().await;
                            }
                            .instrument(info_span!("session", id)),
                        );
                    }
                    Err(source) => {
                        error!(target: "livesync::listener", %source, "accept failed");
                        break Err(ListenerError::Accept {
                            endpoint: endpoint.to_string(),
                            source,
                        });
                    }
                },
                _ = shutdown_rx.recv() => break Ok(()),
            }
        };

        shutdown.running.store(false, Ordering::SeqCst);
        drop(listener);
        if let Err(error) = endpoint.cleanup() {
            warn!(target: "livesync::listener", %error, "failed to remove socket file");
        }
        trace_listener!(endpoint = %endpoint, "stopped");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reload::LogReloadTrigger;
    use engine::SandboxRoot;
    use test_support::SandboxFixture;

    fn config(fixture: &SandboxFixture) -> ListenerConfig {
        ListenerConfig::builder()
            .endpoint(Endpoint::Path(fixture.files_dir().join("listener.sock")))
            .sandbox_root(SandboxRoot::new(fixture.root()))
            .reload_script(fixture.files_dir().join("internal/livesync.js"))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn stop_before_serve_returns_immediately() {
        let fixture = SandboxFixture::new().unwrap();
        let listener = SyncListener::bind(&config(&fixture), Arc::new(LogReloadTrigger)).unwrap();
        let handle = listener.shutdown_handle();

        handle.stop();
        handle.stop();

        listener.serve().await.unwrap();
        assert!(!handle.is_running());
        assert!(!fixture.files_dir().join("listener.sock").exists());
    }

    #[tokio::test]
    async fn bind_failure_names_endpoint() {
        let fixture = SandboxFixture::new().unwrap();
        let config = config(&fixture)
            .to_builder()
            .endpoint(Endpoint::Path(fixture.files_dir().join("missing/dir/x.sock")))
            .build()
            .unwrap();

        let Err(err) = SyncListener::bind(&config, Arc::new(LogReloadTrigger)) else {
            panic!("binding below a missing directory must fail");
        };
        assert!(matches!(err, ListenerError::Bind { .. }));
        assert!(err.to_string().contains("x.sock"));
    }
}
