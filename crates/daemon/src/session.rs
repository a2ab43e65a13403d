//! One connection's batch, from first byte to reload.
//!
//! A session decodes operations one at a time and applies each before
//! reading the next. It keeps going while the peer has more bytes ready.
//! The first error ends the batch; nothing after it is applied and the
//! reload is skipped. A clean batch, including an empty one, fires the
//! reload exactly once.

use ::core::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use engine::{AppliedOperation, FileOperationExecutor};
use logging::trace_session;
use protocol::{DecodeError, FrameField, MessageDecoder, has_pending_input};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error};

use crate::config::ListenerConfig;
use crate::error::SessionError;
use crate::reload::ReloadTrigger;

/// Capabilities every session of a listener shares.
#[derive(Clone)]
pub struct SessionContext {
    executor: FileOperationExecutor,
    reload: Arc<dyn ReloadTrigger>,
    reload_script: Arc<PathBuf>,
    max_content_length: u64,
}

impl SessionContext {
    /// Bundles the executor, reload trigger and script path.
    pub fn new(
        executor: FileOperationExecutor,
        reload: Arc<dyn ReloadTrigger>,
        reload_script: impl Into<PathBuf>,
    ) -> Self {
        Self {
            executor,
            reload,
            reload_script: Arc::new(reload_script.into()),
            max_content_length: protocol::DEFAULT_MAX_CONTENT_LENGTH,
        }
    }

    /// Builds the context described by a listener configuration.
    pub fn from_config(config: &ListenerConfig, reload: Arc<dyn ReloadTrigger>) -> Self {
        Self::new(config.executor(), reload, config.reload_script())
            .with_max_content_length(config.max_content_length())
    }

    /// Caps the content length a create may declare.
    #[must_use]
    pub const fn with_max_content_length(mut self, max: u64) -> Self {
        self.max_content_length = max;
        self
    }

    /// Returns the executor.
    #[must_use]
    pub const fn executor(&self) -> &FileOperationExecutor {
        &self.executor
    }

    /// Returns the script handed to the reload trigger.
    #[must_use]
    pub fn reload_script(&self) -> &Path {
        &self.reload_script
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("executor", &self.executor)
            .field("reload_script", &self.reload_script)
            .field("max_content_length", &self.max_content_length)
            .finish_non_exhaustive()
    }
}

/// What a successful session did.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SessionSummary {
    /// Operations applied.
    pub operations: usize,
    /// Deletes applied, including those whose target was already absent.
    pub deletes: usize,
    /// Creates applied.
    pub creates: usize,
    /// Content bytes written by creates.
    pub bytes_written: u64,
    /// Whether the reload trigger was invoked.
    pub reloaded: bool,
}

impl SessionSummary {
    fn record(&mut self, applied: &AppliedOperation) {
        self.operations += 1;
        match applied {
            AppliedOperation::Deleted { .. } => self.deletes += 1,
            AppliedOperation::Created { bytes, .. } => {
                self.creates += 1;
                self.bytes_written += bytes;
            }
        }
    }
}

/// A single connection being served.
pub struct Session<S> {
    stream: S,
    context: SessionContext,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Prepares a session over `stream`.
    pub const fn new(stream: S, context: SessionContext) -> Self {
        Self { stream, context }
    }

    /// Runs the batch to completion.
    ///
    /// The stream is shut down before returning, whatever the outcome.
    /// Errors are logged here as well as returned.
    pub async fn run(self) -> Result<SessionSummary, SessionError> {
        let Self { stream, context } = self;
        let mut decoder = MessageDecoder::new(BufReader::new(stream))
            .with_max_content_length(context.max_content_length);
        let mut summary = SessionSummary::default();

        let outcome = apply_batch(&mut decoder, &context, &mut summary).await;

        if let Err(error) = decoder.get_mut().shutdown().await {
            debug!(target: "livesync::session", %error, "closing connection failed");
        }

        match outcome {
            Ok(()) => {
                trace_session!(
                    operations = summary.operations,
                    deletes = summary.deletes,
                    creates = summary.creates,
                    bytes = summary.bytes_written,
                    "batch applied, reloading"
                );
                context.reload.run_script(&context.reload_script);
                summary.reloaded = true;
                Ok(summary)
            }
            Err(err) => {
                error!(
                    target: "livesync::session",
                    kind = %err.kind(),
                    applied = summary.operations,
                    "{err}"
                );
                Err(err)
            }
        }
    }
}

impl<S> fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

async fn apply_batch<R>(
    decoder: &mut MessageDecoder<BufReader<R>>,
    context: &SessionContext,
    summary: &mut SessionSummary,
) -> Result<(), SessionError>
where
    R: AsyncRead + Unpin,
{
    loop {
        let Some(operation) = decoder.next_operation().await? else {
            return Ok(());
        };

        let executor = context.executor.clone();
        let applied = tokio::task::spawn_blocking(move || executor.apply(&operation)).await??;
        summary.record(&applied);

        let more = has_pending_input(decoder.get_mut())
            .await
            .map_err(|source| DecodeError::Read {
                field: FrameField::Operation,
                source,
            })?;
        if !more {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::SandboxRoot;
    use logging::{HostLayer, MemorySink};
    use protocol::{ErrorKind, PROTOCOL_USAGE};
    use std::sync::Mutex;
    use test_support::{SandboxFixture, batch, create_message, delete_message};
    use tokio::io::AsyncReadExt;
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;

    use crate::reload::FnReloadTrigger;

    #[derive(Clone, Default)]
    struct Reloads(Arc<Mutex<Vec<PathBuf>>>);

    impl Reloads {
        fn trigger(&self) -> Arc<dyn ReloadTrigger> {
            let seen = Arc::clone(&self.0);
            Arc::new(FnReloadTrigger::new(move |script: &Path| {
                seen.lock().unwrap().push(script.to_path_buf());
            }))
        }

        fn count(&self) -> usize {
            self.0.lock().unwrap().len()
        }
    }

    fn context(fixture: &SandboxFixture, reloads: &Reloads) -> SessionContext {
        SessionContext::new(
            FileOperationExecutor::new(SandboxRoot::new(fixture.root())),
            reloads.trigger(),
            fixture.files_dir().join("internal/livesync.js"),
        )
    }

    async fn run_with(wire: Vec<u8>, context: SessionContext) -> Result<SessionSummary, SessionError> {
        let (mut client, server) = tokio::io::duplex(wire.len().max(1));
        client.write_all(&wire).await.unwrap();
        client.shutdown().await.unwrap();
        Session::new(server, context).run().await
    }

    #[tokio::test]
    async fn applies_batch_and_reloads_once() {
        let fixture = SandboxFixture::new().unwrap();
        fixture.write("old.txt", b"old").unwrap();
        let reloads = Reloads::default();

        let wire = batch([
            create_message("./a.txt", b"fileContent"),
            delete_message("./old.txt"),
        ]);
        let summary = run_with(wire, context(&fixture, &reloads)).await.unwrap();

        assert_eq!(
            summary,
            SessionSummary {
                operations: 2,
                deletes: 1,
                creates: 1,
                bytes_written: 11,
                reloaded: true,
            }
        );
        assert_eq!(fixture.read("a.txt").as_deref(), Some(&b"fileContent"[..]));
        assert!(!fixture.exists("old.txt"));
        assert_eq!(
            *reloads.0.lock().unwrap(),
            [fixture.files_dir().join("internal/livesync.js")]
        );
    }

    #[tokio::test]
    async fn empty_stream_still_reloads() {
        let fixture = SandboxFixture::new().unwrap();
        let reloads = Reloads::default();

        let summary = run_with(Vec::new(), context(&fixture, &reloads)).await.unwrap();

        assert_eq!(summary.operations, 0);
        assert!(summary.reloaded);
        assert_eq!(reloads.count(), 1);
    }

    #[tokio::test]
    async fn invalid_operation_aborts_without_reload() {
        let fixture = SandboxFixture::new().unwrap();
        let reloads = Reloads::default();

        let mut wire = create_message("first.txt", b"1");
        wire.extend_from_slice(&[b'3']);
        wire.extend_from_slice(&create_message("second.txt", b"2"));
        let err = run_with(wire, context(&fixture, &reloads)).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MalformedOperation);
        assert!(fixture.exists("first.txt"));
        assert!(!fixture.exists("second.txt"));
        assert_eq!(reloads.count(), 0);
    }

    #[tokio::test]
    async fn parse_failure_log_carries_usage_reminder() {
        let fixture = SandboxFixture::new().unwrap();
        let reloads = Reloads::default();
        let sink = MemorySink::default();
        let subscriber = tracing_subscriber::registry().with(HostLayer::new(sink.clone()));
        let _guard = tracing::subscriber::set_default(subscriber);

        let err = run_with(b"3".to_vec(), context(&fixture, &reloads))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MalformedOperation);
        let logged = sink
            .records()
            .into_iter()
            .find(|record| record.level == Level::ERROR)
            .expect("session failure is logged");
        assert_eq!(logged.target, "livesync::session");
        assert!(logged.message.contains("operation not recognised"));
        assert!(logged.message.contains(PROTOCOL_USAGE));
        assert!(logged.message.contains("kind=malformed_operation"));
    }

    #[tokio::test]
    async fn delete_below_a_file_does_not_abort_the_batch() {
        let fixture = SandboxFixture::new().unwrap();
        let reloads = Reloads::default();

        let wire = batch([
            create_message("a.txt", b"1"),
            delete_message("a.txt/gone"),
            create_message("b.txt", b"2"),
        ]);
        let summary = run_with(wire, context(&fixture, &reloads)).await.unwrap();

        assert_eq!(summary.operations, 3);
        assert_eq!(fixture.read("a.txt").as_deref(), Some(&b"1"[..]));
        assert_eq!(fixture.read("b.txt").as_deref(), Some(&b"2"[..]));
        assert_eq!(reloads.count(), 1);
    }

    #[tokio::test]
    async fn truncated_content_aborts_without_reload() {
        let fixture = SandboxFixture::new().unwrap();
        let reloads = Reloads::default();

        let mut wire = create_message("a.txt", b"fileContent");
        wire.truncate(wire.len() - 3);
        let err = run_with(wire, context(&fixture, &reloads)).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MissingFileContent);
        assert!(!fixture.exists("a.txt"));
        assert_eq!(reloads.count(), 0);
    }

    #[tokio::test]
    async fn executor_failure_aborts_without_reload() {
        let fixture = SandboxFixture::new().unwrap();
        fixture.write("busy/inner.txt", b"x").unwrap();
        let reloads = Reloads::default();

        let wire = batch([create_message("busy", b"y"), create_message("after.txt", b"z")]);
        let err = run_with(wire, context(&fixture, &reloads)).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::FileWriteFailed);
        assert!(!fixture.exists("after.txt"));
        assert_eq!(reloads.count(), 0);
    }

    #[tokio::test]
    async fn oversized_content_is_rejected_before_reading_it() {
        let fixture = SandboxFixture::new().unwrap();
        let reloads = Reloads::default();
        let context = context(&fixture, &reloads).with_max_content_length(4);

        let err = run_with(create_message("big.bin", b"too large"), context)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MalformedLength);
        assert!(!fixture.exists("big.bin"));
    }

    #[tokio::test]
    async fn stream_is_shut_down_after_the_batch() {
        let fixture = SandboxFixture::new().unwrap();
        let reloads = Reloads::default();
        let (mut client, server) = tokio::io::duplex(64);
        client.write_all(&delete_message("x")).await.unwrap();

        Session::new(server, context(&fixture, &reloads))
            .run()
            .await
            .unwrap();

        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }
}
