use std::io;

use engine::ApplyError;
use protocol::{DecodeError, ErrorKind};
use thiserror::Error;
use tokio::task::JoinError;

/// Reason a session ended without applying its whole batch.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The batch could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// An operation could not be applied.
    #[error(transparent)]
    Apply(#[from] ApplyError),

    /// The blocking worker applying an operation panicked or was cancelled.
    #[error("LiveSync: file operation worker did not complete: {0}")]
    Worker(#[from] JoinError),
}

impl SessionError {
    /// Returns the error classification.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Decode(err) => err.kind(),
            Self::Apply(err) => err.kind(),
            Self::Worker(_) => ErrorKind::Internal,
        }
    }
}

/// Failure of the listener itself, as opposed to one of its sessions.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The endpoint could not be bound.
    #[error("LiveSync: failed to bind {endpoint}: {source}")]
    Bind {
        /// Rendered endpoint.
        endpoint: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Accepting a connection failed; the listener stops.
    #[error("LiveSync: failed to accept on {endpoint}: {source}")]
    Accept {
        /// Rendered endpoint.
        endpoint: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The task running the listener panicked or was cancelled.
    #[error("LiveSync: listener task did not complete: {0}")]
    Task(#[from] JoinError),
}

impl ListenerError {
    /// Returns the error classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Bind { .. } | Self::Accept { .. } => ErrorKind::Transport,
            Self::Task(_) => ErrorKind::Internal,
        }
    }
}

/// A [`ListenerConfig`](crate::ListenerConfig) could not be built.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ConfigError {
    /// A required setting was not supplied.
    #[error("listener configuration is missing {0}")]
    Missing(&'static str),
}
