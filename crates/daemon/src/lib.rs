#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `daemon` hosts the LiveSync listener inside a debug build. It binds a local
//! socket named after the application, accepts connections from the desktop
//! push tool, and runs one [`Session`] per connection. Each session decodes a
//! batch of file operations, applies them below the sandbox root and, when
//! the whole batch succeeded, asks the host to reload through a
//! [`ReloadTrigger`].
//!
//! # Design
//!
//! - [`SyncListener`] owns the listening socket. A [`ShutdownHandle`] stops it
//!   through a running flag plus a broadcast wakeup; sessions already in
//!   flight are left to finish.
//! - [`Session`] reads with the `protocol` decoder and hands file effects to
//!   the blocking pool, so a slow disk never stalls the reactor.
//! - [`SessionContext`] carries the executor, reload trigger and script path
//!   into every session explicitly. There is no global state.
//! - [`SyncService`] is the start/stop/wait wrapper hosts use.
//!
//! # Errors
//!
//! Session failures are [`SessionError`] values and never stop the listener.
//! Listener failures are [`ListenerError`] values. Both classify themselves
//! with [`protocol::ErrorKind`].
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use daemon::{ListenerConfig, LogReloadTrigger, SyncService};
//!
//! # async fn run() -> Result<(), daemon::ListenerError> {
//! let config = ListenerConfig::for_host("/data/user/0/org.example/files", "org.example");
//! let service = SyncService::start(&config, Arc::new(LogReloadTrigger))?;
//! // ... later, when the application shuts down:
//! service.stop();
//! service.wait().await
//! # }
//! ```

mod config;
mod endpoint;
mod error;
mod listener;
mod reload;
mod service;
mod session;

pub use config::{ListenerConfig, ListenerConfigBuilder};
pub use endpoint::{ENDPOINT_SUFFIX, Endpoint};
pub use error::{ConfigError, ListenerError, SessionError};
pub use listener::{ShutdownHandle, SyncListener};
pub use reload::{
    CommandReloadTrigger, FnReloadTrigger, LogReloadTrigger, RELOAD_SCRIPT_RELATIVE_PATH,
    ReloadTrigger,
};
pub use service::SyncService;
pub use session::{Session, SessionContext, SessionSummary};
