#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` wires the LiveSync crates into the [`tracing`] ecosystem. Every
//! crate emits events under a `livesync::*` target through the `trace_*!`
//! macros exported here, and binaries install a subscriber with
//! [`init_tracing`] or [`init_tracing_with_sink`].
//!
//! # Design
//!
//! - [`LogConfig`] maps a `-v` count onto a level filter. An explicit
//!   `RUST_LOG` always wins over the computed default.
//! - [`HostLayer`] forwards `livesync::*` events to a [`HostLogSink`], the
//!   host platform's log facility. Events from other targets stay on the
//!   formatted stderr output only.
//! - [`MemorySink`] records forwarded lines for assertions.
//!
//! # Targets
//!
//! | Macro | Target | Level |
//! |---|---|---|
//! | [`trace_session!`] | `livesync::session` | info |
//! | [`trace_delete!`] | `livesync::delete` | debug |
//! | [`trace_create!`] | `livesync::create` | debug |
//! | [`trace_proto!`] | `livesync::protocol` | debug |
//! | [`trace_listener!`] | `livesync::listener` | info |
//!
//! # Examples
//!
//! ```
//! use logging::{HostLayer, MemorySink, trace_session};
//! use tracing_subscriber::layer::SubscriberExt;
//!
//! let sink = MemorySink::default();
//! let subscriber = tracing_subscriber::registry().with(HostLayer::new(sink.clone()));
//!
//! tracing::subscriber::with_default(subscriber, || {
//!     trace_session!("applied {} operations", 2);
//! });
//!
//! assert_eq!(sink.messages(), vec!["applied 2 operations".to_owned()]);
//! ```

mod config;
mod host_layer;
mod tracing_macros;

pub use config::{LogConfig, init_tracing, init_tracing_with_sink};
pub use host_layer::{HostLayer, HostLogSink, HostRecord, MemorySink, TARGET_PREFIX};
