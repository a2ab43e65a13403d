//! Forwarding of LiveSync events to the host platform's log.
//!
//! On a device the listener runs inside an application process whose log
//! facility is the only place a developer looks. [`HostLayer`] picks the
//! events emitted under [`TARGET_PREFIX`] and hands a flattened line to a
//! [`HostLogSink`].

use std::fmt::{self, Write as _};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Target prefix shared by every LiveSync event.
pub const TARGET_PREFIX: &str = "livesync";

/// Destination for forwarded log lines.
pub trait HostLogSink: Send + Sync + 'static {
    /// Records one event.
    fn write(&self, level: Level, target: &str, message: &str);
}

impl<F> HostLogSink for F
where
    F: Fn(Level, &str, &str) + Send + Sync + 'static,
{
    fn write(&self, level: Level, target: &str, message: &str) {
        self(level, target, message);
    }
}

/// A tracing layer that forwards `livesync::*` events to a [`HostLogSink`].
pub struct HostLayer<S> {
    sink: S,
}

impl<S: HostLogSink> HostLayer<S> {
    /// Creates a layer writing to `sink`.
    #[must_use]
    pub const fn new(sink: S) -> Self {
        Self { sink }
    }

    /// Returns the wrapped sink.
    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    fn forwards(target: &str) -> bool {
        target
            .strip_prefix(TARGET_PREFIX)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
    }
}

impl<S> fmt::Debug for HostLayer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostLayer").finish_non_exhaustive()
    }
}

impl<S, R> Layer<R> for HostLayer<S>
where
    S: HostLogSink,
    R: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, R>) {
        let metadata = event.metadata();
        if !Self::forwards(metadata.target()) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.sink
            .write(*metadata.level(), metadata.target(), &visitor.finish());
    }
}

/// Flattens an event into `message key=value ...`.
#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        match self.message {
            Some(mut message) => {
                message.push_str(&self.fields);
                message
            }
            None => self.fields.trim_start().to_owned(),
        }
    }
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        } else {
            let _ = write!(self.fields, " {}={value:?}", field.name());
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_owned());
        } else {
            let _ = write!(self.fields, " {}={value}", field.name());
        }
    }
}

/// One line captured by a [`MemorySink`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HostRecord {
    /// Event level.
    pub level: Level,
    /// Event target, always under [`TARGET_PREFIX`].
    pub target: String,
    /// Flattened message and fields.
    pub message: String,
}

/// An in-memory sink, cloneable so a test can keep a handle while the layer
/// owns another.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<HostRecord>>>,
}

impl MemorySink {
    /// Returns every captured record in arrival order.
    #[must_use]
    pub fn records(&self) -> Vec<HostRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the captured messages without level or target.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.message).collect()
    }

    /// Reports whether any captured message contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|r| r.message.contains(needle))
    }
}

impl HostLogSink for MemorySink {
    fn write(&self, level: Level, target: &str, message: &str) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(HostRecord {
                level,
                target: target.to_owned(),
                message: message.to_owned(),
            });
    }
}
