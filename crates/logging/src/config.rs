//! Verbosity configuration and subscriber installation.

use std::io;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

use crate::host_layer::{HostLayer, HostLogSink, TARGET_PREFIX};

/// How much a LiveSync process logs.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LogConfig {
    verbose: u8,
    ansi: bool,
}

impl LogConfig {
    /// Creates a configuration from a `-v` count.
    ///
    /// | count | level |
    /// |---|---|
    /// | 0 | warn |
    /// | 1 | info |
    /// | 2 | debug |
    /// | 3+ | trace |
    #[must_use]
    pub const fn from_verbose_level(verbose: u8) -> Self {
        Self {
            verbose,
            ansi: false,
        }
    }

    /// Enables ANSI colouring of the stderr output.
    #[must_use]
    pub const fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    /// Returns the `-v` count this configuration was built from.
    #[must_use]
    pub const fn verbose(&self) -> u8 {
        self.verbose
    }

    /// Returns the level applied to `livesync::*` targets.
    #[must_use]
    pub const fn level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    /// Returns the filter directives used when `RUST_LOG` is absent.
    ///
    /// Third-party crates stay at `warn` whatever the verbosity.
    #[must_use]
    pub fn default_directives(&self) -> String {
        let level = match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        format!("warn,{TARGET_PREFIX}={level}")
    }

    /// Builds the event filter, preferring a valid `RUST_LOG` value.
    #[must_use]
    pub fn env_filter(&self) -> EnvFilter {
        match std::env::var(EnvFilter::DEFAULT_ENV) {
            Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives)
                .unwrap_or_else(|_| EnvFilter::new(self.default_directives())),
            _ => EnvFilter::new(self.default_directives()),
        }
    }
}

/// Installs a global subscriber that writes formatted events to stderr.
///
/// Fails when a global subscriber is already installed.
pub fn init_tracing(config: &LogConfig) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(config.ansi),
        )
        .try_init()
}

/// Installs a global subscriber that also forwards `livesync::*` events to
/// the host log through `sink`.
pub fn init_tracing_with_sink<S>(config: &LogConfig, sink: S) -> Result<(), TryInitError>
where
    S: HostLogSink,
{
    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(config.ansi),
        )
        .with(HostLayer::new(sink))
        .try_init()
}
