//! Convenience macros that attach the LiveSync tracing targets.

/// Emit a session lifecycle trace.
///
/// # Example
/// ```ignore
/// trace_session!("batch finished after {} operations", count);
/// ```
#[macro_export]
macro_rules! trace_session {
    ($($arg:tt)*) => {
        ::tracing::info!(target: "livesync::session", $($arg)*);
    };
}

/// Emit a trace for a delete being applied.
///
/// # Example
/// ```ignore
/// trace_delete!(path = %path.display(), "removing entry");
/// ```
#[macro_export]
macro_rules! trace_delete {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "livesync::delete", $($arg)*);
    };
}

/// Emit a trace for a file being created or replaced.
///
/// # Example
/// ```ignore
/// trace_create!(bytes = content.len(), "writing {}", path.display());
/// ```
#[macro_export]
macro_rules! trace_create {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "livesync::create", $($arg)*);
    };
}

/// Emit a wire decoding trace.
///
/// # Example
/// ```ignore
/// trace_proto!(operation = %op, "decoded operation");
/// ```
#[macro_export]
macro_rules! trace_proto {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "livesync::protocol", $($arg)*);
    };
}

/// Emit a listener trace (bind, accept, shutdown).
///
/// # Example
/// ```ignore
/// trace_listener!(endpoint = %endpoint, "listening");
/// ```
#[macro_export]
macro_rules! trace_listener {
    ($($arg:tt)*) => {
        ::tracing::info!(target: "livesync::listener", $($arg)*);
    };
}
