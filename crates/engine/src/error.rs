//! Errors raised while applying operations to the sandbox.

use std::io;
use std::path::{Path, PathBuf};

use protocol::ErrorKind;
use thiserror::Error;

/// Failure applying a single operation.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// Writing a created file, or preparing its location, failed.
    #[error("LiveSync: failed to {action} {location}: {source}", location = .path.display())]
    FileWriteFailed {
        /// Step that failed.
        action: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Removing an existing entry failed for a reason other than absence.
    #[error("LiveSync: failed to {action} {location}: {source}", location = .path.display())]
    FileDeleteFailed {
        /// Step that failed.
        action: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The name is absolute or climbs out of the root and escaping names are
    /// rejected.
    #[error("LiveSync: refusing {name:?}, it resolves outside {root_dir}", root_dir = .root.display())]
    PathEscapesSandbox {
        /// The decoded file name.
        name: String,
        /// The sandbox root it was checked against.
        root: PathBuf,
    },
}

impl ApplyError {
    pub(crate) fn write(action: &'static str, path: &Path, source: io::Error) -> Self {
        Self::FileWriteFailed {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn delete(action: &'static str, path: &Path, source: io::Error) -> Self {
        Self::FileDeleteFailed {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Returns the error classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::FileWriteFailed { .. } => ErrorKind::FileWriteFailed,
            Self::FileDeleteFailed { .. } => ErrorKind::FileDeleteFailed,
            Self::PathEscapesSandbox { .. } => ErrorKind::PathEscapesSandbox,
        }
    }

    /// Returns the filesystem path involved, if any was resolved.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::FileWriteFailed { path, .. } | Self::FileDeleteFailed { path, .. } => Some(path),
            Self::PathEscapesSandbox { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn write_failure_names_action_and_path() {
        let err = ApplyError::write(
            "write",
            Path::new("/data/app/a.txt"),
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );

        assert_eq!(err.kind(), ErrorKind::FileWriteFailed);
        assert_eq!(err.path(), Some(Path::new("/data/app/a.txt")));
        assert_eq!(
            err.to_string(),
            "LiveSync: failed to write /data/app/a.txt: denied"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn delete_failure_is_its_own_kind() {
        let err = ApplyError::delete(
            "remove directory",
            Path::new("/data/app/dir"),
            io::ErrorKind::PermissionDenied.into(),
        );
        assert_eq!(err.kind(), ErrorKind::FileDeleteFailed);
        assert!(!err.kind().is_protocol_violation());
    }

    #[test]
    fn escape_is_a_protocol_violation_without_path() {
        let err = ApplyError::PathEscapesSandbox {
            name: "../x".to_owned(),
            root: PathBuf::from("/data/app"),
        };
        assert_eq!(err.kind(), ErrorKind::PathEscapesSandbox);
        assert!(err.kind().is_protocol_violation());
        assert_eq!(err.path(), None);
        assert_eq!(
            err.to_string(),
            "LiveSync: refusing \"../x\", it resolves outside /data/app"
        );
    }
}
