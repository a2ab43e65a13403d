use ::core::fmt;
use std::io;

use thiserror::Error;

use crate::field::FrameField;
use crate::usage::PROTOCOL_USAGE;

/// Classification shared by every error a sync session can end with.
///
/// Protocol violations are the sender's fault and are fixed by resending a
/// correctly framed batch; the remaining kinds originate on the device.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    /// Unrecognised or unparsable operation code.
    MalformedOperation,
    /// A length field is not a valid non-negative decimal within limits.
    MalformedLength,
    /// The stream ended before the declared file name was available.
    MissingFileName,
    /// The stream ended before the declared content was available.
    MissingFileContent,
    /// Materialising a created file failed.
    FileWriteFailed,
    /// Removing an existing entry failed.
    FileDeleteFailed,
    /// A file name leaves the sandbox and the escape policy rejects it.
    PathEscapesSandbox,
    /// Reading from the connection failed.
    Transport,
    /// A worker applying file effects did not complete.
    Internal,
}

impl ErrorKind {
    /// Reports whether the error stems from a malformed batch.
    #[must_use]
    pub const fn is_protocol_violation(self) -> bool {
        matches!(
            self,
            Self::MalformedOperation
                | Self::MalformedLength
                | Self::MissingFileName
                | Self::MissingFileContent
                | Self::PathEscapesSandbox
        )
    }

    /// Returns a stable identifier for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MalformedOperation => "malformed_operation",
            Self::MalformedLength => "malformed_length",
            Self::MissingFileName => "missing_file_name",
            Self::MissingFileContent => "missing_file_content",
            Self::FileWriteFailed => "file_write_failed",
            Self::FileDeleteFailed => "file_delete_failed",
            Self::PathEscapesSandbox => "path_escapes_sandbox",
            Self::Transport => "transport",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while decoding a message from the wire.
///
/// Every parse-class variant renders the [`PROTOCOL_USAGE`] reminder after
/// its own description.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The operation byte is not one of the known operation digits.
    #[error("LiveSync: operation not recognised (read {found:?}).\n{usage}", usage = PROTOCOL_USAGE)]
    MalformedOperation {
        /// The offending byte, rendered as text when printable.
        found: RawByte,
    },

    /// A length field does not hold exactly its width in decimal digits.
    #[error("LiveSync: failed to parse {field}: {raw:?} is not a zero-padded decimal.\n{usage}", usage = PROTOCOL_USAGE)]
    MalformedLength {
        /// The length field that failed to parse.
        field: FrameField,
        /// The raw field contents, lossily decoded.
        raw: String,
    },

    /// A length field exceeds the configured limit.
    #[error("LiveSync: {field} {value} exceeds the maximum of {max}.\n{usage}", usage = PROTOCOL_USAGE)]
    LengthOutOfRange {
        /// The length field that was rejected.
        field: FrameField,
        /// The parsed value.
        value: u64,
        /// The largest accepted value.
        max: u64,
    },

    /// The stream ended before the file name or its length was complete.
    #[error("LiveSync: Missing {field} bytes: expected {expected}, received {received}.\n{usage}", usage = PROTOCOL_USAGE)]
    MissingFileName {
        /// Either [`FrameField::FileNameLength`] or [`FrameField::FileName`].
        field: FrameField,
        /// Bytes the field required.
        expected: usize,
        /// Bytes that arrived before the stream ended.
        received: usize,
    },

    /// The decoded file name is empty once whitespace is trimmed.
    #[error("LiveSync: fileName is empty after trimming whitespace.\n{usage}", usage = PROTOCOL_USAGE)]
    EmptyFileName,

    /// The stream ended before the content or its length was complete.
    #[error("LiveSync: Missing {field} bytes: expected {expected}, received {received}.\n{usage}", usage = PROTOCOL_USAGE)]
    MissingFileContent {
        /// Either [`FrameField::ContentLength`] or [`FrameField::FileContent`].
        field: FrameField,
        /// Bytes the field required.
        expected: usize,
        /// Bytes that arrived before the stream ended.
        received: usize,
    },

    /// Reading a field from the connection failed.
    #[error("LiveSync: failed to read {field}: {source}")]
    Read {
        /// The field being read.
        field: FrameField,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl DecodeError {
    /// Returns the error classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedOperation { .. } => ErrorKind::MalformedOperation,
            Self::MalformedLength { .. } | Self::LengthOutOfRange { .. } => {
                ErrorKind::MalformedLength
            }
            Self::MissingFileName { .. } | Self::EmptyFileName => ErrorKind::MissingFileName,
            Self::MissingFileContent { .. } => ErrorKind::MissingFileContent,
            Self::Read { .. } => ErrorKind::Transport,
        }
    }

    /// Returns the wire field the error refers to.
    #[must_use]
    pub const fn field(&self) -> FrameField {
        match self {
            Self::MalformedOperation { .. } => FrameField::Operation,
            Self::EmptyFileName => FrameField::FileName,
            Self::MalformedLength { field, .. }
            | Self::LengthOutOfRange { field, .. }
            | Self::MissingFileName { field, .. }
            | Self::MissingFileContent { field, .. }
            | Self::Read { field, .. } => *field,
        }
    }
}

impl From<DecodeError> for io::Error {
    fn from(err: DecodeError) -> Self {
        let kind = match err.kind() {
            ErrorKind::MissingFileName | ErrorKind::MissingFileContent => {
                io::ErrorKind::UnexpectedEof
            }
            _ => io::ErrorKind::InvalidData,
        };
        Self::new(kind, err)
    }
}

/// A single byte read from the wire, printed as text when it is printable ASCII.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct RawByte(pub u8);

impl fmt::Debug for RawByte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_ascii_graphic() {
            write!(f, "'{}'", char::from(self.0))
        } else {
            write!(f, "{:#04x}", self.0)
        }
    }
}
