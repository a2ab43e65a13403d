use ::core::fmt;

/// Width in bytes of the operation code field.
pub const OPERATION_WIDTH: usize = 1;

/// Width in bytes of the zero-padded file name length field.
pub const FILE_NAME_LENGTH_WIDTH: usize = 5;

/// Width in bytes of the zero-padded content length field.
pub const CONTENT_LENGTH_WIDTH: usize = 10;

/// Largest file name length expressible in [`FILE_NAME_LENGTH_WIDTH`] digits.
pub const MAX_FILE_NAME_LENGTH: usize = 99_999;

/// Largest content length accepted by default.
///
/// The ten-digit field could describe lengths up to `9_999_999_999`, but the
/// desktop tooling has always been bounded by a signed 32-bit length and
/// buffers of that size are already impractical on a device.
pub const DEFAULT_MAX_CONTENT_LENGTH: u64 = i32::MAX as u64;

/// Logical fields read from the wire, in the order they appear in a message.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FrameField {
    /// Single ASCII digit selecting the operation.
    Operation,
    /// Five zero-padded ASCII digits giving the file name length.
    FileNameLength,
    /// File name bytes, relative to the sandbox root.
    FileName,
    /// Ten zero-padded ASCII digits giving the content length.
    ContentLength,
    /// Raw file content.
    FileContent,
}

impl FrameField {
    /// Returns the name used for the field in protocol diagnostics.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Operation => "operation",
            Self::FileNameLength => "fileNameLength",
            Self::FileName => "fileName",
            Self::ContentLength => "fileContentLength",
            Self::FileContent => "fileContent",
        }
    }

    /// Returns the fixed width of the field, or `None` for length-prefixed fields.
    #[must_use]
    pub const fn fixed_width(self) -> Option<usize> {
        match self {
            Self::Operation => Some(OPERATION_WIDTH),
            Self::FileNameLength => Some(FILE_NAME_LENGTH_WIDTH),
            Self::ContentLength => Some(CONTENT_LENGTH_WIDTH),
            Self::FileName | Self::FileContent => None,
        }
    }
}

impl fmt::Display for FrameField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Operation selected by the first byte of every message.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum OperationCode {
    /// Remove a file or directory tree.
    Delete = 7,
    /// Create or overwrite a file.
    Create = 8,
}

impl OperationCode {
    /// Returns the numeric value carried on the wire.
    #[must_use]
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns the ASCII digit that encodes the operation.
    #[must_use]
    #[inline]
    pub const fn as_ascii(self) -> u8 {
        b'0' + self.as_u8()
    }

    /// Maps a decimal value to an operation code.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            7 => Some(Self::Delete),
            8 => Some(Self::Create),
            _ => None,
        }
    }

    /// Interprets a raw operation byte as an ASCII decimal digit.
    #[must_use]
    pub const fn from_ascii(byte: u8) -> Option<Self> {
        if byte.is_ascii_digit() {
            Self::from_u8(byte - b'0')
        } else {
            None
        }
    }
}

impl fmt::Display for OperationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delete => f.write_str("delete"),
            Self::Create => f.write_str("create"),
        }
    }
}
