//! Message decoding state machine.
//!
//! Each call to [`MessageDecoder::next_operation`] starts in the
//! `AwaitOperation` state, reads the operation digit and then walks the
//! fields of the selected operation. A stream that ends cleanly before the
//! operation byte produces `Ok(None)`, which marks the end of the batch.

use std::borrow::Cow;

use logging::trace_proto;
use tokio::io::AsyncRead;
use tracing::warn;

use crate::error::{DecodeError, RawByte};
use crate::field::{
    CONTENT_LENGTH_WIDTH, DEFAULT_MAX_CONTENT_LENGTH, FILE_NAME_LENGTH_WIDTH, FrameField,
    OPERATION_WIDTH, OperationCode,
};
use crate::frame::read_frame;
use crate::operation::Operation;

/// Decodes [`Operation`] values from an asynchronous byte stream.
///
/// The decoder owns its reader so that the caller can interleave
/// [`get_mut`](Self::get_mut) checks (such as
/// [`has_pending_input`](crate::has_pending_input)) between messages.
#[derive(Debug)]
pub struct MessageDecoder<R> {
    reader: R,
    max_content_length: u64,
}

impl<R> MessageDecoder<R> {
    /// Creates a decoder using [`DEFAULT_MAX_CONTENT_LENGTH`].
    #[must_use]
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
        }
    }

    /// Sets the largest content length the decoder accepts.
    #[must_use]
    pub const fn with_max_content_length(mut self, max: u64) -> Self {
        self.max_content_length = max;
        self
    }

    /// Returns the configured content length limit.
    #[must_use]
    pub const fn max_content_length(&self) -> u64 {
        self.max_content_length
    }

    /// Returns a shared reference to the underlying reader.
    #[must_use]
    pub const fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Returns a mutable reference to the underlying reader.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Consumes the decoder and returns the underlying reader.
    #[must_use]
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: AsyncRead + Unpin> MessageDecoder<R> {
    /// Decodes the next operation.
    ///
    /// Returns `Ok(None)` when the stream ends before an operation byte.
    ///
    /// # Examples
    ///
    /// ```
    /// use protocol::{MessageDecoder, Operation};
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> Result<(), protocol::DecodeError> {
    /// let wire: &[u8] = b"700003./a800007./a.txt0000000011fileContent";
    /// let mut decoder = MessageDecoder::new(wire);
    ///
    /// assert_eq!(decoder.next_operation().await?, Some(Operation::delete("./a")));
    /// assert_eq!(
    ///     decoder.next_operation().await?,
    ///     Some(Operation::create("./a.txt", b"fileContent".to_vec()))
    /// );
    /// assert_eq!(decoder.next_operation().await?, None);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn next_operation(&mut self) -> Result<Option<Operation>, DecodeError> {
        let Some(code) = self.read_operation_code().await? else {
            trace_proto!("input stream is empty");
            return Ok(None);
        };

        let operation = match code {
            OperationCode::Delete => {
                let file_name = self.read_file_name().await?;
                Operation::Delete { file_name }
            }
            OperationCode::Create => {
                let file_name = self.read_file_name().await?;
                let content = self.read_file_content().await?;
                Operation::Create { file_name, content }
            }
        };

        trace_proto!(operation = %operation, "decoded operation");
        Ok(Some(operation))
    }

    async fn read_operation_code(&mut self) -> Result<Option<OperationCode>, DecodeError> {
        let Some(buffer) = self.read_field(FrameField::Operation, OPERATION_WIDTH).await? else {
            return Ok(None);
        };

        // A one-byte request only comes back as `Some` when the byte arrived.
        let byte = buffer[0];
        OperationCode::from_ascii(byte)
            .map(Some)
            .ok_or(DecodeError::MalformedOperation {
                found: RawByte(byte),
            })
    }

    async fn read_file_name(&mut self) -> Result<String, DecodeError> {
        let declared = self
            .read_length(FrameField::FileNameLength, FILE_NAME_LENGTH_WIDTH)
            .await?;
        // Five digits never exceed 99999, so the conversion cannot fail on
        // any supported platform.
        let declared = usize::try_from(declared).unwrap_or(usize::MAX);

        let buffer = match self.read_field(FrameField::FileName, declared).await? {
            Some(buffer) if buffer.len() == declared => buffer,
            partial => {
                return Err(DecodeError::MissingFileName {
                    field: FrameField::FileName,
                    expected: declared,
                    received: partial.map_or(0, |buffer| buffer.len()),
                });
            }
        };

        let text = String::from_utf8_lossy(&buffer);
        let file_name = trim_file_name(&text);
        // Replacement characters are never trimmed, so the bytes dropped
        // from `text` are exactly the bytes dropped from the wire.
        let trimmed = text.len() - file_name.len();
        if trimmed > 0 {
            warn!(
                target: "livesync::protocol",
                declared,
                parsed = declared - trimmed,
                "{} parsed length is less than {}; less information was read than specified",
                FrameField::FileName,
                FrameField::FileNameLength,
            );
        }
        if file_name.is_empty() {
            return Err(DecodeError::EmptyFileName);
        }

        Ok(file_name.to_owned())
    }

    async fn read_file_content(&mut self) -> Result<Vec<u8>, DecodeError> {
        let declared = self
            .read_length(FrameField::ContentLength, CONTENT_LENGTH_WIDTH)
            .await?;
        if declared > self.max_content_length {
            return Err(DecodeError::LengthOutOfRange {
                field: FrameField::ContentLength,
                value: declared,
                max: self.max_content_length,
            });
        }
        let declared = usize::try_from(declared).map_err(|_| DecodeError::LengthOutOfRange {
            field: FrameField::ContentLength,
            value: declared,
            max: usize::MAX as u64,
        })?;

        match self.read_field(FrameField::FileContent, declared).await? {
            Some(buffer) if buffer.len() == declared => Ok(buffer),
            partial => Err(DecodeError::MissingFileContent {
                field: FrameField::FileContent,
                expected: declared,
                received: partial.map_or(0, |buffer| buffer.len()),
            }),
        }
    }

    /// Reads and parses a fixed-width, zero-padded decimal length field.
    async fn read_length(&mut self, field: FrameField, width: usize) -> Result<u64, DecodeError> {
        let Some(buffer) = self.read_field(field, width).await? else {
            return Err(missing(field, width, 0));
        };

        parse_length(&buffer, width).ok_or_else(|| DecodeError::MalformedLength {
            field,
            raw: String::from_utf8_lossy(&buffer).into_owned(),
        })
    }

    async fn read_field(
        &mut self,
        field: FrameField,
        size: usize,
    ) -> Result<Option<Vec<u8>>, DecodeError> {
        read_frame(&mut self.reader, size)
            .await
            .map_err(|source| DecodeError::Read { field, source })
    }
}

fn missing(field: FrameField, expected: usize, received: usize) -> DecodeError {
    match field {
        FrameField::ContentLength | FrameField::FileContent => DecodeError::MissingFileContent {
            field,
            expected,
            received,
        },
        _ => DecodeError::MissingFileName {
            field,
            expected,
            received,
        },
    }
}

/// Parses a length field that must hold exactly `width` ASCII digits.
///
/// Signs, padding spaces and short fields are all rejected.
#[must_use]
pub fn parse_length(field: &[u8], width: usize) -> Option<u64> {
    if field.len() != width || !field.iter().all(u8::is_ascii_digit) {
        return None;
    }

    field.iter().try_fold(0u64, |value, digit| {
        value
            .checked_mul(10)?
            .checked_add(u64::from(digit - b'0'))
    })
}

/// Decodes raw file name bytes into the name used for path resolution.
///
/// Invalid UTF-8 sequences are replaced rather than rejected, and leading or
/// trailing whitespace and control characters (including NUL padding) are
/// trimmed.
#[must_use]
pub fn decode_file_name(bytes: &[u8]) -> String {
    let text: Cow<'_, str> = String::from_utf8_lossy(bytes);
    trim_file_name(&text).to_owned()
}

fn trim_file_name(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || c.is_control())
}
