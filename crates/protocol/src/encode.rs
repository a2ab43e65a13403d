//! Wire encoding for the sending side of the protocol.

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::field::{
    CONTENT_LENGTH_WIDTH, DEFAULT_MAX_CONTENT_LENGTH, FILE_NAME_LENGTH_WIDTH, FrameField,
    MAX_FILE_NAME_LENGTH,
};
use crate::operation::Operation;

/// Errors raised when an operation cannot be represented on the wire.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum EncodeError {
    /// A field is longer than its length prefix can describe.
    #[error("{field} is {len} bytes long, the protocol allows at most {max}")]
    TooLong {
        /// The field that overflowed.
        field: FrameField,
        /// Actual length in bytes.
        len: usize,
        /// Largest representable length.
        max: u64,
    },
}

impl Operation {
    /// Returns the number of bytes [`encode_into_vec`](Self::encode_into_vec) appends.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        let header = 1 + FILE_NAME_LENGTH_WIDTH + self.file_name().len();
        match self.content() {
            None => header,
            Some(content) => header + CONTENT_LENGTH_WIDTH + content.len(),
        }
    }

    /// Appends the wire representation of the operation to `out`.
    ///
    /// # Examples
    ///
    /// ```
    /// use protocol::Operation;
    ///
    /// let mut wire = Vec::new();
    /// Operation::delete("./a").encode_into_vec(&mut wire).unwrap();
    /// Operation::create("./a.txt", b"fileContent".to_vec())
    ///     .encode_into_vec(&mut wire)
    ///     .unwrap();
    ///
    /// assert_eq!(wire, b"700003./a800007./a.txt0000000011fileContent");
    /// ```
    pub fn encode_into_vec(&self, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        let file_name = self.file_name().as_bytes();
        check_len(FrameField::FileName, file_name.len(), MAX_FILE_NAME_LENGTH as u64)?;
        if let Some(content) = self.content() {
            check_len(
                FrameField::FileContent,
                content.len(),
                DEFAULT_MAX_CONTENT_LENGTH,
            )?;
        }

        out.reserve(self.encoded_len());
        out.push(self.code().as_ascii());
        out.extend_from_slice(
            format!("{:0width$}", file_name.len(), width = FILE_NAME_LENGTH_WIDTH).as_bytes(),
        );
        out.extend_from_slice(file_name);
        if let Some(content) = self.content() {
            out.extend_from_slice(
                format!("{:0width$}", content.len(), width = CONTENT_LENGTH_WIDTH).as_bytes(),
            );
            out.extend_from_slice(content);
        }

        Ok(())
    }

    /// Encodes the operation into a freshly allocated buffer.
    pub fn to_wire(&self) -> Result<Vec<u8>, EncodeError> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode_into_vec(&mut out)?;
        Ok(out)
    }
}

/// Writes a whole batch of operations to `writer` and flushes it.
///
/// Operations are validated before anything is written so that a batch is
/// never cut short by an oversized entry.
pub async fn write_batch<'a, W, I>(writer: &mut W, operations: I) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
    I: IntoIterator<Item = &'a Operation>,
{
    let mut wire = Vec::new();
    for operation in operations {
        operation
            .encode_into_vec(&mut wire)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err))?;
    }
    writer.write_all(&wire).await?;
    writer.flush().await
}

fn check_len(field: FrameField, len: usize, max: u64) -> Result<(), EncodeError> {
    if len as u64 > max {
        return Err(EncodeError::TooLong { field, len, max });
    }
    Ok(())
}
