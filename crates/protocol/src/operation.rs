use ::core::fmt;

use crate::field::OperationCode;

/// A decoded file operation.
///
/// File names are kept exactly as decoded (after whitespace trimming). They
/// are relative to the sandbox root, but no path component is interpreted at
/// this layer: resolving and policing them is the executor's job.
#[derive(Clone, Eq, PartialEq)]
pub enum Operation {
    /// Remove the named file, or the named directory and everything below it.
    Delete {
        /// Relative path of the entry to remove.
        file_name: String,
    },
    /// Create or replace the named file with `content`.
    Create {
        /// Relative path of the file to write.
        file_name: String,
        /// Complete body of the file.
        content: Vec<u8>,
    },
}

impl Operation {
    /// Constructs a delete operation.
    #[must_use]
    pub fn delete(file_name: impl Into<String>) -> Self {
        Self::Delete {
            file_name: file_name.into(),
        }
    }

    /// Constructs a create operation.
    #[must_use]
    pub fn create(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self::Create {
            file_name: file_name.into(),
            content: content.into(),
        }
    }

    /// Returns the operation code that introduces this operation on the wire.
    #[must_use]
    pub const fn code(&self) -> OperationCode {
        match self {
            Self::Delete { .. } => OperationCode::Delete,
            Self::Create { .. } => OperationCode::Create,
        }
    }

    /// Returns the relative file name the operation targets.
    #[must_use]
    pub fn file_name(&self) -> &str {
        match self {
            Self::Delete { file_name } | Self::Create { file_name, .. } => file_name,
        }
    }

    /// Returns the content carried by a create operation.
    #[must_use]
    pub fn content(&self) -> Option<&[u8]> {
        match self {
            Self::Delete { .. } => None,
            Self::Create { content, .. } => Some(content),
        }
    }
}

// Content can be megabytes; print its length only.
impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delete { file_name } => f.debug_tuple("Delete").field(file_name).finish(),
            Self::Create { file_name, content } => f
                .debug_struct("Create")
                .field("file_name", file_name)
                .field("content_len", &content.len())
                .finish(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delete { file_name } => write!(f, "delete {file_name:?}"),
            Self::Create { file_name, content } => {
                write!(f, "create {file_name:?} ({} bytes)", content.len())
            }
        }
    }
}
