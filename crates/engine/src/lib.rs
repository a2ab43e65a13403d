#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `engine` applies decoded LiveSync operations to the application's sandbox
//! directory. A delete removes a file or a whole directory tree; a create
//! replaces whatever sits at the target with a freshly written file.
//!
//! # Design
//!
//! [`SandboxRoot`] is an explicit value handed to each
//! [`FileOperationExecutor`] rather than global state. Names are joined onto
//! the root without normalisation; an [`EscapePolicy`] decides whether names
//! that climb out of it are only flagged or refused.
//!
//! The executor is synchronous. Async sessions run it on the blocking pool.
//!
//! # Errors
//!
//! Failures are reported as [`ApplyError`], whose
//! [`kind`](ApplyError::kind) shares the [`protocol::ErrorKind`] taxonomy with
//! decoding errors.
//!
//! # Examples
//!
//! ```
//! use engine::{FileOperationExecutor, SandboxRoot};
//! use protocol::Operation;
//!
//! let dir = tempfile::tempdir()?;
//! let executor = FileOperationExecutor::new(SandboxRoot::new(dir.path()));
//!
//! executor.apply(&Operation::create("./a.txt", b"fileContent".to_vec()))?;
//! assert_eq!(std::fs::read(dir.path().join("a.txt"))?, b"fileContent");
//!
//! executor.apply(&Operation::delete("./a.txt"))?;
//! assert!(!dir.path().join("a.txt").exists());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod executor;
mod sandbox;

pub use error::ApplyError;
pub use executor::{AppliedOperation, FileOperationExecutor};
pub use sandbox::{EscapePolicy, SANDBOX_DIR_NAME, SandboxRoot};
