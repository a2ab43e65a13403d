#![deny(unsafe_code)]

//! Shared test utilities for the LiveSync workspace.
//!
//! Wire builders here format messages by hand instead of going through the
//! protocol crate's encoder, so decoder tests do not depend on the code they
//! are checking.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Builds a delete message for `name`.
#[must_use]
pub fn delete_message(name: &str) -> Vec<u8> {
    let mut wire = format!("7{:05}", name.len()).into_bytes();
    wire.extend_from_slice(name.as_bytes());
    wire
}

/// Builds a create message for `name` carrying `content`.
#[must_use]
pub fn create_message(name: &str, content: &[u8]) -> Vec<u8> {
    let mut wire = format!("8{:05}", name.len()).into_bytes();
    wire.extend_from_slice(name.as_bytes());
    wire.extend_from_slice(format!("{:010}", content.len()).as_bytes());
    wire.extend_from_slice(content);
    wire
}

/// Concatenates several messages into one batch.
#[must_use]
pub fn batch<I>(messages: I) -> Vec<u8>
where
    I: IntoIterator<Item = Vec<u8>>,
{
    messages.into_iter().flatten().collect()
}

/// A temporary host storage directory with an `app` sandbox inside it.
///
/// The layout mirrors a device: `files_dir` is the application's private
/// storage and `root` is `files_dir/app`.
#[derive(Debug)]
pub struct SandboxFixture {
    dir: TempDir,
    root: PathBuf,
}

impl SandboxFixture {
    /// Creates the storage directory and an empty sandbox root.
    pub fn new() -> io::Result<Self> {
        let dir = tempfile::tempdir()?;
        let root = dir.path().join("app");
        fs::create_dir_all(&root)?;
        Ok(Self { dir, root })
    }

    /// Returns the host's private storage directory.
    #[must_use]
    pub fn files_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Returns the sandbox root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a path relative to the sandbox root.
    #[must_use]
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// Writes a file below the sandbox root, creating parent directories.
    pub fn write(&self, relative: impl AsRef<Path>, content: &[u8]) -> io::Result<PathBuf> {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Creates a directory below the sandbox root.
    pub fn mkdir(&self, relative: impl AsRef<Path>) -> io::Result<PathBuf> {
        let path = self.path(relative);
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// Reads a file below the sandbox root, returning `None` when it is missing.
    #[must_use]
    pub fn read(&self, relative: impl AsRef<Path>) -> Option<Vec<u8>> {
        fs::read(self.path(relative)).ok()
    }

    /// Reports whether any entry exists at the relative path.
    #[must_use]
    pub fn exists(&self, relative: impl AsRef<Path>) -> bool {
        fs::symlink_metadata(self.path(relative)).is_ok()
    }
}
