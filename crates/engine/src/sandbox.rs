//! The directory every decoded file name is resolved against.

use ::core::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Name of the sandbox directory inside the host's private storage.
pub const SANDBOX_DIR_NAME: &str = "app";

/// An immutable sandbox root shared by every session of a listener.
///
/// Cloning is cheap; all clones point at the same path.
#[derive(Clone, Eq, PartialEq)]
pub struct SandboxRoot {
    path: Arc<PathBuf>,
}

impl SandboxRoot {
    /// Uses `path` as the root as given.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
        }
    }

    /// Derives the root from the host's private storage directory.
    ///
    /// ```
    /// use engine::SandboxRoot;
    /// use std::path::Path;
    ///
    /// let root = SandboxRoot::from_files_dir("/data/user/0/org.example/files");
    /// assert_eq!(root.path(), Path::new("/data/user/0/org.example/files/app"));
    /// ```
    #[must_use]
    pub fn from_files_dir(files_dir: impl AsRef<Path>) -> Self {
        Self::new(files_dir.as_ref().join(SANDBOX_DIR_NAME))
    }

    /// Returns the root directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Joins a decoded file name onto the root.
    ///
    /// No normalisation happens: `..` segments are kept and an absolute name
    /// replaces the root entirely, as the platform join does.
    #[must_use]
    pub fn resolve(&self, file_name: &str) -> PathBuf {
        self.path.join(file_name)
    }

    /// Reports whether `file_name` can resolve outside the root.
    ///
    /// The check is lexical. A name escapes when it is absolute or when its
    /// `..` segments climb above the root at any point.
    #[must_use]
    pub fn escapes(file_name: &str) -> bool {
        let mut depth = 0usize;
        for component in Path::new(file_name).components() {
            match component {
                Component::Prefix(_) | Component::RootDir => return true,
                Component::CurDir => {}
                Component::ParentDir => match depth.checked_sub(1) {
                    Some(parent) => depth = parent,
                    None => return true,
                },
                Component::Normal(_) => depth += 1,
            }
        }
        false
    }
}

impl fmt::Debug for SandboxRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SandboxRoot").field(&self.path).finish()
    }
}

impl fmt::Display for SandboxRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.path.display(), f)
    }
}

/// What the executor does with names that resolve outside the root.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum EscapePolicy {
    /// Apply the operation anyway and log a warning.
    #[default]
    Warn,
    /// Refuse the operation before touching the filesystem.
    Reject,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_joins_relative_names() {
        let root = SandboxRoot::new("/data/app");
        assert_eq!(root.resolve("./a.txt"), Path::new("/data/app/./a.txt"));
        assert_eq!(root.resolve("dir/b.js"), Path::new("/data/app/dir/b.js"));
    }

    #[test]
    fn resolve_keeps_parent_segments() {
        let root = SandboxRoot::new("/data/app");
        assert_eq!(root.resolve("../x"), Path::new("/data/app/../x"));
    }

    #[test]
    fn escapes_detects_absolute_and_climbing_names() {
        assert!(SandboxRoot::escapes("/etc/passwd"));
        assert!(SandboxRoot::escapes(".."));
        assert!(SandboxRoot::escapes("../x"));
        assert!(SandboxRoot::escapes("a/../../x"));
        assert!(SandboxRoot::escapes("./../x"));
    }

    #[test]
    fn escapes_accepts_names_that_stay_inside() {
        assert!(!SandboxRoot::escapes("./a"));
        assert!(!SandboxRoot::escapes("a/b/../c"));
        assert!(!SandboxRoot::escapes("a/.."));
        assert!(!SandboxRoot::escapes("..a/b"));
        assert!(!SandboxRoot::escapes("."));
    }

    #[test]
    fn clones_share_the_path() {
        let root = SandboxRoot::from_files_dir("/data/files");
        let clone = root.clone();
        assert!(Arc::ptr_eq(&root.path, &clone.path));
        assert_eq!(clone.to_string(), "/data/files/app");
    }

    #[test]
    fn warn_is_the_default_policy() {
        assert_eq!(EscapePolicy::default(), EscapePolicy::Warn);
    }
}
