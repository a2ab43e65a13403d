//! Filesystem effects of decoded operations.
//!
//! Everything here is blocking `std::fs` code. Async callers move it onto the
//! blocking pool.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use logging::{trace_create, trace_delete};
use protocol::Operation;
use tracing::warn;

use crate::error::ApplyError;
use crate::sandbox::{EscapePolicy, SandboxRoot};

/// Outcome of a successfully applied operation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AppliedOperation {
    /// An entry was removed, or was already absent.
    Deleted {
        /// Resolved target.
        path: PathBuf,
        /// Whether anything existed at the target.
        existed: bool,
    },
    /// A file was written.
    Created {
        /// Resolved target.
        path: PathBuf,
        /// Bytes written.
        bytes: u64,
        /// Whether an existing entry was removed first.
        replaced: bool,
    },
}

impl AppliedOperation {
    /// Returns the resolved target path.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Deleted { path, .. } | Self::Created { path, .. } => path,
        }
    }
}

/// Applies operations below a [`SandboxRoot`].
#[derive(Clone, Debug)]
pub struct FileOperationExecutor {
    root: SandboxRoot,
    escape_policy: EscapePolicy,
}

impl FileOperationExecutor {
    /// Creates an executor for `root` with the default [`EscapePolicy`].
    #[must_use]
    pub fn new(root: SandboxRoot) -> Self {
        Self {
            root,
            escape_policy: EscapePolicy::default(),
        }
    }

    /// Sets how names resolving outside the root are handled.
    #[must_use]
    pub const fn with_escape_policy(mut self, policy: EscapePolicy) -> Self {
        self.escape_policy = policy;
        self
    }

    /// Returns the sandbox root.
    #[must_use]
    pub const fn root(&self) -> &SandboxRoot {
        &self.root
    }

    /// Returns the escape policy.
    #[must_use]
    pub const fn escape_policy(&self) -> EscapePolicy {
        self.escape_policy
    }

    /// Applies `operation`.
    pub fn apply(&self, operation: &Operation) -> Result<AppliedOperation, ApplyError> {
        match operation {
            Operation::Delete { file_name } => self.apply_delete(file_name),
            Operation::Create { file_name, content } => self.apply_create(file_name, content),
        }
    }

    /// Removes the entry at `file_name`, recursing into directories.
    ///
    /// Symbolic links are removed themselves, never followed. A missing
    /// target counts as already deleted.
    pub fn apply_delete(&self, file_name: &str) -> Result<AppliedOperation, ApplyError> {
        let path = self.target(file_name)?;

        let existed = match fs::symlink_metadata(&path) {
            Ok(metadata) => {
                let (action, removed) = if metadata.is_dir() {
                    ("remove directory", fs::remove_dir_all(&path))
                } else {
                    ("remove", fs::remove_file(&path))
                };
                // Absence here means a concurrent session got there first.
                if let Err(error) = removed
                    && !is_absent(&error)
                {
                    return Err(ApplyError::delete(action, &path, error));
                }
                true
            }
            Err(error) if is_absent(&error) => false,
            Err(error) => return Err(ApplyError::delete("inspect", &path, error)),
        };

        trace_delete!(path = %path.display(), existed, "applied delete");
        Ok(AppliedOperation::Deleted { path, existed })
    }

    /// Writes `content` as the whole body of `file_name`.
    ///
    /// An existing file, link or empty directory at the target is removed
    /// first and missing parent directories are created.
    pub fn apply_create(
        &self,
        file_name: &str,
        content: &[u8],
    ) -> Result<AppliedOperation, ApplyError> {
        let path = self.target(file_name)?;

        let replaced = clear_target(&path)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|error| {
                ApplyError::write("create parent directories for", &path, error)
            })?;
        }
        fs::write(&path, content).map_err(|error| ApplyError::write("write", &path, error))?;

        let bytes = content.len() as u64;
        trace_create!(path = %path.display(), bytes, replaced, "applied create");
        Ok(AppliedOperation::Created {
            path,
            bytes,
            replaced,
        })
    }

    fn target(&self, file_name: &str) -> Result<PathBuf, ApplyError> {
        if SandboxRoot::escapes(file_name) {
            match self.escape_policy {
                EscapePolicy::Warn => warn!(
                    target: "livesync::session",
                    file_name,
                    root = %self.root,
                    "file name resolves outside the sandbox root"
                ),
                EscapePolicy::Reject => {
                    return Err(ApplyError::PathEscapesSandbox {
                        name: file_name.to_owned(),
                        root: self.root.path().to_path_buf(),
                    });
                }
            }
        }
        Ok(self.root.resolve(file_name))
    }
}

/// Whether `error` says the entry does not exist, including when an
/// ancestor of the path is not a directory.
fn is_absent(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

/// Removes whatever occupies `path` so a fresh file can be written there.
///
/// Directories are only removed when empty.
fn clear_target(path: &Path) -> Result<bool, ApplyError> {
    // Lookup failures other than absence (a parent that is a file, say)
    // surface again with a clearer action when the parents are created.
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return Ok(false);
    };

    let (action, removed) = if metadata.is_dir() {
        ("remove existing directory", fs::remove_dir(path))
    } else {
        ("remove existing file", fs::remove_file(path))
    };
    removed
        .map(|()| true)
        .map_err(|error| ApplyError::write(action, path, error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use logging::{HostLayer, MemorySink};
    use protocol::ErrorKind;
    use test_support::SandboxFixture;
    use tracing_subscriber::layer::SubscriberExt;

    fn executor(fixture: &SandboxFixture) -> FileOperationExecutor {
        FileOperationExecutor::new(SandboxRoot::new(fixture.root()))
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    #[test]
    fn delete_removes_existing_file() {
        let fixture = SandboxFixture::new().unwrap();
        fixture.write("a", b"x").unwrap();

        let applied = executor(&fixture).apply_delete("./a").unwrap();

        assert!(!fixture.exists("a"));
        assert_eq!(
            applied,
            AppliedOperation::Deleted {
                path: fixture.root().join("./a"),
                existed: true,
            }
        );
    }

    #[test]
    fn delete_removes_directory_tree() {
        let fixture = SandboxFixture::new().unwrap();
        fixture.write("dir/one.txt", b"1").unwrap();
        fixture.write("dir/sub/two.txt", b"2").unwrap();
        fixture.mkdir("dir/sub/empty").unwrap();

        executor(&fixture).apply_delete("dir").unwrap();

        assert!(!fixture.exists("dir"));
        assert!(fixture.root().is_dir());
    }

    #[test]
    fn delete_of_missing_target_succeeds() {
        let fixture = SandboxFixture::new().unwrap();
        let applied = executor(&fixture).apply_delete("missing").unwrap();
        assert!(matches!(applied, AppliedOperation::Deleted { existed: false, .. }));
    }

    #[cfg(unix)]
    #[test]
    fn delete_removes_link_not_target() {
        let fixture = SandboxFixture::new().unwrap();
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("keep.txt"), b"keep").unwrap();
        std::os::unix::fs::symlink(outside.path(), fixture.path("link")).unwrap();

        executor(&fixture).apply_delete("link").unwrap();

        assert!(!fixture.exists("link"));
        assert!(outside.path().join("keep.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn delete_below_a_file_counts_as_missing() {
        let fixture = SandboxFixture::new().unwrap();
        fixture.write("file.txt", b"x").unwrap();

        let applied = executor(&fixture).apply_delete("file.txt/child").unwrap();

        assert_eq!(
            applied,
            AppliedOperation::Deleted {
                path: fixture.path("file.txt/child"),
                existed: false,
            }
        );
        assert_eq!(fixture.read("file.txt").as_deref(), Some(&b"x"[..]));
    }

    #[cfg(unix)]
    #[test]
    fn delete_failure_names_path() {
        use std::os::unix::fs::PermissionsExt;

        let fixture = SandboxFixture::new().unwrap();
        fixture.write("locked/a.txt", b"x").unwrap();
        let locked = fixture.path("locked");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o500)).unwrap();
        // Privileged users ignore directory permissions.
        let writable = std::fs::write(locked.join("canary"), b"").is_ok();

        let result = executor(&fixture).apply_delete("locked/a.txt");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o700)).unwrap();

        if !writable {
            let err = result.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::FileDeleteFailed);
            assert_eq!(err.path(), Some(fixture.path("locked/a.txt").as_path()));
        }
    }

    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    #[test]
    fn create_writes_file_and_parents() {
        let fixture = SandboxFixture::new().unwrap();

        let applied = executor(&fixture)
            .apply_create("./nested/deeper/a.txt", b"fileContent")
            .unwrap();

        assert_eq!(
            fixture.read("nested/deeper/a.txt").as_deref(),
            Some(&b"fileContent"[..])
        );
        assert_eq!(
            applied,
            AppliedOperation::Created {
                path: fixture.root().join("./nested/deeper/a.txt"),
                bytes: 11,
                replaced: false,
            }
        );
    }

    #[test]
    fn create_replaces_longer_existing_content() {
        let fixture = SandboxFixture::new().unwrap();
        fixture.write("a.txt", b"a much longer previous body").unwrap();

        let applied = executor(&fixture).apply_create("a.txt", b"short").unwrap();

        assert_eq!(fixture.read("a.txt").as_deref(), Some(&b"short"[..]));
        assert!(matches!(applied, AppliedOperation::Created { replaced: true, .. }));
    }

    #[test]
    fn create_with_empty_content_leaves_empty_file() {
        let fixture = SandboxFixture::new().unwrap();
        executor(&fixture).apply_create("empty", b"").unwrap();
        assert_eq!(fixture.read("empty").as_deref(), Some(&b""[..]));
    }

    #[test]
    fn create_replaces_empty_directory() {
        let fixture = SandboxFixture::new().unwrap();
        fixture.mkdir("slot").unwrap();

        executor(&fixture).apply_create("slot", b"file now").unwrap();

        assert_eq!(fixture.read("slot").as_deref(), Some(&b"file now"[..]));
    }

    #[test]
    fn create_over_non_empty_directory_fails() {
        let fixture = SandboxFixture::new().unwrap();
        fixture.write("slot/inner.txt", b"x").unwrap();

        let err = executor(&fixture).apply_create("slot", b"y").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::FileWriteFailed);
        assert!(err.to_string().contains("remove existing directory"));
        assert_eq!(fixture.read("slot/inner.txt").as_deref(), Some(&b"x"[..]));
    }

    #[test]
    fn create_below_a_file_fails() {
        let fixture = SandboxFixture::new().unwrap();
        fixture.write("file.txt", b"x").unwrap();

        let err = executor(&fixture)
            .apply_create("file.txt/child", b"y")
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::FileWriteFailed);
    }

    #[cfg(unix)]
    #[test]
    fn create_replaces_link_without_touching_target() {
        let fixture = SandboxFixture::new().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let target = outside.path().join("target.txt");
        std::fs::write(&target, b"original").unwrap();
        std::os::unix::fs::symlink(&target, fixture.path("link")).unwrap();

        executor(&fixture).apply_create("link", b"replacement").unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"original");
        assert!(!fixture.path("link").is_symlink());
        assert_eq!(fixture.read("link").as_deref(), Some(&b"replacement"[..]));
    }

    // ------------------------------------------------------------------
    // Dispatch and escape policy
    // ------------------------------------------------------------------

    #[test]
    fn apply_dispatches_on_operation() {
        let fixture = SandboxFixture::new().unwrap();
        let executor = executor(&fixture);

        executor
            .apply(&Operation::create("x.txt", b"1".to_vec()))
            .unwrap();
        assert!(fixture.exists("x.txt"));

        executor.apply(&Operation::delete("x.txt")).unwrap();
        assert!(!fixture.exists("x.txt"));
    }

    #[test]
    fn warn_policy_applies_escaping_names_and_logs() {
        let fixture = SandboxFixture::new().unwrap();
        let sink = MemorySink::default();
        let subscriber = tracing_subscriber::registry().with(HostLayer::new(sink.clone()));

        tracing::subscriber::with_default(subscriber, || {
            executor(&fixture)
                .apply_create("../outside.txt", b"escaped")
                .unwrap();
        });

        assert_eq!(
            std::fs::read(fixture.files_dir().join("outside.txt")).unwrap(),
            b"escaped"
        );
        assert!(sink.contains("file name resolves outside the sandbox root"));
    }

    #[test]
    fn reject_policy_refuses_escaping_names_untouched() {
        let fixture = SandboxFixture::new().unwrap();
        let victim = fixture.files_dir().join("victim.txt");
        std::fs::write(&victim, b"safe").unwrap();
        let executor = executor(&fixture).with_escape_policy(EscapePolicy::Reject);

        let err = executor.apply_delete("../victim.txt").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathEscapesSandbox);
        assert!(victim.exists());

        let err = executor.apply_create("/tmp/abs.txt", b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathEscapesSandbox);

        executor.apply_create("inside/ok.txt", b"x").unwrap();
        assert!(fixture.exists("inside/ok.txt"));
    }
}
