//! Listener configuration and its builder.
//!
//! Hosts normally derive everything from two values they already have, the
//! private storage directory and the application id, through
//! [`ListenerConfig::for_host`]. The builder exists for tests and for hosts
//! with a non-standard layout.

use std::path::{Path, PathBuf};

use engine::{EscapePolicy, FileOperationExecutor, SandboxRoot};
use protocol::DEFAULT_MAX_CONTENT_LENGTH;

use crate::endpoint::Endpoint;
use crate::error::ConfigError;
use crate::reload::RELOAD_SCRIPT_RELATIVE_PATH;

/// Immutable settings for a [`SyncListener`](crate::SyncListener).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ListenerConfig {
    endpoint: Endpoint,
    sandbox_root: SandboxRoot,
    reload_script: PathBuf,
    max_content_length: u64,
    escape_policy: EscapePolicy,
}

impl ListenerConfig {
    /// Creates a new [`ListenerConfigBuilder`].
    #[must_use]
    pub fn builder() -> ListenerConfigBuilder {
        ListenerConfigBuilder::default()
    }

    /// Derives the standard layout from the host's storage directory.
    ///
    /// ```
    /// use daemon::ListenerConfig;
    /// use std::path::Path;
    ///
    /// let config = ListenerConfig::for_host("/data/files", "org.example.app");
    /// assert_eq!(config.sandbox_root().path(), Path::new("/data/files/app"));
    /// assert_eq!(config.reload_script(), Path::new("/data/files/internal/livesync.js"));
    /// ```
    #[must_use]
    pub fn for_host(files_dir: impl AsRef<Path>, application_id: &str) -> Self {
        let files_dir = files_dir.as_ref();
        Self {
            endpoint: Endpoint::for_application(application_id),
            sandbox_root: SandboxRoot::from_files_dir(files_dir),
            reload_script: files_dir.join(RELOAD_SCRIPT_RELATIVE_PATH),
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            escape_policy: EscapePolicy::default(),
        }
    }

    /// Returns a builder seeded with this configuration.
    #[must_use]
    pub fn to_builder(&self) -> ListenerConfigBuilder {
        ListenerConfigBuilder {
            endpoint: Some(self.endpoint.clone()),
            sandbox_root: Some(self.sandbox_root.clone()),
            reload_script: Some(self.reload_script.clone()),
            max_content_length: self.max_content_length,
            escape_policy: self.escape_policy,
        }
    }

    /// Returns the endpoint to bind.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns the sandbox root.
    #[must_use]
    pub const fn sandbox_root(&self) -> &SandboxRoot {
        &self.sandbox_root
    }

    /// Returns the script handed to the reload trigger.
    #[must_use]
    pub fn reload_script(&self) -> &Path {
        &self.reload_script
    }

    /// Returns the largest accepted content length.
    #[must_use]
    pub const fn max_content_length(&self) -> u64 {
        self.max_content_length
    }

    /// Returns the policy for names that leave the sandbox.
    #[must_use]
    pub const fn escape_policy(&self) -> EscapePolicy {
        self.escape_policy
    }

    /// Builds the executor sessions apply operations with.
    #[must_use]
    pub fn executor(&self) -> FileOperationExecutor {
        FileOperationExecutor::new(self.sandbox_root.clone())
            .with_escape_policy(self.escape_policy)
    }
}

/// Builder used to assemble a [`ListenerConfig`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ListenerConfigBuilder {
    endpoint: Option<Endpoint>,
    sandbox_root: Option<SandboxRoot>,
    reload_script: Option<PathBuf>,
    max_content_length: u64,
    escape_policy: EscapePolicy,
}

impl Default for ListenerConfigBuilder {
    fn default() -> Self {
        Self {
            endpoint: None,
            sandbox_root: None,
            reload_script: None,
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            escape_policy: EscapePolicy::default(),
        }
    }
}

impl ListenerConfigBuilder {
    /// Sets the endpoint to bind.
    #[must_use]
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Sets the sandbox root.
    #[must_use]
    pub fn sandbox_root(mut self, root: SandboxRoot) -> Self {
        self.sandbox_root = Some(root);
        self
    }

    /// Sets the script handed to the reload trigger.
    #[must_use]
    pub fn reload_script(mut self, script: impl Into<PathBuf>) -> Self {
        self.reload_script = Some(script.into());
        self
    }

    /// Caps the content length a create may declare.
    #[must_use]
    pub const fn max_content_length(mut self, max: u64) -> Self {
        self.max_content_length = max;
        self
    }

    /// Selects how names that leave the sandbox are handled.
    #[must_use]
    pub const fn escape_policy(mut self, policy: EscapePolicy) -> Self {
        self.escape_policy = policy;
        self
    }

    /// Finalises the builder.
    pub fn build(self) -> Result<ListenerConfig, ConfigError> {
        Ok(ListenerConfig {
            endpoint: self.endpoint.ok_or(ConfigError::Missing("endpoint"))?,
            sandbox_root: self
                .sandbox_root
                .ok_or(ConfigError::Missing("sandbox root"))?,
            reload_script: self
                .reload_script
                .ok_or(ConfigError::Missing("reload script"))?,
            max_content_length: self.max_content_length,
            escape_policy: self.escape_policy,
        })
    }
}
