//! Local socket addresses the listener binds to.
//!
//! Android and Linux expose an abstract socket namespace that needs no
//! filesystem entry and disappears with the process. Elsewhere, and whenever
//! a caller asks for it, a socket file is used instead.

use ::core::fmt;
use std::fs;
use std::io;
#[cfg(any(target_os = "linux", target_os = "android"))]
use std::os::unix::net as std_net;
use std::path::{Path, PathBuf};

#[cfg(target_os = "android")]
use std::os::android::net::SocketAddrExt;
#[cfg(target_os = "linux")]
use std::os::linux::net::SocketAddrExt;

use tokio::net::{UnixListener, UnixStream};

/// Suffix appended to the application id to form the endpoint name.
pub const ENDPOINT_SUFFIX: &str = "-livesync";

/// Where the listener accepts connections.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Endpoint {
    /// A name in the abstract socket namespace.
    #[cfg(any(target_os = "linux", target_os = "android"))]
    Abstract(String),
    /// A socket file on the filesystem.
    Path(PathBuf),
}

impl Endpoint {
    /// Returns the endpoint name used for `application_id`.
    #[must_use]
    pub fn name_for(application_id: &str) -> String {
        format!("{application_id}{ENDPOINT_SUFFIX}")
    }

    /// Returns the platform's default endpoint for `application_id`.
    ///
    /// That is the abstract name `<application id>-livesync` where the
    /// namespace exists, and a socket file of that name in the temporary
    /// directory otherwise.
    #[must_use]
    pub fn for_application(application_id: &str) -> Self {
        let name = Self::name_for(application_id);
        #[cfg(any(target_os = "linux", target_os = "android"))]
        {
            Self::Abstract(name)
        }
        #[cfg(not(any(target_os = "linux", target_os = "android")))]
        {
            Self::Path(std::env::temp_dir().join(format!("{name}.sock")))
        }
    }

    /// Returns the socket file path for filesystem endpoints.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            #[cfg(any(target_os = "linux", target_os = "android"))]
            Self::Abstract(_) => None,
            Self::Path(path) => Some(path),
        }
    }

    /// Binds a listener on this endpoint.
    ///
    /// A leftover socket file from an earlier run is removed first. Must be
    /// called from within a tokio runtime.
    pub fn bind(&self) -> io::Result<UnixListener> {
        match self {
            #[cfg(any(target_os = "linux", target_os = "android"))]
            Self::Abstract(name) => {
                let addr = std_net::SocketAddr::from_abstract_name(name.as_bytes())?;
                let listener = std_net::UnixListener::bind_addr(&addr)?;
                listener.set_nonblocking(true)?;
                UnixListener::from_std(listener)
            }
            Self::Path(path) => {
                remove_socket_file(path)?;
                UnixListener::bind(path)
            }
        }
    }

    /// Opens a client connection to this endpoint.
    pub async fn connect(&self) -> io::Result<UnixStream> {
        match self {
            #[cfg(any(target_os = "linux", target_os = "android"))]
            Self::Abstract(name) => {
                let addr = std_net::SocketAddr::from_abstract_name(name.as_bytes())?;
                let stream = std_net::UnixStream::connect_addr(&addr)?;
                stream.set_nonblocking(true)?;
                UnixStream::from_std(stream)
            }
            Self::Path(path) => UnixStream::connect(path).await,
        }
    }

    /// Removes the socket file of a filesystem endpoint, if present.
    pub fn cleanup(&self) -> io::Result<()> {
        match self.path() {
            Some(path) => remove_socket_file(path),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(any(target_os = "linux", target_os = "android"))]
            Self::Abstract(name) => write!(f, "@{name}"),
            Self::Path(path) => fmt::Display::fmt(&path.display(), f),
        }
    }
}

fn remove_socket_file(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(error) if error.kind() != io::ErrorKind::NotFound => Err(error),
        _ => Ok(()),
    }
}
