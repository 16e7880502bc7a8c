//! Error types shared across the sync core

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// A path byte sequence that is not valid UTF-8
#[derive(Error, Debug)]
#[error("path is not valid UTF-8: {0}")]
pub struct DecodeError(#[from] std::str::Utf8Error);

/// Configuration problems that prevent a playlist sync from starting
///
/// These are not fatal: the sync command warns and leaves all state untouched.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no playlist directory configured")]
    NoPlaylistDir,

    #[error("invalid playlist directory: '{}'", .0.display())]
    MissingPlaylistDir(PathBuf),

    #[error("invalid relative_to directory: '{}'", .0.display())]
    MissingRelativeTo(PathBuf),

    #[error("no library directory configured (required by relative_to = \"library\")")]
    NoLibraryDir,
}

/// Broad classes of remote store failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// The request never produced a response
    Transport,
    /// The service answered but refused the operation
    Rejected,
    /// The response did not have the expected shape
    Protocol,
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transport => "transport error",
            Self::Rejected => "rejected",
            Self::Protocol => "protocol error",
        };
        f.write_str(name)
    }
}

/// Failure of a single remote store operation
#[derive(Error, Debug)]
#[error("{kind}: {detail}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub detail: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn transport(detail: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Transport, detail)
    }

    pub fn rejected(detail: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Rejected, detail)
    }

    pub fn protocol(detail: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Protocol, detail)
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::protocol(err.to_string())
        } else if let Some(status) = err.status() {
            Self::rejected(format!("server returned {}", status))
        } else {
            Self::transport(err.to_string())
        }
    }
}

/// Result of a remote store operation
pub type RemoteResult<T> = Result<T, RemoteError>;
