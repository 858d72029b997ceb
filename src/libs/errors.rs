//! Error taxonomy for the installer pipeline.
//!
//! Every variant is unrecoverable at the stage that detects it: the pipeline moves the
//! session to `Failed` and the command layer terminates through its single abort point.

use crate::schemas::download::ChecksumType;
use crate::schemas::session::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// Per-request failure reported inside a `DownloadResult`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DownloadError {
    #[error("{0}")]
    Transport(String),

    #[error("{algorithm} checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        algorithm: ChecksumType,
        expected: String,
        actual: String,
    },
}

/// Terminal failure of an installation.
#[derive(Debug, Error)]
pub enum InstallError {
    /// Page or archive fetch failed (network, HTTP status, timeout).
    #[error("an error occurred while downloading {url}: {reason}")]
    Transport { url: String, reason: String },

    /// Expected anchor or pattern missing or ambiguous on a vendor page.
    #[error("can't parse {what} from {page}; the download page changed its syntax or is not parsable")]
    Parse { page: String, what: String },

    #[error("corrupted download {url}: {algorithm} expected {expected}, computed {actual}")]
    ChecksumMismatch {
        url: String,
        algorithm: ChecksumType,
        expected: String,
        actual: String,
    },

    #[error("extraction into {} failed: {reason}", path.display())]
    Extraction { path: PathBuf, reason: String },

    #[error("couldn't add {user} to group {group}")]
    Privilege { user: String, group: String },

    #[error("unsupported architecture: {0}")]
    UnsupportedArchitecture(String),

    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("an installation of {0} is already in progress")]
    SessionActive(String),

    #[error("invalid stage transition {from:?} -> {to:?}")]
    InvalidTransition { from: Stage, to: Stage },

    #[error("configuration error: {0}")]
    Config(String),
}

impl InstallError {
    pub fn parse(page: impl Into<String>, what: impl Into<String>) -> Self {
        InstallError::Parse { page: page.into(), what: what.into() }
    }

    /// Lifts a per-request download failure into a pipeline failure for `url`.
    pub fn from_download(url: &str, error: DownloadError) -> Self {
        match error {
            DownloadError::Transport(reason) => InstallError::Transport {
                url: url.to_string(),
                reason,
            },
            DownloadError::ChecksumMismatch { algorithm, expected, actual } => {
                InstallError::ChecksumMismatch {
                    url: url.to_string(),
                    algorithm,
                    expected,
                    actual,
                }
            }
        }
    }

    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        1
    }
}
