//! # Application Configuration Schema (`config.yaml`)
//!
//! ```yaml
//! install_root: ~/.local/share/setup-ide
//! applications_dir: ~/.local/share/applications
//! download_workers: 4
//! http_timeout_secs: 300
//! ```
//!
//! Every key is optional; missing keys take the defaults above.

use serde::{Deserialize, Serialize};

pub const DEFAULT_INSTALL_ROOT: &str = "~/.local/share/setup-ide";
pub const DEFAULT_APPLICATIONS_DIR: &str = "~/.local/share/applications";
pub const DEFAULT_DOWNLOAD_WORKERS: usize = 4;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base directory; tools land in `<install_root>/ide/<id>`.
    pub install_root: String,
    /// Where `.desktop` launchers are written.
    pub applications_dir: String,
    /// Upper bound on concurrent fetches within one batch.
    pub download_workers: usize,
    /// Per-request timeout handed to the HTTP agent.
    pub http_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            install_root: DEFAULT_INSTALL_ROOT.to_string(),
            applications_dir: DEFAULT_APPLICATIONS_DIR.to_string(),
            download_workers: DEFAULT_DOWNLOAD_WORKERS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}
