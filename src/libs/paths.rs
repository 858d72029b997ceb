// Path resolution for setup-ide: where the config file lives, how configured paths are
// expanded, and where a given tool is installed.

use crate::schemas::config::AppConfig;
use crate::schemas::install_spec::InstallSpec;
use crate::log_debug;
use colored::Colorize;
use std::path::PathBuf;

/// Config file used when neither `--config` nor `SETUP_IDE_CONFIG` is set.
pub const DEFAULT_CONFIG_PATH: &str = "~/.setup-ide/config.yaml";

/// Expands `~` and `$VARS` in a configured path.
/// Unknown variables leave the path as written apart from tilde expansion.
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.into_owned()),
        Err(e) => {
            log_debug!("[SI::Paths] Could not expand '{}': {}", path, e);
            let home = || dirs::home_dir().map(|home| home.display().to_string());
            PathBuf::from(shellexpand::tilde_with_context(path, home).into_owned())
        }
    }
}

/// The config file to read: the explicit one if given, else the default location.
pub fn resolve_config_path(explicit: Option<&str>) -> PathBuf {
    let resolved = expand_path(explicit.unwrap_or(DEFAULT_CONFIG_PATH));
    log_debug!("[SI::Paths] Using configuration file {}", resolved.display().to_string().cyan());
    resolved
}

/// Where `spec` is (or will be) installed. `--path` wins over the configured install root.
pub fn tool_install_path(spec: &InstallSpec, config: &AppConfig, explicit: Option<&str>) -> PathBuf {
    match explicit {
        Some(path) => expand_path(path),
        None => spec.default_install_path(&expand_path(&config.install_root)),
    }
}
