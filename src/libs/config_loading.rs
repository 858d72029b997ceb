use crate::schemas::config::AppConfig;
use crate::{log_debug, log_info};
use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::io;
use std::path::Path;

/// Loads `config.yaml` from `path`.
///
/// A missing file is not an error: every key has a default. A file that exists but cannot
/// be read or parsed is, since silently ignoring it would install somewhere unexpected.
pub fn load_app_config(path: &Path) -> Result<AppConfig> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log_debug!(
                "[SI::Config] No configuration at {}, using defaults",
                path.display().to_string().yellow()
            );
            return Ok(AppConfig::default());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", path.display()));
        }
    };

    // An empty file deserializes to `null`; treat it like a missing one.
    if contents.trim().is_empty() {
        return Ok(AppConfig::default());
    }

    let mut config: AppConfig = serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse {}; please check its YAML syntax", path.display()))?;
    config.download_workers = config.download_workers.max(1);

    log_info!("[SI::Config] Loaded configuration from {}", path.display().to_string().green());
    Ok(config)
}
