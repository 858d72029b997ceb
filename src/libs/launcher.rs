//! # Desktop Launchers
//!
//! Writes freedesktop `.desktop` entries so installed tools show up in the application
//! menu. Publishing is fire-and-forget: a launcher that cannot be written is logged and
//! the installation still counts as successful.

use crate::schemas::install_spec::LauncherSpec;
use crate::{log_debug, log_info, log_warn};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

/// Fully resolved contents of one launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopEntry {
    pub name: String,
    pub icon_path: PathBuf,
    pub exec: String,
    pub comment: String,
    pub categories: String,
}

impl DesktopEntry {
    /// Resolves a tool's launcher description against its install directory.
    pub fn for_install(launcher: &LauncherSpec, install_path: &Path) -> Self {
        let executable = install_path.join(&launcher.exec);
        let exec = match &launcher.exec_args {
            Some(args) => format!("\"{}\" {}", executable.display(), args),
            None => executable.display().to_string(),
        };
        Self {
            name: launcher.name.clone(),
            icon_path: install_path.join(&launcher.icon),
            exec,
            comment: launcher.comment.clone(),
            categories: launcher.categories.clone(),
        }
    }

    pub fn render(&self) -> String {
        format!(
            "[Desktop Entry]\n\
             Version=1.0\n\
             Type=Application\n\
             Name={}\n\
             Icon={}\n\
             Exec={}\n\
             Comment={}\n\
             Categories={}\n\
             Terminal=false\n",
            self.name,
            self.icon_path.display(),
            self.exec,
            self.comment,
            self.categories
        )
    }
}

pub trait LauncherPublisher {
    fn create_launcher(&self, desktop_filename: &str, entry: &DesktopEntry);
}

/// Writes launchers into a freedesktop applications directory.
pub struct DesktopFileLauncher {
    applications_dir: PathBuf,
}

impl DesktopFileLauncher {
    pub fn new(applications_dir: PathBuf) -> Self {
        Self { applications_dir }
    }
}

impl LauncherPublisher for DesktopFileLauncher {
    fn create_launcher(&self, desktop_filename: &str, entry: &DesktopEntry) {
        let target = self.applications_dir.join(desktop_filename);
        let written = fs::create_dir_all(&self.applications_dir)
            .and_then(|_| fs::write(&target, entry.render()));
        match written {
            Ok(()) => {
                log_info!("[SI::Launcher] Created {}", target.display().to_string().green());
                log_debug!("[SI::Launcher] Exec={}", entry.exec);
            }
            Err(e) => log_warn!(
                "[SI::Launcher] Could not write {}: {}",
                target.display().to_string().yellow(),
                e
            ),
        }
    }
}
