//! # Install Specification Schema
//!
//! Static, per-tool descriptors. Every registered tool owns exactly one `InstallSpec`,
//! built once at startup by the registry in `installers` and never mutated afterwards.
//!
//! ## What an `InstallSpec` answers
//!
//! - **Where** the tool lands (`install_dir_template` under the configured install root)
//! - **What** part of the archive becomes the install root (`dir_to_decompress_in_tarball`)
//! - **Whether** the tool is already present (`required_files`)
//! - **How** it is wired into the desktop (`desktop_filename`, `launcher`)
//! - **Which** extra system access it needs (`required_group`)

use std::fmt;
use std::path::{Path, PathBuf};

// ============================================================================
// ARCHITECTURES
// ============================================================================

/// CPU architectures vendors publish Linux archives for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    /// 32-bit x86 (`i386`, `i686`, Rust's `x86`).
    I386,
    /// 64-bit x86 (`x86_64`, `amd64`).
    Amd64,
}

impl Arch {
    /// Maps a machine string (as reported by `uname -m` or `std::env::consts::ARCH`)
    /// onto a supported architecture. Anything else is `None`.
    pub fn from_machine(machine: &str) -> Option<Self> {
        match machine.trim().to_lowercase().as_str() {
            "i386" | "i486" | "i586" | "i686" | "x86" => Some(Arch::I386),
            "x86_64" | "amd64" => Some(Arch::Amd64),
            _ => None,
        }
    }

    /// Word size used in vendor file names (`linux32`, `linux64`).
    pub fn bits(&self) -> &'static str {
        match self {
            Arch::I386 => "32",
            Arch::Amd64 => "64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Arch::I386 => write!(f, "i386"),
            Arch::Amd64 => write!(f, "amd64"),
        }
    }
}

// ============================================================================
// LAUNCHER DESCRIPTION
// ============================================================================

/// What the desktop launcher for an installed tool should look like.
/// Paths are relative to the tool's install directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherSpec {
    /// Display name in the application menu.
    pub name: String,
    /// Icon file, relative to the install root.
    pub icon: String,
    /// Executable, relative to the install root.
    pub exec: String,
    /// Field code appended after the quoted executable (`%f`), if any.
    pub exec_args: Option<String>,
    pub comment: String,
    pub categories: String,
}

// ============================================================================
// INSTALL SPEC
// ============================================================================

/// Immutable descriptor of one installable tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallSpec {
    /// Identifier used on the command line (`pycharm`, `eclipse`).
    pub id: String,
    /// Human name used in log lines (`PyCharm`).
    pub name: String,
    /// One-line description shown by `list`.
    pub description: String,
    /// Architectures the vendor publishes archives for.
    pub only_on_archs: Vec<Arch>,
    /// Destination relative to the install root; `{id}` is replaced by the tool id.
    pub install_dir_template: String,
    /// Glob naming the top-level archive entry that becomes the install root.
    pub dir_to_decompress_in_tarball: String,
    pub desktop_filename: String,
    /// Debian packages the tool needs at runtime.
    pub packages_requirements: Vec<String>,
    /// Files that, when all present under the install path, mean "already installed".
    pub required_files: Vec<String>,
    /// Group the invoking user must belong to for the tool to be usable.
    pub required_group: Option<String>,
    /// File whose first line carries the installed version (JetBrains `build.txt`).
    pub version_file: Option<String>,
    pub launcher: LauncherSpec,
}

impl InstallSpec {
    /// Whether the vendor ships an archive for `arch`.
    pub fn supports(&self, arch: Arch) -> bool {
        self.only_on_archs.contains(&arch)
    }

    /// Default install location for this tool below `install_root`.
    pub fn default_install_path(&self, install_root: &Path) -> PathBuf {
        install_root.join(self.install_dir_template.replace("{id}", &self.id))
    }

    /// Returns `true` only when every required file exists under `install_path`.
    /// A spec without required files is never considered installed.
    pub fn is_installed_at(&self, install_path: &Path) -> bool {
        !self.required_files.is_empty()
            && self
                .required_files
                .iter()
                .all(|file| install_path.join(file).exists())
    }

    /// Reads the installed version from `version_file`, when the tool has one.
    pub fn detect_version(&self, install_path: &Path) -> Option<String> {
        let file = self.version_file.as_ref()?;
        let contents = std::fs::read_to_string(install_path.join(file)).ok()?;
        contents
            .lines()
            .next()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
    }
}

/// Shorthand for building owned string lists in registry definitions.
pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
pub(crate) fn sample_spec(id: &str) -> InstallSpec {
    InstallSpec {
        id: id.to_string(),
        name: "Tool X".to_string(),
        description: "A sample tool".to_string(),
        only_on_archs: vec![Arch::I386, Arch::Amd64],
        install_dir_template: "ide/{id}".to_string(),
        dir_to_decompress_in_tarball: "toolx-*".to_string(),
        desktop_filename: format!("{id}.desktop"),
        packages_requirements: strings(&["openjdk-7-jdk"]),
        required_files: strings(&["toolX"]),
        required_group: None,
        version_file: None,
        launcher: LauncherSpec {
            name: "Tool X".to_string(),
            icon: "toolx.png".to_string(),
            exec: "toolX".to_string(),
            exec_args: Some("%f".to_string()),
            comment: "Tool X IDE".to_string(),
            categories: "Development;IDE;".to_string(),
        },
    }
}
