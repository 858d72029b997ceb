// Detection of missing Debian packages a tool depends on. Installing them is left to the
// user; the pipeline only reports what is missing.

use crate::log_debug;
use std::process::Command;

pub trait PackageProbe {
    /// The subset of `packages` that is not installed.
    fn missing(&self, packages: &[String]) -> Vec<String>;
}

/// Queries `dpkg-query`. On systems without dpkg nothing is reported missing.
pub struct DpkgProbe;

impl DpkgProbe {
    fn is_installed(package: &str) -> Option<bool> {
        let output = Command::new("dpkg-query")
            .args(["-W", "-f=${Status}", package])
            .output()
            .ok()?;
        let status = String::from_utf8_lossy(&output.stdout);
        Some(output.status.success() && status.contains("install ok installed"))
    }
}

impl PackageProbe for DpkgProbe {
    fn missing(&self, packages: &[String]) -> Vec<String> {
        let mut missing = Vec::new();
        for package in packages {
            match Self::is_installed(package) {
                Some(true) => {}
                Some(false) => missing.push(package.clone()),
                None => {
                    log_debug!("[SI::Packages] dpkg-query unavailable, skipping package checks");
                    return Vec::new();
                }
            }
        }
        missing
    }
}
