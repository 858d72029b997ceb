//! Host architecture detection.

use crate::libs::errors::InstallError;
use crate::schemas::install_spec::Arch;

/// Machine string of the running binary (`x86_64`, `x86`, `aarch64`, ...).
pub fn detect_machine() -> String {
    std::env::consts::ARCH.to_string()
}

/// Maps `machine` onto an architecture vendors publish for.
pub fn arch_for(machine: &str) -> Result<Arch, InstallError> {
    Arch::from_machine(machine).ok_or_else(|| InstallError::UnsupportedArchitecture(machine.to_string()))
}
