// Data shapes shared across the crate: static tool descriptors, download
// requests/results, the per-run session and the user configuration.

pub mod config;
pub mod download;
pub mod install_spec;
pub mod session;
