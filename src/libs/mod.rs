// Building blocks behind the `install` and `list` commands.

pub mod checksum;
pub mod config_loading;
// Worker pool that fetches a batch of requests and fires one continuation.
pub mod download_center;
pub mod errors;
pub mod extraction;
pub mod group_helper;
// Fail-closed helpers for scraping vendor download pages.
pub mod html;
pub mod launcher;
pub mod notices;
pub mod paths;
// The installer state machine.
pub mod pipeline;
pub mod platform;
pub mod system_packages;
pub mod transport;
