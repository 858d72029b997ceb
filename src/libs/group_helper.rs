//! # Privilege / Group Helper
//!
//! Some tools only work once the invoking user belongs to a system group (`dialout` for
//! serial access). Changing group membership needs root, so the change happens in a
//! short-lived child process (`setup-ide add-to-group`) that raises its effective ids,
//! runs `adduser` and reports back through its exit status. The installing process
//! never changes its own privileges.

use crate::{log_debug, log_error, log_info};
use colored::Colorize;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};

const GROUP_FILE: &str = "/etc/group";

/// Group membership queries and mutation.
pub trait GroupHelper {
    fn is_member(&self, user: &str, group: &str) -> bool;

    /// Adds `user` to `group`. Returns `false` when the change was refused or failed.
    fn add_user_to_group(&self, user: &str, group: &str) -> bool;
}

/// Supplementary members of `group` listed in a `group(5)` file.
pub fn members_of(group_file: &str, group: &str) -> Vec<String> {
    group_file
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(':').collect();
            (fields.len() >= 4 && fields[0] == group).then(|| fields[3])
        })
        .flat_map(|members| members.split(','))
        .map(str::trim)
        .filter(|member| !member.is_empty())
        .map(str::to_string)
        .collect()
}

/// The user an installation is for: the one who ran `sudo` if any, else the current user.
pub fn invoking_user() -> Option<String> {
    ["SUDO_USER", "USER", "LOGNAME"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .map(|user| user.trim().to_string())
        .find(|user| !user.is_empty())
}

/// Production helper: reads `/etc/group` and spawns the elevated worker.
pub struct SubprocessGroupHelper {
    group_file: PathBuf,
}

impl SubprocessGroupHelper {
    pub fn new() -> Self {
        Self { group_file: PathBuf::from(GROUP_FILE) }
    }
}

impl Default for SubprocessGroupHelper {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupHelper for SubprocessGroupHelper {
    fn is_member(&self, user: &str, group: &str) -> bool {
        match fs::read_to_string(&self.group_file) {
            Ok(contents) => members_of(&contents, group).iter().any(|member| member == user),
            Err(e) => {
                log_debug!("[SI::GroupHelper] Can't read {}: {}", self.group_file.display(), e);
                false
            }
        }
    }

    fn add_user_to_group(&self, user: &str, group: &str) -> bool {
        let exe = match std::env::current_exe() {
            Ok(exe) => exe,
            Err(e) => {
                log_error!("[SI::GroupHelper] Can't locate own executable: {}", e);
                return false;
            }
        };

        log_info!("[SI::GroupHelper] Adding {} to group {}", user.bold(), group.bold());
        let status = Command::new(&exe)
            .args(["add-to-group", "--user", user, "--group", group])
            .stdin(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => true,
            Ok(status) => {
                log_debug!("[SI::GroupHelper] Worker exited with {}", status);
                false
            }
            Err(e) => {
                log_error!("[SI::GroupHelper] Can't start worker {}: {}", exe.display(), e);
                false
            }
        }
    }
}

/// Body of the worker process: become root, then `adduser user group`.
pub fn add_to_group_as_root(user: &str, group: &str) -> bool {
    // SAFETY: plain syscalls on the current process with no memory arguments.
    let raised = unsafe { libc::seteuid(0) == 0 && libc::setegid(0) == 0 };
    if !raised {
        log_error!(
            "[SI::GroupHelper] Couldn't raise privileges: {}",
            std::io::Error::last_os_error()
        );
        return false;
    }

    match Command::new("adduser").args([user, group]).output() {
        Ok(output) if output.status.success() => {
            log_debug!(
                "[SI::GroupHelper] Added {} to {}: {}",
                user,
                group,
                String::from_utf8_lossy(&output.stdout).trim()
            );
            true
        }
        Ok(output) => {
            log_error!(
                "[SI::GroupHelper] Couldn't add {} to {}: {}",
                user.red(),
                group.red(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            false
        }
        Err(e) => {
            log_error!("[SI::GroupHelper] Couldn't run adduser: {}", e);
            false
        }
    }
}
