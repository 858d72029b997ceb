// `setup-ide add-to-group`: the elevated worker. Its exit status is the whole protocol:
// 0 when the user was added, 1 otherwise.

use crate::libs::group_helper::add_to_group_as_root;
use crate::log_debug;

pub fn run(user: &str, group: &str) {
    log_debug!("[SI::GroupHelper] Worker started for {} / {}", user, group);
    let code = if add_to_group_as_root(user, group) { 0 } else { 1 };
    std::process::exit(code);
}
