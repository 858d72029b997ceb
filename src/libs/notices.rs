// Deferred user-facing notices. The pipeline only enqueues; the command layer prints
// them once the installation has finished, successfully or not.

use crate::log_warn;
use colored::Colorize;

#[derive(Debug, Default)]
pub struct NoticeQueue {
    notices: Vec<String>,
}

impl NoticeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: impl Into<String>) {
        self.notices.push(text.into());
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.notices.iter().map(String::as_str)
    }

    /// Prints and clears every queued notice, oldest first.
    pub fn flush(&mut self) {
        for notice in self.notices.drain(..) {
            log_warn!("{}", notice.bold());
        }
    }
}
