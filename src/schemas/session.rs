//! # Install Session
//!
//! Mutable state of one installation attempt. A session is created when an install is
//! requested, mutated only by the stage currently executing on the coordinating thread,
//! and dropped once it reaches a terminal stage.
//!
//! At most one session per tool id exists in the process; the `SessionGuard` held inside
//! each session enforces that and releases the slot on drop.

use crate::libs::errors::InstallError;
use crate::log_debug;
use crate::schemas::download::DownloadRequest;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

/// Pipeline stages in the order they are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Idle,
    ScanExisting,
    ResolveMetadata,
    AwaitDownload,
    Extracting,
    PostInstall,
    Installed,
    AlreadyInstalled,
    Failed,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Installed | Stage::AlreadyInstalled | Stage::Failed)
    }

    /// The stage that follows on the happy path, if any.
    fn successor(self) -> Option<Stage> {
        match self {
            Stage::Idle => Some(Stage::ScanExisting),
            Stage::ScanExisting => Some(Stage::ResolveMetadata),
            Stage::ResolveMetadata => Some(Stage::AwaitDownload),
            Stage::AwaitDownload => Some(Stage::Extracting),
            Stage::Extracting => Some(Stage::PostInstall),
            Stage::PostInstall => Some(Stage::Installed),
            Stage::Installed | Stage::AlreadyInstalled | Stage::Failed => None,
        }
    }

    /// Forward-only transition rule. Re-entering the current stage counts as a retry.
    pub fn can_advance_to(self, next: Stage) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == self
            || next == Stage::Failed
            || (self == Stage::ScanExisting && next == Stage::AlreadyInstalled)
            || self.successor() == Some(next)
    }
}

static ACTIVE_SESSIONS: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();

fn active_sessions() -> &'static Mutex<HashSet<String>> {
    ACTIVE_SESSIONS.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Claims the per-tool session slot until dropped.
#[derive(Debug)]
pub struct SessionGuard {
    tool_id: String,
}

impl SessionGuard {
    pub fn acquire(tool_id: &str) -> Result<Self, InstallError> {
        let mut active = active_sessions()
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !active.insert(tool_id.to_string()) {
            return Err(InstallError::SessionActive(tool_id.to_string()));
        }
        Ok(Self { tool_id: tool_id.to_string() })
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let mut active = active_sessions()
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        active.remove(&self.tool_id);
    }
}

/// Per-run state of an installation.
#[derive(Debug)]
pub struct InstallSession {
    pub tool_id: String,
    stage: Stage,
    /// Archive requests produced by the resolver.
    pub download_requests: Vec<DownloadRequest>,
    /// Version discovered by the resolver or read from an existing install.
    pub version: Option<String>,
    pub install_path: PathBuf,
    /// Diagnostic of the failure that ended the session.
    pub error: Option<String>,
    /// Outcome of the group helper, when it had to run.
    pub elevated: Option<bool>,
    _guard: SessionGuard,
}

impl InstallSession {
    pub fn begin(tool_id: &str, install_path: PathBuf) -> Result<Self, InstallError> {
        let guard = SessionGuard::acquire(tool_id)?;
        Ok(Self {
            tool_id: tool_id.to_string(),
            stage: Stage::Idle,
            download_requests: Vec::new(),
            version: None,
            install_path,
            error: None,
            elevated: None,
            _guard: guard,
        })
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn advance(&mut self, next: Stage) -> Result<(), InstallError> {
        if !self.stage.can_advance_to(next) {
            return Err(InstallError::InvalidTransition { from: self.stage, to: next });
        }
        log_debug!("[SI::Session] {}: {:?} -> {:?}", self.tool_id, self.stage, next);
        self.stage = next;
        Ok(())
    }

    /// Moves to `Failed` and records the diagnostic. No-op once terminal.
    pub fn fail(&mut self, error: &InstallError) {
        if self.stage.is_terminal() {
            return;
        }
        log_debug!("[SI::Session] {}: {:?} -> Failed", self.tool_id, self.stage);
        self.stage = Stage::Failed;
        self.error = Some(error.to_string());
    }
}
