//! # Tool Registry & Metadata Resolvers
//!
//! Every installable tool is a `ToolDefinition`: a static `InstallSpec` plus the resolver
//! that turns vendor pages into concrete, checksummed `DownloadRequest`s.
//!
//! ## Resolver protocol
//!
//! A resolver never performs I/O itself. It returns a `ResolveStep`:
//!
//! - `Fetch { requests, then }` asks the pipeline to download `requests` as one batch and
//!   hand the complete `BatchResult` to `then`, which produces the next step.
//! - `Ready(resolved)` carries the archive request(s) for the download stage.
//!
//! Because a continuation only exists once the previous batch has completed, nested
//! lookups (page, then checksum file, then archive) are ordered by construction.
//!
//! ## Supported tools
//!
//! - `eclipse` (templated URL per architecture, MD5 sidecar)
//! - the JetBrains family (`pycharm`, `idea`, `rubymine`, ...) sharing one resolver
//! - `arduino` (cookie-gated download, `dialout` group)
//! - `netbeans` (version scrape, then the release's file index)

pub(crate) mod arduino;
pub(crate) mod eclipse;
pub(crate) mod jetbrains;
pub(crate) mod netbeans;

use crate::libs::errors::InstallError;
use crate::schemas::download::{BatchResult, DownloadRequest, DownloadResult};
use crate::schemas::install_spec::{Arch, InstallSpec};

/// Receives a completed batch and decides what happens next.
pub type Continuation = Box<dyn FnOnce(BatchResult) -> Result<ResolveStep, InstallError>>;

pub enum ResolveStep {
    Fetch { requests: Vec<DownloadRequest>, then: Continuation },
    Ready(Resolved),
}

impl ResolveStep {
    /// Builds a `Fetch` step from a plain closure.
    pub fn fetch(
        requests: Vec<DownloadRequest>,
        then: impl FnOnce(BatchResult) -> Result<ResolveStep, InstallError> + 'static,
    ) -> Self {
        ResolveStep::Fetch { requests, then: Box::new(then) }
    }
}

/// Final output of a resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub requests: Vec<DownloadRequest>,
    pub version: Option<String>,
}

/// Which resolver a tool uses, with its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverKind {
    Eclipse,
    JetBrains { download_page: String },
    Arduino { download_page: String },
    NetBeans { download_page: String, flavour: String },
}

impl ResolverKind {
    /// First step of resolution for `arch`.
    pub fn start(&self, arch: Arch) -> Result<ResolveStep, InstallError> {
        match self {
            ResolverKind::Eclipse => Ok(eclipse::start(arch)),
            ResolverKind::JetBrains { download_page } => Ok(jetbrains::start(download_page)),
            ResolverKind::Arduino { download_page } => Ok(arduino::start(download_page, arch)),
            ResolverKind::NetBeans { download_page, flavour } => Ok(netbeans::start(download_page, flavour)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDefinition {
    pub spec: InstallSpec,
    pub resolver: ResolverKind,
}

/// Every tool this binary knows how to install, in display order.
pub fn registry() -> Vec<ToolDefinition> {
    let mut tools = vec![eclipse::definition()];
    tools.extend(jetbrains::definitions());
    tools.push(arduino::definition());
    tools.push(netbeans::definition(""));
    tools
}

/// Looks a tool up by its command-line id.
pub fn find(id: &str) -> Result<ToolDefinition, InstallError> {
    registry()
        .into_iter()
        .find(|tool| tool.spec.id == id)
        .ok_or_else(|| InstallError::UnknownTool(id.to_string()))
}

/// Removes `url`'s result from the batch. A transport error or an empty body is fatal.
pub fn take_page(batch: &mut BatchResult, url: &str) -> Result<DownloadResult, InstallError> {
    let result = batch.remove(url).ok_or_else(|| InstallError::Transport {
        url: url.to_string(),
        reason: "no result was reported".to_string(),
    })?;
    if let Some(error) = result.error.clone() {
        return Err(InstallError::from_download(url, error));
    }
    if result.payload.is_none() {
        return Err(InstallError::Transport {
            url: url.to_string(),
            reason: "empty response".to_string(),
        });
    }
    Ok(result)
}

/// Body of a fetched page as text.
pub fn page_text(result: &DownloadResult) -> Result<String, InstallError> {
    let text = match result.payload.as_ref() {
        Some(payload) => payload.text().map_err(|e| InstallError::Transport {
            url: result.url.clone(),
            reason: e.to_string(),
        })?,
        None => String::new(),
    };
    if text.trim().is_empty() {
        return Err(InstallError::Transport {
            url: result.url.clone(),
            reason: "empty response".to_string(),
        });
    }
    Ok(text)
}
