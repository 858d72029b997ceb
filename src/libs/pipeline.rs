//! # Installer Pipeline
//!
//! Drives one installation through its stages on the calling thread:
//!
//! 1. **ScanExisting**: all required files present means `AlreadyInstalled`, no network.
//! 2. **ResolveMetadata**: architecture and dependency checks, then the tool's resolver,
//!    one download batch per step, until it yields the archive request(s).
//! 3. **AwaitDownload**: one batch for the archives; any failed or unverified item fails
//!    the install.
//! 4. **Extracting**: only reached once every archive in the batch passed its checksum.
//! 5. **PostInstall**: group membership first, then the launcher, then deferred notices.
//!
//! Download workers never see the `InstallSession`; every continuation runs here, after
//! its batch completes, so session mutation is single-threaded.

use crate::installers::{ResolveStep, Resolved, ToolDefinition};
use crate::libs::download_center::DownloadCenter;
use crate::libs::errors::InstallError;
use crate::libs::extraction::Extractor;
use crate::libs::group_helper::GroupHelper;
use crate::libs::launcher::{DesktopEntry, LauncherPublisher};
use crate::libs::notices::NoticeQueue;
use crate::libs::platform::arch_for;
use crate::libs::system_packages::PackageProbe;
use crate::schemas::download::DownloadRequest;
use crate::schemas::install_spec::{Arch, InstallSpec};
use crate::schemas::session::{InstallSession, Stage};
use crate::{log_debug, log_info, log_warn};
use colored::Colorize;
use std::path::{Path, PathBuf};

pub const LOGOUT_NOTICE: &str = "You need to logout and login again for your installation to work";

/// External collaborators the pipeline delegates side effects to.
pub struct Collaborators {
    pub extractor: Box<dyn Extractor>,
    pub launcher: Box<dyn LauncherPublisher>,
    pub group_helper: Box<dyn GroupHelper>,
    pub packages: Box<dyn PackageProbe>,
}

/// Per-run inputs.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub install_path: PathBuf,
    /// Machine string used to pick the vendor archive (`x86_64`, `i686`, ...).
    pub machine: String,
    /// User to grant group membership to, when a tool needs it.
    pub user: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Installed { version: Option<String>, path: PathBuf },
    AlreadyInstalled { version: Option<String>, path: PathBuf },
}

pub struct Pipeline {
    center: DownloadCenter,
    collaborators: Collaborators,
    notices: NoticeQueue,
    last_stage: Stage,
}

impl Pipeline {
    pub fn new(center: DownloadCenter, collaborators: Collaborators) -> Self {
        Self {
            center,
            collaborators,
            notices: NoticeQueue::new(),
            last_stage: Stage::Idle,
        }
    }

    /// Stage the most recent run ended in.
    pub fn last_stage(&self) -> Stage {
        self.last_stage
    }

    #[cfg(test)]
    pub fn notices(&self) -> &NoticeQueue {
        &self.notices
    }

    pub fn notices_mut(&mut self) -> &mut NoticeQueue {
        &mut self.notices
    }

    /// Installs `tool`. The session is discarded when this returns, whatever the outcome.
    pub fn run(&mut self, tool: &ToolDefinition, options: &PipelineOptions) -> Result<Outcome, InstallError> {
        let mut session = InstallSession::begin(&tool.spec.id, options.install_path.clone())?;
        let outcome = self.drive(tool, options, &mut session);
        if let Err(e) = &outcome {
            let stage = session.stage();
            session.fail(e);
            log_debug!(
                "[SI::Pipeline] {} failed during {:?}: {}",
                session.tool_id,
                stage,
                session.error.as_deref().unwrap_or_default()
            );
        }
        self.last_stage = session.stage();
        outcome
    }

    fn drive(
        &mut self,
        tool: &ToolDefinition,
        options: &PipelineOptions,
        session: &mut InstallSession,
    ) -> Result<Outcome, InstallError> {
        let spec = &tool.spec;

        session.advance(Stage::ScanExisting)?;
        if spec.is_installed_at(&session.install_path) {
            session.version = spec.detect_version(&session.install_path);
            session.advance(Stage::AlreadyInstalled)?;
            log_info!(
                "[SI::Pipeline] {} is already installed in {}",
                spec.name.bold(),
                session.install_path.display().to_string().green()
            );
            return Ok(Outcome::AlreadyInstalled {
                version: session.version.clone(),
                path: session.install_path.clone(),
            });
        }

        session.advance(Stage::ResolveMetadata)?;
        let arch = self.check_compatibility(spec, &options.machine)?;
        let resolved = self.resolve(tool, arch)?;
        session.version = resolved.version;
        // Archives always stream to disk so the extractor gets a path.
        session.download_requests = resolved
            .requests
            .into_iter()
            .map(|request| DownloadRequest { to_disk: true, ..request })
            .collect();

        session.advance(Stage::AwaitDownload)?;
        log_info!(
            "[SI::Pipeline] Downloading {} ({} archive(s))",
            spec.name.bold(),
            session.download_requests.len()
        );
        let mut results = self.center.fetch(session.download_requests.clone(), |results| results);

        // Nothing is extracted unless every archive in the batch arrived and verified.
        let mut archives = Vec::with_capacity(session.download_requests.len());
        for request in &session.download_requests {
            let result = crate::installers::take_page(&mut results, &request.url)?;
            match result.payload {
                Some(payload) if payload.path().is_some() => archives.push((request.url.clone(), payload)),
                _ => {
                    return Err(InstallError::Transport {
                        url: request.url.clone(),
                        reason: "archive was not written to disk".to_string(),
                    });
                }
            }
        }

        session.advance(Stage::Extracting)?;
        for (url, payload) in &archives {
            if let Some(path) = payload.path() {
                self.collaborators.extractor.extract(
                    path,
                    url,
                    &session.install_path,
                    &spec.dir_to_decompress_in_tarball,
                )?;
            }
        }
        drop(archives);

        session.advance(Stage::PostInstall)?;
        self.post_install(spec, options, session)?;
        if let Some(granted) = session.elevated {
            log_debug!("[SI::Pipeline] Group helper outcome for {}: granted={}", spec.id, granted);
        }
        if session.version.is_none() {
            session.version = spec.detect_version(&session.install_path);
        }

        session.advance(Stage::Installed)?;
        log_info!(
            "[SI::Pipeline] {} {} installed in {}",
            spec.name.bold(),
            session.version.as_deref().unwrap_or(""),
            session.install_path.display().to_string().green()
        );
        Ok(Outcome::Installed {
            version: session.version.clone(),
            path: session.install_path.clone(),
        })
    }

    /// Architecture and dependency checks that precede any network traffic.
    fn check_compatibility(&mut self, spec: &InstallSpec, machine: &str) -> Result<Arch, InstallError> {
        let arch = arch_for(machine)?;
        if !spec.supports(arch) {
            return Err(InstallError::UnsupportedArchitecture(format!(
                "{} is not available for {}",
                spec.name, arch
            )));
        }
        log_debug!("[SI::Pipeline] Installing {} for {}", spec.id, arch);

        let missing = self.collaborators.packages.missing(&spec.packages_requirements);
        if !missing.is_empty() {
            log_warn!("[SI::Pipeline] Missing system packages: {}", missing.join(", ").yellow());
            self.notices.push(format!(
                "{} needs these packages to run: {}. Install them with: sudo apt-get install {}",
                spec.name,
                missing.join(", "),
                missing.join(" ")
            ));
        }
        Ok(arch)
    }

    /// Runs the resolver, one download batch per `Fetch` step.
    fn resolve(&self, tool: &ToolDefinition, arch: Arch) -> Result<Resolved, InstallError> {
        let mut step = tool.resolver.start(arch)?;
        loop {
            match step {
                ResolveStep::Fetch { requests, then } => {
                    log_debug!("[SI::Pipeline] Resolver requested {} page(s)", requests.len());
                    step = self.center.fetch(requests, then)?;
                }
                ResolveStep::Ready(resolved) => {
                    if resolved.requests.is_empty() {
                        return Err(InstallError::parse(&tool.spec.id, "an archive to download"));
                    }
                    return Ok(resolved);
                }
            }
        }
    }

    fn post_install(
        &mut self,
        spec: &InstallSpec,
        options: &PipelineOptions,
        session: &mut InstallSession,
    ) -> Result<(), InstallError> {
        let mut needs_relogin = false;
        if let Some(group) = spec.required_group.as_deref() {
            let user = options.user.clone().ok_or_else(|| InstallError::Privilege {
                user: "<unknown>".to_string(),
                group: group.to_string(),
            })?;
            let helper = &self.collaborators.group_helper;
            if helper.is_member(&user, group) {
                log_debug!("[SI::Pipeline] {} already belongs to {}", user, group);
            } else {
                let granted = helper.add_user_to_group(&user, group);
                session.elevated = Some(granted);
                if !granted {
                    return Err(InstallError::Privilege { user, group: group.to_string() });
                }
                needs_relogin = true;
            }
        }

        publish_launcher(self.collaborators.launcher.as_ref(), spec, &session.install_path);
        if needs_relogin {
            self.notices.push(LOGOUT_NOTICE);
        }
        Ok(())
    }
}

fn publish_launcher(launcher: &dyn LauncherPublisher, spec: &InstallSpec, install_path: &Path) {
    let entry = DesktopEntry::for_install(&spec.launcher, install_path);
    launcher.create_launcher(&spec.desktop_filename, &entry);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installers::ResolverKind;
    use crate::libs::download_center::tests::FakeTransport;
    use crate::libs::checksum::digest_hex;
    use crate::schemas::download::ChecksumType;
    use crate::schemas::install_spec::sample_spec;
    use std::cell::RefCell;
    use std::fs;
    use std::rc::Rc;
    use std::sync::Arc;
    use tempfile::TempDir;

    const ARCHIVE_URL: &str = "https://x/archive.tar.gz";
    const CHECKSUM_URL: &str = "https://x/archive.tar.gz.sha256";
    const ARCHIVE_BYTES: &[u8] = b"pretend this is a tarball";

    fn page_url(id: &str) -> String {
        format!("https://vendor.test/{id}/download")
    }

    /// A JetBrains-style tool served entirely by the fake transport.
    fn tool(id: &str) -> ToolDefinition {
        ToolDefinition {
            spec: sample_spec(id),
            resolver: ResolverKind::JetBrains { download_page: page_url(id) },
        }
    }

    fn vendor(id: &str, checksum: &str) -> FakeTransport {
        FakeTransport::default()
            .with(&page_url(id), format!(r#"<html><a href="{ARCHIVE_URL}">HTTPS</a></html>"#))
            .with(CHECKSUM_URL, format!("{checksum}  archive.tar.gz\n"))
            .with(ARCHIVE_URL, ARCHIVE_BYTES)
    }

    #[derive(Clone, Default)]
    struct SpyExtractor {
        calls: Rc<RefCell<Vec<(String, PathBuf)>>>,
    }

    impl Extractor for SpyExtractor {
        fn extract(&self, archive: &Path, source_url: &str, destination: &Path, _root: &str) -> Result<(), InstallError> {
            assert_eq!(fs::read(archive).unwrap(), ARCHIVE_BYTES);
            self.calls.borrow_mut().push((source_url.to_string(), destination.to_path_buf()));
            fs::create_dir_all(destination).unwrap();
            fs::write(destination.join("toolX"), b"#!/bin/sh\n").unwrap();
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct RecordingLauncher {
        created: Rc<RefCell<Vec<(String, DesktopEntry)>>>,
    }

    impl LauncherPublisher for RecordingLauncher {
        fn create_launcher(&self, desktop_filename: &str, entry: &DesktopEntry) {
            self.created.borrow_mut().push((desktop_filename.to_string(), entry.clone()));
        }
    }

    #[derive(Clone, Default)]
    struct ScriptedGroupHelper {
        member: bool,
        grant: bool,
        requests: Rc<RefCell<Vec<(String, String)>>>,
    }

    impl GroupHelper for ScriptedGroupHelper {
        fn is_member(&self, _user: &str, _group: &str) -> bool {
            self.member
        }

        fn add_user_to_group(&self, user: &str, group: &str) -> bool {
            self.requests.borrow_mut().push((user.to_string(), group.to_string()));
            self.grant
        }
    }

    struct FixedProbe(Vec<String>);

    impl PackageProbe for FixedProbe {
        fn missing(&self, _packages: &[String]) -> Vec<String> {
            self.0.clone()
        }
    }

    struct Harness {
        transport: Arc<FakeTransport>,
        extractor: SpyExtractor,
        launcher: RecordingLauncher,
        groups: ScriptedGroupHelper,
        pipeline: Pipeline,
        temp: TempDir,
    }

    impl Harness {
        fn new(transport: FakeTransport, groups: ScriptedGroupHelper, missing: &[&str]) -> Self {
            let transport = Arc::new(transport);
            let extractor = SpyExtractor::default();
            let launcher = RecordingLauncher::default();
            let pipeline = Pipeline::new(
                DownloadCenter::new(transport.clone(), 3),
                Collaborators {
                    extractor: Box::new(extractor.clone()),
                    launcher: Box::new(launcher.clone()),
                    group_helper: Box::new(groups.clone()),
                    packages: Box::new(FixedProbe(missing.iter().map(|p| p.to_string()).collect())),
                },
            );
            Self { transport, extractor, launcher, groups, pipeline, temp: TempDir::new().unwrap() }
        }

        fn options(&self, id: &str) -> PipelineOptions {
            PipelineOptions {
                install_path: self.temp.path().join("ide").join(id),
                machine: "x86_64".to_string(),
                user: Some("alice".to_string()),
            }
        }
    }

    #[test]
    fn test_already_installed_makes_no_requests() {
        let mut h = Harness::new(vendor("pl-existing", "ignored"), ScriptedGroupHelper::default(), &[]);
        let options = h.options("pl-existing");
        fs::create_dir_all(&options.install_path).unwrap();
        fs::write(options.install_path.join("toolX"), b"").unwrap();

        let outcome = h.pipeline.run(&tool("pl-existing"), &options).unwrap();

        assert_eq!(outcome, Outcome::AlreadyInstalled { version: None, path: options.install_path.clone() });
        assert_eq!(h.pipeline.last_stage(), Stage::AlreadyInstalled);
        assert_eq!(h.transport.call_count(), 0);
        assert!(h.extractor.calls.borrow().is_empty());
    }

    #[test]
    fn test_happy_path_installs_and_publishes_launcher() {
        let digest = digest_hex(ChecksumType::Sha256, ARCHIVE_BYTES);
        let mut h = Harness::new(vendor("pl-happy", &digest), ScriptedGroupHelper::default(), &[]);
        let options = h.options("pl-happy");

        let outcome = h.pipeline.run(&tool("pl-happy"), &options).unwrap();

        assert_eq!(outcome, Outcome::Installed { version: None, path: options.install_path.clone() });
        assert_eq!(h.pipeline.last_stage(), Stage::Installed);
        assert_eq!(*h.extractor.calls.borrow(), vec![(ARCHIVE_URL.to_string(), options.install_path.clone())]);

        let created = h.launcher.created.borrow();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].0, "pl-happy.desktop");

        // Page, then checksum, then archive: three separate batches in that order.
        let urls: Vec<String> = h.transport.requested().into_iter().map(|r| r.url).collect();
        assert_eq!(urls, vec![page_url("pl-happy"), CHECKSUM_URL.to_string(), ARCHIVE_URL.to_string()]);
        let archive = h.transport.requested().pop().unwrap();
        assert!(archive.ignore_encoding);
        assert!(h.pipeline.notices().is_empty());
    }

    #[test]
    fn test_checksum_mismatch_never_extracts() {
        let mut h = Harness::new(vendor("pl-mismatch", "deadbeef"), ScriptedGroupHelper::default(), &[]);
        let options = h.options("pl-mismatch");

        let err = h.pipeline.run(&tool("pl-mismatch"), &options).unwrap_err();

        assert!(matches!(err, InstallError::ChecksumMismatch { ref expected, .. } if expected == "deadbeef"));
        assert_eq!(err.exit_code(), 1);
        assert_eq!(h.pipeline.last_stage(), Stage::Failed);
        assert!(h.extractor.calls.borrow().is_empty());
        assert!(h.launcher.created.borrow().is_empty());
        assert!(!options.install_path.exists());
    }

    #[test]
    fn test_unparsable_page_stops_before_any_archive_download() {
        let transport = FakeTransport::default().with(&page_url("pl-parse"), "<html>maintenance</html>");
        let mut h = Harness::new(transport, ScriptedGroupHelper::default(), &[]);
        let options = h.options("pl-parse");

        let err = h.pipeline.run(&tool("pl-parse"), &options).unwrap_err();

        assert!(matches!(err, InstallError::Parse { .. }));
        assert_eq!(h.transport.call_count(), 1);
        assert_eq!(h.pipeline.last_stage(), Stage::Failed);
    }

    #[test]
    fn test_refused_group_membership_aborts_before_launcher() {
        let digest = digest_hex(ChecksumType::Sha256, ARCHIVE_BYTES);
        let groups = ScriptedGroupHelper { member: false, grant: false, ..Default::default() };
        let mut h = Harness::new(vendor("pl-group-refused", &digest), groups, &[]);
        let mut definition = tool("pl-group-refused");
        definition.spec.required_group = Some("dialout".to_string());
        let options = h.options("pl-group-refused");

        let err = h.pipeline.run(&definition, &options).unwrap_err();

        assert!(matches!(err, InstallError::Privilege { ref user, ref group } if user == "alice" && group == "dialout"));
        assert_eq!(*h.groups.requests.borrow(), vec![("alice".to_string(), "dialout".to_string())]);
        assert!(h.launcher.created.borrow().is_empty());
        assert_eq!(h.pipeline.last_stage(), Stage::Failed);
    }

    #[test]
    fn test_granted_group_membership_queues_logout_notice() {
        let digest = digest_hex(ChecksumType::Sha256, ARCHIVE_BYTES);
        let groups = ScriptedGroupHelper { member: false, grant: true, ..Default::default() };
        let mut h = Harness::new(vendor("pl-group-granted", &digest), groups, &[]);
        let mut definition = tool("pl-group-granted");
        definition.spec.required_group = Some("dialout".to_string());
        let options = h.options("pl-group-granted");

        h.pipeline.run(&definition, &options).unwrap();

        assert_eq!(h.launcher.created.borrow().len(), 1);
        assert_eq!(h.pipeline.notices().iter().collect::<Vec<_>>(), vec![LOGOUT_NOTICE]);
    }

    #[test]
    fn test_existing_member_skips_helper() {
        let digest = digest_hex(ChecksumType::Sha256, ARCHIVE_BYTES);
        let groups = ScriptedGroupHelper { member: true, grant: false, ..Default::default() };
        let mut h = Harness::new(vendor("pl-group-member", &digest), groups, &[]);
        let mut definition = tool("pl-group-member");
        definition.spec.required_group = Some("dialout".to_string());
        let options = h.options("pl-group-member");

        h.pipeline.run(&definition, &options).unwrap();
        assert!(h.groups.requests.borrow().is_empty());
        assert!(h.pipeline.notices().is_empty());
    }

    #[test]
    fn test_unsupported_machine_fails_without_network() {
        let mut h = Harness::new(vendor("pl-arch", "x"), ScriptedGroupHelper::default(), &[]);
        let mut options = h.options("pl-arch");
        options.machine = "aarch64".to_string();

        let err = h.pipeline.run(&tool("pl-arch"), &options).unwrap_err();
        assert!(matches!(err, InstallError::UnsupportedArchitecture(_)));
        assert_eq!(h.transport.call_count(), 0);
    }

    #[test]
    fn test_missing_packages_become_a_notice() {
        let digest = digest_hex(ChecksumType::Sha256, ARCHIVE_BYTES);
        let mut h = Harness::new(vendor("pl-packages", &digest), ScriptedGroupHelper::default(), &["openjdk-7-jdk"]);
        let options = h.options("pl-packages");

        h.pipeline.run(&tool("pl-packages"), &options).unwrap();
        let notices: Vec<&str> = h.pipeline.notices().iter().collect();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].contains("openjdk-7-jdk"));
    }

    #[test]
    fn test_concurrent_session_for_same_tool_is_rejected() {
        let mut h = Harness::new(vendor("pl-busy", "x"), ScriptedGroupHelper::default(), &[]);
        let options = h.options("pl-busy");
        let _held = InstallSession::begin("pl-busy", options.install_path.clone()).unwrap();

        let err = h.pipeline.run(&tool("pl-busy"), &options).unwrap_err();
        assert!(matches!(err, InstallError::SessionActive(_)));
        assert_eq!(h.transport.call_count(), 0);
    }

    #[test]
    fn test_rerun_after_install_is_already_installed() {
        let digest = digest_hex(ChecksumType::Sha256, ARCHIVE_BYTES);
        let mut h = Harness::new(vendor("pl-rerun", &digest), ScriptedGroupHelper::default(), &[]);
        let options = h.options("pl-rerun");

        assert!(matches!(h.pipeline.run(&tool("pl-rerun"), &options).unwrap(), Outcome::Installed { .. }));
        let calls = h.transport.call_count();
        assert!(matches!(h.pipeline.run(&tool("pl-rerun"), &options).unwrap(), Outcome::AlreadyInstalled { .. }));
        assert_eq!(h.transport.call_count(), calls);
    }
}
