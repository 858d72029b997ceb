// `setup-ide install <tool>`: wires the production collaborators into the installer
// pipeline and reports the outcome. Every failure leaves through `abort`.

use crate::installers;
use crate::libs::config_loading::load_app_config;
use crate::libs::download_center::DownloadCenter;
use crate::libs::errors::InstallError;
use crate::libs::extraction::ArchiveExtractor;
use crate::libs::group_helper::{SubprocessGroupHelper, invoking_user};
use crate::libs::launcher::DesktopFileLauncher;
use crate::libs::notices::NoticeQueue;
use crate::libs::paths::{expand_path, resolve_config_path, tool_install_path};
use crate::libs::pipeline::{Collaborators, Outcome, Pipeline, PipelineOptions};
use crate::libs::platform::detect_machine;
use crate::libs::system_packages::DpkgProbe;
use crate::libs::transport::UreqTransport;
use crate::{log_debug, log_error, log_info};
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;

/// The single exit point for failed installs: one diagnostic, pending notices, status 1.
fn abort(error: &InstallError, notices: &mut NoticeQueue) -> ! {
    log_error!("{}", error);
    notices.flush();
    std::process::exit(error.exit_code());
}

pub fn run(tool: &str, path: Option<&str>, config: Option<&str>) {
    let mut early_notices = NoticeQueue::new();

    let definition = match installers::find(tool) {
        Ok(definition) => definition,
        Err(e) => abort(&e, &mut early_notices),
    };
    let config = match load_app_config(&resolve_config_path(config)) {
        Ok(config) => config,
        Err(e) => abort(&InstallError::Config(format!("{e:#}")), &mut early_notices),
    };
    log_debug!("[SI::Install] Effective configuration: {:?}", config);

    let transport = UreqTransport::new(Duration::from_secs(config.http_timeout_secs));
    let collaborators = Collaborators {
        extractor: Box::new(ArchiveExtractor),
        launcher: Box::new(DesktopFileLauncher::new(expand_path(&config.applications_dir))),
        group_helper: Box::new(SubprocessGroupHelper::new()),
        packages: Box::new(DpkgProbe),
    };
    let center = DownloadCenter::new(Arc::new(transport), config.download_workers);
    log_debug!("[SI::Install] Using up to {} download worker(s)", center.workers());
    let mut pipeline = Pipeline::new(center, collaborators);
    let options = PipelineOptions {
        install_path: tool_install_path(&definition.spec, &config, path),
        machine: detect_machine(),
        user: invoking_user(),
    };

    log_info!(
        "[SI::Install] Installing {} into {}",
        definition.spec.description.bold(),
        options.install_path.display().to_string().cyan()
    );

    match pipeline.run(&definition, &options) {
        Ok(Outcome::Installed { version, path }) => {
            log_info!(
                "[SI::Install] {} {} is ready in {}",
                definition.spec.name.bold(),
                version.unwrap_or_default().green(),
                path.display()
            );
        }
        Ok(Outcome::AlreadyInstalled { version, path }) => {
            log_info!(
                "[SI::Install] {} {} is already installed in {}",
                definition.spec.name.bold(),
                version.unwrap_or_default().green(),
                path.display()
            );
        }
        Err(e) => {
            log_debug!("[SI::Install] Pipeline stopped in {:?}", pipeline.last_stage());
            abort(&e, pipeline.notices_mut())
        }
    }
    pipeline.notices_mut().flush();
}
