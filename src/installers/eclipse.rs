//! Eclipse (Luna) resolver.
//!
//! The archive URL is a fixed template keyed by architecture. Its MD5 sidecar is fetched
//! first so the archive request carries the digest it will be verified against.

use super::{ResolveStep, Resolved, ResolverKind, ToolDefinition, page_text, take_page};
use crate::libs::html::first_token;
use crate::log_debug;
use crate::schemas::download::{Checksum, DownloadRequest};
use crate::schemas::install_spec::{Arch, InstallSpec, LauncherSpec, strings};

const DOWNLOAD_URL_PATTERN: &str = "https://www.eclipse.org/downloads/download.php?\
file=/technology/epp/downloads/release/luna/R/\
eclipse-standard-luna-R-linux-gtk{arch}.tar.gz{suf}&r=1";

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        spec: InstallSpec {
            id: "eclipse".to_string(),
            name: "Eclipse".to_string(),
            description: "Pure Eclipse Luna (4.4)".to_string(),
            only_on_archs: vec![Arch::I386, Arch::Amd64],
            install_dir_template: "ide/{id}".to_string(),
            dir_to_decompress_in_tarball: "eclipse".to_string(),
            desktop_filename: "eclipse.desktop".to_string(),
            packages_requirements: strings(&["openjdk-7-jdk"]),
            required_files: strings(&["eclipse"]),
            required_group: None,
            version_file: None,
            launcher: LauncherSpec {
                name: "Eclipse Luna".to_string(),
                icon: "icon.xpm".to_string(),
                exec: "eclipse".to_string(),
                exec_args: Some("%f".to_string()),
                comment: "The Eclipse Luna Integrated Development Environment".to_string(),
                categories: "Development;IDE;".to_string(),
            },
        },
        resolver: ResolverKind::Eclipse,
    }
}

/// Archive URL for `arch`, or its checksum sidecar when `suffix` is `.md5`.
fn archive_url(arch: Arch, suffix: &str) -> String {
    let arch_part = match arch {
        Arch::I386 => "",
        Arch::Amd64 => "-x86_64",
    };
    DOWNLOAD_URL_PATTERN
        .replace("{arch}", arch_part)
        .replace("{suf}", suffix)
}

pub fn start(arch: Arch) -> ResolveStep {
    let md5_url = archive_url(arch, ".md5");
    log_debug!("[SI::Resolver::Eclipse] Fetching MD5 from {}", md5_url);

    ResolveStep::fetch(vec![DownloadRequest::page(md5_url.clone())], move |mut batch| {
        let result = take_page(&mut batch, &md5_url)?;
        let md5 = first_token(&page_text(&result)?, &md5_url)?;
        log_debug!("[SI::Resolver::Eclipse] Downloaded MD5 is {}", md5);

        Ok(ResolveStep::Ready(Resolved {
            requests: vec![DownloadRequest::archive(archive_url(arch, ""), Checksum::md5(md5))],
            version: None,
        }))
    })
}
