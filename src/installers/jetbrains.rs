//! JetBrains family resolver.
//!
//! All JetBrains products share one download flow: the "thanks" page links the tarball
//! from an anchor labelled `HTTPS`, and a `<tarball>.sha256` file sits next to it.
//! Products differ only in their page URL, archive root, executable and icon.

use super::{ResolveStep, Resolved, ResolverKind, ToolDefinition, page_text, take_page};
use crate::libs::html::{anchor_href_by_text, first_token, resolve_href};
use crate::schemas::download::{Checksum, DownloadRequest};
use crate::schemas::install_spec::{Arch, InstallSpec, LauncherSpec, strings};
use crate::{log_debug, log_info};

/// Static facts about one JetBrains product.
struct Product {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    download_page: &'static str,
    tarball_dir: &'static str,
    desktop_filename: &'static str,
    executable: &'static str,
    icon: &'static str,
}

const PRODUCTS: &[Product] = &[
    Product {
        id: "pycharm",
        name: "PyCharm",
        description: "PyCharm Community Edition",
        download_page: "https://www.jetbrains.com/pycharm/download/download_thanks.jsp?edition=comm&os=linux",
        tarball_dir: "pycharm-community-*",
        desktop_filename: "jetbrains-pycharm.desktop",
        executable: "pycharm.sh",
        icon: "pycharm.png",
    },
    Product {
        id: "pycharm-educational",
        name: "PyCharm Educational",
        description: "PyCharm Educational Edition",
        download_page: "https://www.jetbrains.com/pycharm-edu/download/download_thanks.jsp?os=linux",
        tarball_dir: "pycharm-edu*",
        desktop_filename: "jetbrains-pycharm.desktop",
        executable: "pycharm.sh",
        icon: "pycharm.png",
    },
    Product {
        id: "pycharm-professional",
        name: "PyCharm Professional",
        description: "PyCharm Professional Edition",
        download_page: "https://www.jetbrains.com/pycharm/download/download_thanks.jsp?os=linux",
        tarball_dir: "pycharm-*",
        desktop_filename: "jetbrains-pycharm.desktop",
        executable: "pycharm.sh",
        icon: "pycharm.png",
    },
    Product {
        id: "idea",
        name: "Idea",
        description: "IntelliJ IDEA Community Edition",
        download_page: "https://www.jetbrains.com/idea/download/download_thanks.jsp?edition=IC&os=linux",
        tarball_dir: "idea-IC-*",
        desktop_filename: "jetbrains-idea.desktop",
        executable: "idea.sh",
        icon: "idea.png",
    },
    Product {
        id: "idea-ultimate",
        name: "Idea Ultimate",
        description: "IntelliJ IDEA",
        download_page: "https://www.jetbrains.com/idea/download/download_thanks.jsp?edition=IU&os=linux",
        tarball_dir: "idea-IU-*",
        desktop_filename: "jetbrains-idea.desktop",
        executable: "idea.sh",
        icon: "idea.png",
    },
    Product {
        id: "rubymine",
        name: "RubyMine",
        description: "Ruby on Rails IDE",
        download_page: "https://www.jetbrains.com/ruby/download/download_thanks.jsp?os=linux",
        tarball_dir: "RubyMine-*",
        desktop_filename: "jetbrains-rubymine.desktop",
        executable: "rubymine.sh",
        icon: "rubymine.png",
    },
    Product {
        id: "webstorm",
        name: "WebStorm",
        description: "WebStorm",
        download_page: "https://www.jetbrains.com/webstorm/download/download_thanks.jsp?os=linux",
        tarball_dir: "WebStorm-*",
        desktop_filename: "jetbrains-webstorm.desktop",
        executable: "webstorm.sh",
        icon: "webide.png",
    },
    Product {
        id: "phpstorm",
        name: "PhpStorm",
        description: "PhpStorm",
        download_page: "https://www.jetbrains.com/phpstorm/download/download_thanks.jsp?os=linux",
        tarball_dir: "PhpStorm-*",
        desktop_filename: "jetbrains-phpstorm.desktop",
        executable: "phpstorm.sh",
        icon: "webide.png",
    },
];

fn definition(product: &Product) -> ToolDefinition {
    let executable = format!("bin/{}", product.executable);
    ToolDefinition {
        spec: InstallSpec {
            id: product.id.to_string(),
            name: product.name.to_string(),
            description: product.description.to_string(),
            only_on_archs: vec![Arch::I386, Arch::Amd64],
            install_dir_template: "ide/{id}".to_string(),
            dir_to_decompress_in_tarball: product.tarball_dir.to_string(),
            desktop_filename: product.desktop_filename.to_string(),
            packages_requirements: strings(&["openjdk-7-jdk", "jayatana"]),
            required_files: vec![executable.clone()],
            required_group: None,
            version_file: Some("build.txt".to_string()),
            launcher: LauncherSpec {
                name: product.description.to_string(),
                icon: format!("bin/{}", product.icon),
                exec: executable,
                exec_args: Some("%f".to_string()),
                comment: product.description.to_string(),
                categories: "Development;IDE;".to_string(),
            },
        },
        resolver: ResolverKind::JetBrains { download_page: product.download_page.to_string() },
    }
}

pub fn definitions() -> Vec<ToolDefinition> {
    PRODUCTS.iter().map(definition).collect()
}

pub fn start(download_page: &str) -> ResolveStep {
    let page_url = download_page.to_string();
    log_debug!("[SI::Resolver::JetBrains] Fetching download page {}", page_url);

    ResolveStep::fetch(vec![DownloadRequest::page(page_url.clone())], move |mut batch| {
        let page = take_page(&mut batch, &page_url)?;
        let href = anchor_href_by_text(&page_text(&page)?, &page_url, "HTTPS")?;
        let download_url = resolve_href(&page.final_url, &href)?;
        let checksum_url = format!("{download_url}.sha256");
        log_debug!("[SI::Resolver::JetBrains] Found download URL: {}", download_url);
        log_debug!("[SI::Resolver::JetBrains] Downloading checksum first, from {}", checksum_url);

        Ok(ResolveStep::fetch(vec![DownloadRequest::page(checksum_url.clone())], move |mut batch| {
            let sidecar = take_page(&mut batch, &checksum_url)?;
            let sha256 = first_token(&page_text(&sidecar)?, &checksum_url)?;
            log_info!("[SI::Resolver::JetBrains] Obtained SHA256 checksum: {}", sha256);

            Ok(ResolveStep::Ready(Resolved {
                requests: vec![DownloadRequest::archive(download_url, Checksum::sha256(sha256)).ignoring_encoding()],
                version: None,
            }))
        }))
    })
}
