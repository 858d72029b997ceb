//! NetBeans resolver.
//!
//! The zip download page names the current release in a script variable; that release's
//! `files.js` lists every bundle with its MD5. A flavour (`cpp`, `php`, ...) selects the
//! bundle; the empty flavour is the full distribution.

use super::{ResolveStep, Resolved, ResolverKind, ToolDefinition, page_text, take_page};
use crate::libs::errors::InstallError;
use crate::libs::html::pattern;
use crate::schemas::download::{Checksum, DownloadRequest};
use crate::schemas::install_spec::{Arch, InstallSpec, LauncherSpec, strings};
use crate::{log_debug, log_info, log_warn};

pub const DOWNLOAD_PAGE: &str = "https://netbeans.org/downloads/zip.html";
const BASE_URL: &str = "http://download.netbeans.org/netbeans/";
const FALLBACK_VERSION: &str = "8.0.2";

pub fn definition(flavour: &str) -> ToolDefinition {
    let suffix = flavour_suffix(flavour);
    ToolDefinition {
        spec: InstallSpec {
            id: format!("netbeans{suffix}"),
            name: "Netbeans".to_string(),
            description: "Netbeans IDE".to_string(),
            only_on_archs: vec![Arch::I386, Arch::Amd64],
            install_dir_template: "ide/{id}".to_string(),
            dir_to_decompress_in_tarball: "*".to_string(),
            desktop_filename: format!("netbeans{suffix}.desktop"),
            packages_requirements: strings(&["openjdk-7-jdk", "jayatana"]),
            required_files: strings(&["bin/netbeans"]),
            required_group: None,
            version_file: None,
            launcher: LauncherSpec {
                name: "Netbeans IDE".to_string(),
                icon: "nb/netbeans.png".to_string(),
                exec: "bin/netbeans".to_string(),
                exec_args: None,
                comment: "Netbeans IDE".to_string(),
                categories: "Development;IDE;".to_string(),
            },
        },
        resolver: ResolverKind::NetBeans {
            download_page: DOWNLOAD_PAGE.to_string(),
            flavour: flavour.to_string(),
        },
    }
}

/// `cpp` becomes `-cpp`; the full distribution has no suffix.
fn flavour_suffix(flavour: &str) -> String {
    if flavour.is_empty() { String::new() } else { format!("-{flavour}") }
}

fn files_js_url(version: &str) -> String {
    format!("https://netbeans.org/images_www/v6/download/{version}/js/files.js")
}

/// Release named by `PAGE_ARTIFACTS_LOCATION`, falling back to a known release when absent.
fn scrape_version(page_url: &str, body: &str) -> Result<String, InstallError> {
    let location = pattern(
        page_url,
        r#"PAGE_ARTIFACTS_LOCATION\s*=\s*"/images_www/v6/download/([^"/]+)/?""#,
    )?;
    let mut versions: Vec<String> = location
        .captures_iter(body)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()))
        .collect();
    versions.sort();
    versions.dedup();

    match versions.len() {
        0 => {
            log_warn!(
                "[SI::Resolver::NetBeans] Could not determine latest version, using version {} as fallback...",
                FALLBACK_VERSION
            );
            Ok(FALLBACK_VERSION.to_string())
        }
        1 => Ok(versions.remove(0)),
        _ => Err(InstallError::parse(page_url, "the release version (ambiguous)")),
    }
}

/// Archive path and MD5 of the bundle for `flavour` in a release's `files.js`.
fn find_bundle(files_url: &str, body: &str, version: &str, flavour: &str) -> Result<(String, String), InstallError> {
    let entry = pattern(
        files_url,
        &format!(
            r#"(?m)^\s*add_file\("(zip/netbeans-{}-[0-9]{{12}}{}\.zip)"((?:\s*,\s*"[^"]*")*)\s*\);?"#,
            regex::escape(version),
            regex::escape(&flavour_suffix(flavour))
        ),
    )?;

    let mut bundles: Vec<(String, String)> = Vec::new();
    for caps in entry.captures_iter(body) {
        let (Some(path), Some(rest)) = (caps.get(1), caps.get(2)) else { continue };
        // Remaining arguments are size, then MD5.
        let args: Vec<&str> = rest
            .as_str()
            .split(',')
            .map(|arg| arg.trim().trim_matches('"'))
            .filter(|arg| !arg.is_empty())
            .collect();
        if let Some(md5) = args.get(1) {
            let bundle = (path.as_str().to_string(), md5.to_string());
            if !bundles.contains(&bundle) {
                bundles.push(bundle);
            }
        }
    }

    match bundles.len() {
        1 => Ok(bundles.remove(0)),
        0 => Err(InstallError::parse(files_url, format!("the netbeans{} bundle", flavour_suffix(flavour)))),
        n => Err(InstallError::parse(
            files_url,
            format!("the netbeans{} bundle (ambiguous, {n} matches)", flavour_suffix(flavour)),
        )),
    }
}

pub fn start(download_page: &str, flavour: &str) -> ResolveStep {
    let page_url = download_page.to_string();
    let flavour = flavour.to_string();
    log_debug!("[SI::Resolver::NetBeans] Fetching release page {}", page_url);

    ResolveStep::fetch(vec![DownloadRequest::page(page_url.clone())], move |mut batch| {
        let page = take_page(&mut batch, &page_url)?;
        let version = scrape_version(&page_url, &page_text(&page)?)?;
        let files_url = files_js_url(&version);
        log_debug!("[SI::Resolver::NetBeans] Release {}, file index {}", version, files_url);

        Ok(ResolveStep::fetch(vec![DownloadRequest::page(files_url.clone())], move |mut batch| {
            log_info!("[SI::Resolver::NetBeans] Netbeans {}", version);
            let index = take_page(&mut batch, &files_url)?;
            let (path, md5) = find_bundle(&files_url, &page_text(&index)?, &version, &flavour)?;
            let download_url = format!("{BASE_URL}{version}/final/{path}");

            Ok(ResolveStep::Ready(Resolved {
                requests: vec![DownloadRequest::archive(download_url, Checksum::md5(md5))],
                version: Some(version),
            }))
        }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installers::tests::{batch, expect_fetch, expect_ready};
    use crate::schemas::download::DownloadResult;

    const FILES_JS: &str = r#"
add_file("zip/netbeans-8.0.2-201411181905.zip", "213 MB", "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "full");
add_file("zip/netbeans-8.0.2-201411181905-cpp.zip", "98 MB", "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb", "cpp");
add_file("zip/netbeans-8.0.2-201411181905-php.zip", "61 MB", "cccccccccccccccccccccccccccccccc", "php");
"#;

    #[test]
    fn test_version_scrape_and_fallback() {
        let body = r#"<script>var PAGE_ARTIFACTS_LOCATION = "/images_www/v6/download/8.1/";</script>"#;
        assert_eq!(scrape_version(DOWNLOAD_PAGE, body).unwrap(), "8.1");
        assert_eq!(scrape_version(DOWNLOAD_PAGE, "<html></html>").unwrap(), FALLBACK_VERSION);
    }

    #[test]
    fn test_find_bundle_by_flavour() {
        let url = files_js_url("8.0.2");
        assert_eq!(
            find_bundle(&url, FILES_JS, "8.0.2", "").unwrap(),
            ("zip/netbeans-8.0.2-201411181905.zip".to_string(), "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_string())
        );
        assert_eq!(find_bundle(&url, FILES_JS, "8.0.2", "cpp").unwrap().1, "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");
        assert!(matches!(find_bundle(&url, FILES_JS, "8.0.2", "ruby"), Err(InstallError::Parse { .. })));
        assert!(find_bundle(&url, FILES_JS, "8.1", "").is_err());
    }

    #[test]
    fn test_release_page_then_file_index() {
        let (_, then) = expect_fetch(Ok(start(DOWNLOAD_PAGE, "php")));
        let (requests, then) = expect_fetch(then(batch(vec![DownloadResult::from_bytes(
            DOWNLOAD_PAGE,
            r#"var PAGE_ARTIFACTS_LOCATION = "/images_www/v6/download/8.0.2/";"#,
        )])));
        assert_eq!(requests, vec![DownloadRequest::page(files_js_url("8.0.2"))]);

        let resolved = expect_ready(then(batch(vec![DownloadResult::from_bytes(files_js_url("8.0.2"), FILES_JS)])));
        assert_eq!(resolved.version.as_deref(), Some("8.0.2"));
        assert_eq!(
            resolved.requests,
            vec![DownloadRequest::archive(
                "http://download.netbeans.org/netbeans/8.0.2/final/zip/netbeans-8.0.2-201411181905-php.zip",
                Checksum::md5("cccccccccccccccccccccccccccccccc")
            )]
        );
    }

    #[test]
    fn test_flavoured_definition() {
        let tool = definition("cpp");
        assert_eq!(tool.spec.id, "netbeans-cpp");
        assert_eq!(tool.spec.desktop_filename, "netbeans-cpp.desktop");
        assert_eq!(definition("").spec.id, "netbeans");
    }
}
