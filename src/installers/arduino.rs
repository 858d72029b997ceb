//! Arduino IDE resolver.
//!
//! The software page links a "contribute" gating page for each archive plus a checksum
//! list. Both are fetched together; the gating page's `JUST DOWNLOAD` button points at the
//! real archive, and the cookies it set must be replayed when fetching it.
//!
//! Using the board over USB needs membership of the `dialout` group.

use super::{ResolveStep, Resolved, ResolverKind, ToolDefinition, page_text, take_page};
use crate::libs::html::{
    anchor_href_by_text_matching, anchor_href_matching, button_parent_href, pattern, resolve_href,
    single_match,
};
use crate::schemas::download::{Checksum, DownloadRequest};
use crate::schemas::install_spec::{Arch, InstallSpec, LauncherSpec, strings};
use crate::{log_debug, log_info};

pub const DOWNLOAD_PAGE: &str = "http://www.arduino.cc/en/Main/Software";
pub const ARDUINO_GROUP: &str = "dialout";

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        spec: InstallSpec {
            id: "arduino".to_string(),
            name: "Arduino".to_string(),
            description: "The Arduino Software Distribution".to_string(),
            only_on_archs: vec![Arch::I386, Arch::Amd64],
            install_dir_template: "ide/{id}".to_string(),
            dir_to_decompress_in_tarball: "arduino-*".to_string(),
            desktop_filename: "arduino.desktop".to_string(),
            packages_requirements: strings(&["openjdk-7-jdk", "jayatana", "gcc-avr", "avr-libc"]),
            required_files: strings(&["arduino"]),
            required_group: Some(ARDUINO_GROUP.to_string()),
            version_file: None,
            launcher: LauncherSpec {
                name: "Arduino".to_string(),
                icon: "lib/arduino_icon.ico".to_string(),
                exec: "arduino".to_string(),
                exec_args: Some("%f".to_string()),
                comment: "The Arduino Software IDE".to_string(),
                categories: "Development;IDE;".to_string(),
            },
        },
        resolver: ResolverKind::Arduino { download_page: DOWNLOAD_PAGE.to_string() },
    }
}

/// Release archive name for `arch`; nightly builds do not match.
fn archive_name_pattern(arch: Arch) -> String {
    format!(r"arduino-([\d\.\-r]+)-linux{}\.tar\.xz", arch.bits())
}

pub fn start(download_page: &str, arch: Arch) -> ResolveStep {
    let page_url = download_page.to_string();
    log_debug!("[SI::Resolver::Arduino] Parse download metadata from {}", page_url);

    ResolveStep::fetch(vec![DownloadRequest::page(page_url.clone())], move |mut batch| {
        let page = take_page(&mut batch, &page_url)?;
        let body = page_text(&page)?;

        let archive_link = pattern(&page_url, &format!("{}$", archive_name_pattern(arch)))?;
        let gate_href = anchor_href_matching(&body, &page_url, &archive_link)?;
        let checksums_href = anchor_href_by_text_matching(&body, &page_url, &pattern(&page_url, "Checksums")?)?;

        let version = archive_link
            .captures(&gate_href)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());
        let gate_url = resolve_href(&page.final_url, &gate_href)?;
        let checksum_url = resolve_href(&page.final_url, &checksums_href)?;
        log_debug!("[SI::Resolver::Arduino] Gate page {}, checksums {}", gate_url, checksum_url);

        let requests = vec![DownloadRequest::page(gate_url.clone()), DownloadRequest::page(checksum_url.clone())];
        Ok(ResolveStep::fetch(requests, move |mut batch| {
            let gate = take_page(&mut batch, &gate_url)?;
            let checksums = take_page(&mut batch, &checksum_url)?;

            let checksum_line = pattern(
                &checksum_url,
                &format!(r"(?m)^(\S+)\s+{}[ \t\r]*$", archive_name_pattern(arch)),
            )?;
            let checksums_text = page_text(&checksums)?;
            let digests = checksum_line
                .captures_iter(&checksums_text)
                .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
                .collect();
            let md5 = single_match(&checksum_url, "the archive checksum", digests)?;

            let button = pattern(&gate_url, "JUST DOWNLOAD")?;
            let href = button_parent_href(&page_text(&gate)?, &gate_url, &button)?;
            let download_url = resolve_href(&gate.final_url, &href)?;
            log_info!(
                "[SI::Resolver::Arduino] Final download url: {}, {} cookie(s)",
                download_url,
                gate.cookies.len()
            );

            Ok(ResolveStep::Ready(Resolved {
                requests: vec![DownloadRequest::archive(download_url, Checksum::md5(md5)).with_cookies(gate.cookies)],
                version,
            }))
        }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installers::tests::{batch, expect_fetch, expect_ready};
    use crate::libs::errors::InstallError;
    use crate::schemas::download::{Cookie, DownloadResult};

    const PAGE: &str = "http://www.vendor.test/en/Main/Software";

    const SOFTWARE_PAGE: &str = r#"<html><body>
        <a href="//vendor.test/en/Main/Donate?f=arduino-nightly-linux64.tar.xz">Nightly</a>
        <a href="//vendor.test/en/Main/Donate?f=arduino-1.6.0-linux64.tar.xz">Linux 64 bits</a>
        <a href="//vendor.test/en/Main/Donate?f=arduino-1.6.0-linux32.tar.xz">Linux 32 bits</a>
        <a href="//downloads.vendor.test/arduino-1.6.0.sha512sum.txt">Checksums</a>
    </body></html>"#;

    const CHECKSUMS: &str = "11111111111111111111111111111111  arduino-1.6.0-linux32.tar.xz\n\
        22222222222222222222222222222222  arduino-1.6.0-linux64.tar.xz\n\
        33333333333333333333333333333333  arduino-1.6.0-windows.zip\n";

    fn gate_page() -> DownloadResult {
        let mut gate = DownloadResult::from_bytes(
            "http://vendor.test/en/Main/Donate?f=arduino-1.6.0-linux64.tar.xz",
            r#"<a href="/download_handler.php?f=/arduino-1.6.0-linux64.tar.xz"><button>JUST DOWNLOAD</button></a>"#,
        );
        gate.final_url = "http://vendor.test/en/Main/Donate?f=arduino-1.6.0-linux64.tar.xz".to_string();
        gate.cookies = vec![Cookie::new("PHPSESSID", "abc")];
        gate
    }

    #[test]
    fn test_gated_download_carries_cookies_and_md5() {
        let (requests, then) = expect_fetch(Ok(start(PAGE, Arch::Amd64)));
        assert_eq!(requests, vec![DownloadRequest::page(PAGE)]);

        let (requests, then) = expect_fetch(then(batch(vec![DownloadResult::from_bytes(PAGE, SOFTWARE_PAGE)])));
        let urls: Vec<&str> = requests.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "http://vendor.test/en/Main/Donate?f=arduino-1.6.0-linux64.tar.xz",
                "http://downloads.vendor.test/arduino-1.6.0.sha512sum.txt",
            ]
        );

        let resolved = expect_ready(then(batch(vec![
            gate_page(),
            DownloadResult::from_bytes("http://downloads.vendor.test/arduino-1.6.0.sha512sum.txt", CHECKSUMS),
        ])));

        assert_eq!(resolved.version.as_deref(), Some("1.6.0"));
        let archive = &resolved.requests[0];
        assert_eq!(archive.url, "http://vendor.test/download_handler.php?f=/arduino-1.6.0-linux64.tar.xz");
        assert_eq!(archive.checksum, Some(Checksum::md5("22222222222222222222222222222222")));
        assert_eq!(archive.cookies, vec![Cookie::new("PHPSESSID", "abc")]);
    }

    #[test]
    fn test_missing_checksum_link_is_a_parse_error() {
        let (_, then) = expect_fetch(Ok(start(PAGE, Arch::I386)));
        let body = r#"<a href="//vendor.test/x?f=arduino-1.6.0-linux32.tar.xz">Linux 32 bits</a>"#;
        assert!(matches!(
            then(batch(vec![DownloadResult::from_bytes(PAGE, body)])),
            Err(InstallError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_checksum_line_is_a_parse_error() {
        let (_, then) = expect_fetch(Ok(start(PAGE, Arch::Amd64)));
        let (_, then) = expect_fetch(then(batch(vec![DownloadResult::from_bytes(PAGE, SOFTWARE_PAGE)])));
        let result = then(batch(vec![
            gate_page(),
            DownloadResult::from_bytes(
                "http://downloads.vendor.test/arduino-1.6.0.sha512sum.txt",
                "33333333333333333333333333333333  arduino-1.6.0-windows.zip\n",
            ),
        ]));
        assert!(matches!(result, Err(InstallError::Parse { .. })));
    }

    #[test]
    fn test_definition_requires_dialout() {
        let tool = definition();
        assert_eq!(tool.spec.required_group.as_deref(), Some("dialout"));
    }
}
