//! # Archive Extraction
//!
//! Unpacks a verified archive and moves the part of it that forms the tool's install
//! root onto the target directory.
//!
//! ## Layout handling
//!
//! Vendors wrap their payload in a versioned top-level directory (`pycharm-community-4.0.4/`).
//! The archive is unpacked into a scratch directory next to the target, the single
//! top-level entry matching the tool's root glob is picked, and it is renamed onto the
//! target. Renaming within one parent keeps the move atomic on the same filesystem.
//!
//! ## Failure handling
//!
//! A failed unpack keeps the scratch directory and names it in the error so the partial
//! tree can be inspected.

use crate::libs::errors::InstallError;
use crate::{log_debug, log_info, log_warn};
use bzip2::read::BzDecoder;
use colored::Colorize;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tar::Archive;
use tempfile::TempDir;
use xz2::read::XzDecoder;
use zip::ZipArchive;

/// Unpacks `archive` so that its root entry lands at `destination`.
///
/// `source_url` is only a naming hint for format detection; downloaded archives live in
/// temporary files without a meaningful extension.
pub trait Extractor {
    fn extract(&self, archive: &Path, source_url: &str, destination: &Path, root_pattern: &str)
    -> Result<(), InstallError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    TarXz,
    TarBz2,
    Tar,
    Zip,
}

// Longest suffixes first so `.tar.gz` wins over `.tar`.
const NAME_SUFFIXES: &[(&str, ArchiveFormat)] = &[
    (".tar.gz", ArchiveFormat::TarGz),
    (".tgz", ArchiveFormat::TarGz),
    (".tar.xz", ArchiveFormat::TarXz),
    (".txz", ArchiveFormat::TarXz),
    (".tar.bz2", ArchiveFormat::TarBz2),
    (".tbz2", ArchiveFormat::TarBz2),
    (".tbz", ArchiveFormat::TarBz2),
    (".zip", ArchiveFormat::Zip),
    (".tar", ArchiveFormat::Tar),
];

/// Format named by a file name or URL. Vendor URLs often carry the file name in a query
/// parameter (`download.php?file=/x/tool.tar.gz&r=1`), so a suffix may also be followed
/// by a query or fragment delimiter.
pub fn format_from_name(name: &str) -> Option<ArchiveFormat> {
    let lower = name.to_lowercase();
    NAME_SUFFIXES.iter().find_map(|(suffix, format)| {
        let found = lower.match_indices(suffix).any(|(at, _)| {
            matches!(lower[at + suffix.len()..].chars().next(), None | Some('&' | '?' | '#' | ';'))
        });
        found.then_some(*format)
    })
}

/// Format recognised from the leading bytes of the file.
pub fn format_from_magic(path: &Path) -> io::Result<Option<ArchiveFormat>> {
    let mut header = Vec::with_capacity(512);
    File::open(path)?.take(512).read_to_end(&mut header)?;

    let format = if header.starts_with(&[0x1f, 0x8b]) {
        Some(ArchiveFormat::TarGz)
    } else if header.starts_with(&[0xfd, b'7', b'z', b'X', b'Z', 0x00]) {
        Some(ArchiveFormat::TarXz)
    } else if header.starts_with(b"BZh") {
        Some(ArchiveFormat::TarBz2)
    } else if header.starts_with(b"PK\x03\x04") {
        Some(ArchiveFormat::Zip)
    } else if header.len() >= 262 && &header[257..262] == b"ustar" {
        Some(ArchiveFormat::Tar)
    } else {
        None
    };
    Ok(format)
}

fn unpack(archive: &Path, format: ArchiveFormat, into: &Path) -> io::Result<()> {
    let file = File::open(archive)?;
    match format {
        ArchiveFormat::TarGz => Archive::new(GzDecoder::new(file)).unpack(into),
        ArchiveFormat::TarXz => Archive::new(XzDecoder::new(file)).unpack(into),
        ArchiveFormat::TarBz2 => Archive::new(BzDecoder::new(file)).unpack(into),
        ArchiveFormat::Tar => Archive::new(file).unpack(into),
        ArchiveFormat::Zip => {
            let mut zip = ZipArchive::new(file).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            zip.extract(into).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
        }
    }
}

/// The only top-level entry of `dir` whose name matches `root_pattern`.
fn select_root(dir: &Path, root_pattern: &str) -> Result<PathBuf, String> {
    let pattern = glob::Pattern::new(root_pattern).map_err(|e| format!("bad archive root '{root_pattern}': {e}"))?;
    let mut matches = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| e.to_string())? {
        let entry = entry.map_err(|e| e.to_string())?;
        if pattern.matches(&entry.file_name().to_string_lossy()) {
            matches.push(entry.path());
        }
    }
    match matches.len() {
        1 => Ok(matches.remove(0)),
        0 => Err(format!("no top-level entry matches '{root_pattern}'")),
        n => Err(format!("{n} top-level entries match '{root_pattern}'")),
    }
}

/// Keeps the scratch directory on disk and reports it.
fn keep_for_diagnosis(scratch: TempDir, reason: String) -> InstallError {
    #[allow(deprecated)]
    let path = scratch.into_path();
    log_warn!("[SI::Extract] Leaving {} in place for inspection", path.display().to_string().yellow());
    InstallError::Extraction { path, reason }
}

/// Production extractor for the tar and zip families.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArchiveExtractor;

impl Extractor for ArchiveExtractor {
    fn extract(&self, archive: &Path, source_url: &str, destination: &Path, root_pattern: &str)
    -> Result<(), InstallError> {
        let extraction_error = |path: &Path, reason: String| InstallError::Extraction {
            path: path.to_path_buf(),
            reason,
        };

        let format = match format_from_name(source_url) {
            Some(format) => format,
            None => format_from_magic(archive)
                .map_err(|e| extraction_error(archive, e.to_string()))?
                .ok_or_else(|| extraction_error(archive, "unrecognised archive format".to_string()))?,
        };
        log_debug!("[SI::Extract] {} is {:?}", source_url, format);

        let parent = destination
            .parent()
            .ok_or_else(|| extraction_error(destination, "target has no parent directory".to_string()))?;
        fs::create_dir_all(parent).map_err(|e| extraction_error(parent, e.to_string()))?;
        let scratch = tempfile::Builder::new()
            .prefix(".setup-ide-")
            .tempdir_in(parent)
            .map_err(|e| extraction_error(parent, e.to_string()))?;

        log_info!(
            "[SI::Extract] Unpacking into {}",
            destination.display().to_string().cyan()
        );
        if let Err(e) = unpack(archive, format, scratch.path()) {
            return Err(keep_for_diagnosis(scratch, format!("{format:?} unpack failed: {e}")));
        }

        let root = match select_root(scratch.path(), root_pattern) {
            Ok(root) => root,
            Err(reason) => return Err(keep_for_diagnosis(scratch, reason)),
        };

        if destination.exists() {
            log_warn!(
                "[SI::Extract] Replacing incomplete install at {}",
                destination.display().to_string().yellow()
            );
            fs::remove_dir_all(destination).map_err(|e| extraction_error(destination, e.to_string()))?;
        }
        fs::rename(&root, destination).map_err(|e| extraction_error(destination, e.to_string()))?;
        log_debug!("[SI::Extract] {} -> {}", root.display(), destination.display());
        Ok(())
    }
}
