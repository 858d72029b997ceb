//! # Download Schemas
//!
//! Requests handed to the download center and the results it hands back.
//! A `DownloadRequest` is consumed exactly once; each `DownloadResult` is produced
//! once per request and is immutable afterwards.

use crate::libs::errors::DownloadError;
use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::Path;
use tempfile::NamedTempFile;

/// Digest algorithms vendors publish for their archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecksumType {
    Md5,
    Sha256,
}

impl fmt::Display for ChecksumType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChecksumType::Md5 => write!(f, "md5"),
            ChecksumType::Sha256 => write!(f, "sha256"),
        }
    }
}

/// An expected digest together with the algorithm that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    pub kind: ChecksumType,
    pub digest: String,
}

impl Checksum {
    pub fn md5(digest: impl Into<String>) -> Self {
        Self { kind: ChecksumType::Md5, digest: digest.into() }
    }

    pub fn sha256(digest: impl Into<String>) -> Self {
        Self { kind: ChecksumType::Sha256, digest: digest.into() }
    }
}

/// A single `name=value` cookie as sent in a `Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }

    /// Parses the leading `name=value` pair of a `Set-Cookie` header, dropping attributes.
    pub fn from_set_cookie(header: &str) -> Option<Self> {
        let pair = header.split(';').next()?.trim();
        let (name, value) = pair.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self::new(name, value.trim()))
    }
}

/// Renders cookies as the value of a `Cookie` request header.
pub fn cookie_header(cookies: &[Cookie]) -> String {
    cookies
        .iter()
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// One URL to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    /// When set, the fetched bytes are verified before the result is reported as success.
    pub checksum: Option<Checksum>,
    /// Replayed on the request, typically captured from a vendor's gating page.
    pub cookies: Vec<Cookie>,
    /// Ask the server for the raw bytes rather than a content-encoded body.
    pub ignore_encoding: bool,
    /// Stream the body into a temporary file instead of memory.
    pub to_disk: bool,
}

impl DownloadRequest {
    /// A small in-memory fetch (web page, checksum file).
    pub fn page(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            checksum: None,
            cookies: Vec::new(),
            ignore_encoding: false,
            to_disk: false,
        }
    }

    /// An archive fetch verified against `checksum`.
    pub fn archive(url: impl Into<String>, checksum: Checksum) -> Self {
        Self {
            checksum: Some(checksum),
            to_disk: true,
            ..Self::page(url)
        }
    }

    pub fn with_cookies(mut self, cookies: Vec<Cookie>) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn ignoring_encoding(mut self) -> Self {
        self.ignore_encoding = true;
        self
    }
}

/// Where a fetched body ended up.
#[derive(Debug)]
pub enum Payload {
    Memory(Vec<u8>),
    File(NamedTempFile),
}

impl Payload {
    /// Path of the backing file, for payloads streamed to disk.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Payload::Memory(_) => None,
            Payload::File(file) => Some(file.path()),
        }
    }

    /// Reads the whole body, decoding it lossily as UTF-8.
    pub fn text(&self) -> std::io::Result<String> {
        let bytes = match self {
            Payload::Memory(bytes) => bytes.clone(),
            Payload::File(file) => {
                let mut bytes = Vec::new();
                file.reopen()?.read_to_end(&mut bytes)?;
                bytes
            }
        };
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Outcome of one request in a batch.
#[derive(Debug)]
pub struct DownloadResult {
    /// The URL as it was requested; the batch is keyed by it.
    pub url: String,
    pub payload: Option<Payload>,
    /// The URL after following redirects.
    pub final_url: String,
    /// Cookies set by the server.
    pub cookies: Vec<Cookie>,
    pub error: Option<DownloadError>,
}

impl DownloadResult {
    pub fn failed(url: impl Into<String>, error: DownloadError) -> Self {
        let url = url.into();
        Self {
            final_url: url.clone(),
            url,
            payload: None,
            cookies: Vec::new(),
            error: Some(error),
        }
    }

    /// A successful in-memory result. Handy for feeding resolver continuations.
    pub fn from_bytes(url: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let url = url.into();
        Self {
            final_url: url.clone(),
            url,
            payload: Some(Payload::Memory(bytes.into())),
            cookies: Vec::new(),
            error: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none() && self.payload.is_some()
    }
}

/// Completed batch, keyed by the originally requested URL.
pub type BatchResult = HashMap<String, DownloadResult>;
