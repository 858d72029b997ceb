//! Digest computation and comparison for downloaded archives.
//!
//! Digests are computed incrementally while bytes stream in (`Digester`) and compared
//! case-insensitively against the vendor-published value.

use crate::libs::errors::DownloadError;
use crate::log_debug;
use crate::schemas::download::{Checksum, ChecksumType};
use sha2::{Digest, Sha256};
use std::io::{self, Write};

/// Incremental hasher for one of the supported algorithms.
pub enum Digester {
    Md5(md5::Context),
    Sha256(Sha256),
}

impl Digester {
    pub fn new(kind: ChecksumType) -> Self {
        match kind {
            ChecksumType::Md5 => Digester::Md5(md5::Context::new()),
            ChecksumType::Sha256 => Digester::Sha256(Sha256::new()),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            Digester::Md5(ctx) => ctx.consume(data),
            Digester::Sha256(hasher) => hasher.update(data),
        }
    }

    /// Lowercase hex digest.
    pub fn finalize(self) -> String {
        match self {
            Digester::Md5(ctx) => format!("{:x}", ctx.compute()),
            Digester::Sha256(hasher) => hex::encode(hasher.finalize()),
        }
    }
}

/// Lowercase hex digest of `bytes`.
pub fn digest_hex(kind: ChecksumType, bytes: &[u8]) -> String {
    let mut digester = Digester::new(kind);
    digester.update(bytes);
    digester.finalize()
}

/// Compares a computed digest against the expected one, ignoring case and surrounding whitespace.
pub fn verify_digest(expected: &Checksum, actual: &str) -> Result<(), DownloadError> {
    if expected.digest.trim().eq_ignore_ascii_case(actual.trim()) {
        log_debug!("[SI::Checksum] {} digest {} verified", expected.kind, actual);
        Ok(())
    } else {
        Err(DownloadError::ChecksumMismatch {
            algorithm: expected.kind,
            expected: expected.digest.trim().to_string(),
            actual: actual.trim().to_string(),
        })
    }
}

/// Write adapter that feeds every byte through an optional digester on its way to `inner`.
pub struct HashingWriter<W: Write> {
    inner: W,
    digester: Option<Digester>,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W, kind: Option<ChecksumType>) -> Self {
        Self { inner, digester: kind.map(Digester::new) }
    }

    /// Returns the wrapped writer and the finished digest, if one was being computed.
    pub fn into_parts(self) -> (W, Option<String>) {
        (self.inner, self.digester.map(Digester::finalize))
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        if let Some(digester) = self.digester.as_mut() {
            digester.update(&buf[..written]);
        }
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
