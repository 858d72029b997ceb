// Byte-level HTTP transport used by the download workers.
// The `Transport` trait is the seam the download center talks to; `UreqTransport`
// is the production implementation built on a shared `ureq` agent.

use crate::libs::errors::DownloadError;
use crate::log_debug;
use crate::schemas::download::{Cookie, DownloadRequest, cookie_header};
use colored::Colorize;
use std::io::{self, Write};
use std::time::Duration;

/// Transport-level facts about a completed fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchMeta {
    /// URL after following redirects.
    pub final_url: String,
    /// Cookies set by the server on the final response.
    pub cookies: Vec<Cookie>,
}

/// Fetches one request, writing the body into `sink`.
///
/// Implementations must return (with an error if need be) rather than block forever;
/// the download center waits for every worker before completing a batch.
pub trait Transport: Send + Sync {
    fn fetch(&self, request: &DownloadRequest, sink: &mut dyn Write) -> Result<FetchMeta, DownloadError>;
}

/// `ureq`-backed transport.
///
/// `timeout` bounds connecting and each individual socket read, never the whole
/// transfer: a large archive that keeps arriving is not cut off, a stalled one is.
/// The agent is built without content decoding, so bodies are the bytes on the wire.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .user_agent(concat!("setup-ide/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn fetch(&self, request: &DownloadRequest, sink: &mut dyn Write) -> Result<FetchMeta, DownloadError> {
        log_debug!("[SI::Transport] GET {}", request.url.blue());

        let mut call = self.agent.get(&request.url);
        if !request.cookies.is_empty() {
            call = call.set("Cookie", &cookie_header(&request.cookies));
        }
        // Some vendors label the tarball itself as gzip content-encoding. The body is
        // never decoded here; asking for identity also keeps proxies from re-encoding it.
        if request.ignore_encoding {
            call = call.set("Accept-Encoding", "identity");
        }

        let response = call.call().map_err(|err| match err {
            ureq::Error::Status(code, response) => DownloadError::Transport(format!(
                "HTTP {} {} from {}",
                code,
                response.status_text(),
                response.get_url()
            )),
            ureq::Error::Transport(transport) => DownloadError::Transport(transport.to_string()),
        })?;

        let final_url = response.get_url().to_string();
        let cookies = response
            .all("set-cookie")
            .into_iter()
            .filter_map(Cookie::from_set_cookie)
            .collect::<Vec<_>>();

        let mut reader = response.into_reader();
        let copied = io::copy(&mut reader, sink)
            .map_err(|e| DownloadError::Transport(format!("read error: {e}")))?;
        sink.flush()
            .map_err(|e| DownloadError::Transport(format!("write error: {e}")))?;

        log_debug!(
            "[SI::Transport] {} bytes from {} ({} cookies)",
            copied,
            final_url.green(),
            cookies.len()
        );
        Ok(FetchMeta { final_url, cookies })
    }
}
