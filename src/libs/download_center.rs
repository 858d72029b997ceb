//! # Download Center
//!
//! Fetches a batch of `DownloadRequest`s concurrently and hands the whole batch back
//! to the coordinating thread once, after every request has succeeded or failed.
//!
//! ## Model
//!
//! - A bounded pool of worker threads (at most `workers`, at most one per request)
//!   pulls requests from a shared job queue.
//! - Workers never touch session state. Each sends a single completion message
//!   over an `mpsc` channel.
//! - `Batch::wait` runs on the coordinating thread and drains that channel until every
//!   submitted URL is accounted for. A worker that dies without reporting is detected
//!   through channel disconnection and its requests are reported as errors, so a batch
//!   always completes.
//! - A declared checksum is verified while the body streams in. A mismatch becomes an
//!   error result, never a retry.

use crate::libs::checksum::HashingWriter;
use crate::libs::errors::DownloadError;
use crate::libs::transport::Transport;
use crate::schemas::download::{BatchResult, DownloadRequest, DownloadResult, Payload};
use crate::{log_debug, log_info, log_warn};
use colored::Colorize;
use std::collections::{HashSet, VecDeque};
use std::io::{self, Write};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use tempfile::NamedTempFile;

pub struct DownloadCenter {
    transport: Arc<dyn Transport>,
    workers: usize,
}

impl DownloadCenter {
    pub fn new(transport: Arc<dyn Transport>, workers: usize) -> Self {
        Self { transport, workers: workers.max(1) }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Starts fetching `requests` and returns immediately.
    /// Requests sharing a URL are collapsed into the first one.
    pub fn submit(&self, requests: Vec<DownloadRequest>) -> Batch {
        let mut seen = HashSet::new();
        let mut jobs = VecDeque::new();
        for request in requests {
            if seen.insert(request.url.clone()) {
                jobs.push_back(request);
            } else {
                log_debug!("[SI::Downloads] Dropping duplicate request for {}", request.url);
            }
        }

        let pending: Vec<String> = jobs.iter().map(|r| r.url.clone()).collect();
        let (tx, rx) = mpsc::channel::<DownloadResult>();
        let worker_count = self.workers.min(jobs.len());
        log_debug!(
            "[SI::Downloads] Submitting {} request(s) to {} worker(s)",
            pending.len(),
            worker_count
        );

        let queue = Arc::new(Mutex::new(jobs));
        for id in 0..worker_count {
            let queue = Arc::clone(&queue);
            let transport = Arc::clone(&self.transport);
            let tx = tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("download-worker-{id}"))
                .spawn(move || {
                    loop {
                        let next = queue
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner())
                            .pop_front();
                        let Some(request) = next else { break };
                        let result = fetch_one(transport.as_ref(), request);
                        if tx.send(result).is_err() {
                            break;
                        }
                    }
                });
            if let Err(e) = spawned {
                log_warn!("[SI::Downloads] Could not spawn download worker: {}", e);
            }
        }
        // Only workers hold senders now; their exit disconnects the channel.
        drop(tx);

        Batch { pending, rx }
    }

    /// Fetches a batch and invokes `on_done` exactly once with the complete result,
    /// on the calling thread.
    pub fn fetch<R>(&self, requests: Vec<DownloadRequest>, on_done: impl FnOnce(BatchResult) -> R) -> R {
        let results = self.submit(requests).wait();
        on_done(results)
    }
}

/// A submitted batch that has not been collected yet.
pub struct Batch {
    pending: Vec<String>,
    rx: Receiver<DownloadResult>,
}

impl Batch {
    /// Blocks until every request in the batch has a result.
    pub fn wait(self) -> BatchResult {
        let mut results = BatchResult::with_capacity(self.pending.len());
        while results.len() < self.pending.len() {
            match self.rx.recv() {
                Ok(result) => {
                    log_debug!(
                        "[SI::Downloads] {} {}",
                        if result.is_ok() { "done".green() } else { "failed".red() },
                        result.url
                    );
                    results.insert(result.url.clone(), result);
                }
                Err(_) => break,
            }
        }

        for url in &self.pending {
            if !results.contains_key(url) {
                log_warn!("[SI::Downloads] No result reported for {}", url.yellow());
                results.insert(
                    url.clone(),
                    DownloadResult::failed(
                        url.clone(),
                        DownloadError::Transport("download worker exited without reporting".to_string()),
                    ),
                );
            }
        }
        results
    }
}

/// Body destination chosen per request.
enum Sink {
    Memory(Vec<u8>),
    File(NamedTempFile),
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::Memory(bytes) => bytes.write(buf),
            Sink::File(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Memory(_) => Ok(()),
            Sink::File(file) => file.flush(),
        }
    }
}

impl From<Sink> for Payload {
    fn from(sink: Sink) -> Self {
        match sink {
            Sink::Memory(bytes) => Payload::Memory(bytes),
            Sink::File(file) => Payload::File(file),
        }
    }
}

/// Runs one request to completion on the current worker thread.
fn fetch_one(transport: &dyn Transport, request: DownloadRequest) -> DownloadResult {
    let sink = if request.to_disk {
        match NamedTempFile::new() {
            Ok(file) => Sink::File(file),
            Err(e) => {
                return DownloadResult::failed(
                    request.url,
                    DownloadError::Transport(format!("can't create temporary file: {e}")),
                );
            }
        }
    } else {
        Sink::Memory(Vec::new())
    };

    let mut writer = HashingWriter::new(sink, request.checksum.as_ref().map(|c| c.kind));
    let meta = match transport.fetch(&request, &mut writer) {
        Ok(meta) => meta,
        Err(error) => return DownloadResult::failed(request.url, error),
    };
    let (sink, digest) = writer.into_parts();

    if let (Some(expected), Some(actual)) = (request.checksum.as_ref(), digest.as_deref()) {
        if let Err(error) = crate::libs::checksum::verify_digest(expected, actual) {
            log_warn!("[SI::Downloads] Corrupted download {}: {}", request.url.red(), error);
            return DownloadResult::failed(request.url, error);
        }
        log_info!("[SI::Downloads] Checksum for {} verified", request.url.cyan());
    }

    DownloadResult {
        final_url: if meta.final_url.is_empty() { request.url.clone() } else { meta.final_url },
        url: request.url,
        payload: Some(sink.into()),
        cookies: meta.cookies,
        error: None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::libs::transport::FetchMeta;
    use crate::schemas::download::{Checksum, Cookie};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Serves canned bodies; unknown URLs fail like a 404.
    #[derive(Default)]
    pub(crate) struct FakeTransport {
        pub(crate) bodies: HashMap<String, Vec<u8>>,
        pub(crate) cookies: HashMap<String, Vec<Cookie>>,
        pub(crate) final_urls: HashMap<String, String>,
        pub(crate) calls: Mutex<Vec<DownloadRequest>>,
        pub(crate) delay: Option<Duration>,
    }

    impl FakeTransport {
        pub(crate) fn with(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
            self.bodies.insert(url.to_string(), body.into());
            self
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub(crate) fn requested(&self) -> Vec<DownloadRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Transport for FakeTransport {
        fn fetch(&self, request: &DownloadRequest, sink: &mut dyn Write) -> Result<FetchMeta, DownloadError> {
            self.calls.lock().unwrap().push(request.clone());
            if let Some(delay) = self.delay {
                thread::sleep(delay);
            }
            let body = self
                .bodies
                .get(&request.url)
                .ok_or_else(|| DownloadError::Transport(format!("HTTP 404 Not Found from {}", request.url)))?;
            sink.write_all(body)
                .map_err(|e| DownloadError::Transport(e.to_string()))?;
            Ok(FetchMeta {
                final_url: self.final_urls.get(&request.url).cloned().unwrap_or_default(),
                cookies: self.cookies.get(&request.url).cloned().unwrap_or_default(),
            })
        }
    }

    /// A transport whose workers panic, to check batches still complete.
    struct PanickingTransport;

    impl Transport for PanickingTransport {
        fn fetch(&self, _request: &DownloadRequest, _sink: &mut dyn Write) -> Result<FetchMeta, DownloadError> {
            panic!("transport blew up");
        }
    }

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://vendor.test/file{i}")).collect()
    }

    #[test]
    fn test_continuation_fires_once_after_whole_batch() {
        for n in 1..=3 {
            let mut transport = FakeTransport { delay: Some(Duration::from_millis(20)), ..Default::default() };
            for url in urls(n) {
                transport.bodies.insert(url.clone(), url.clone().into_bytes());
            }
            let center = DownloadCenter::new(Arc::new(transport), 4);
            let calls = AtomicUsize::new(0);

            let requests = urls(n).into_iter().map(DownloadRequest::page).collect();
            let seen = center.fetch(requests, |results| {
                calls.fetch_add(1, Ordering::SeqCst);
                results.len()
            });

            assert_eq!(calls.load(Ordering::SeqCst), 1, "batch of {n}");
            assert_eq!(seen, n);
        }
    }

    #[test]
    fn test_results_are_keyed_by_requested_url() {
        let mut transport = FakeTransport::default().with("https://a.test/page", "page body");
        transport
            .final_urls
            .insert("https://a.test/page".to_string(), "https://b.test/landing".to_string());
        transport
            .cookies
            .insert("https://a.test/page".to_string(), vec![Cookie::new("session", "42")]);

        let center = DownloadCenter::new(Arc::new(transport), 2);
        let results = center
            .submit(vec![DownloadRequest::page("https://a.test/page"), DownloadRequest::page("https://a.test/missing")])
            .wait();

        let page = &results["https://a.test/page"];
        assert!(page.is_ok());
        assert_eq!(page.final_url, "https://b.test/landing");
        assert_eq!(page.cookies, vec![Cookie::new("session", "42")]);
        assert_eq!(page.payload.as_ref().unwrap().text().unwrap(), "page body");

        let missing = &results["https://a.test/missing"];
        assert!(!missing.is_ok());
        assert!(matches!(missing.error, Some(DownloadError::Transport(_))));
    }

    #[test]
    fn test_checksum_mismatch_is_an_error_result() {
        let transport = Arc::new(FakeTransport::default().with("https://a.test/x.tar.gz", "hello world"));
        let center = DownloadCenter::new(transport.clone(), 2);

        let results = center
            .submit(vec![DownloadRequest::archive("https://a.test/x.tar.gz", Checksum::sha256("deadbeef"))])
            .wait();

        let result = &results["https://a.test/x.tar.gz"];
        assert!(result.payload.is_none());
        assert!(matches!(result.error, Some(DownloadError::ChecksumMismatch { .. })));
        assert_eq!(transport.call_count(), 1, "mismatch must not be retried");
    }

    #[test]
    fn test_verified_archive_lands_on_disk() {
        let transport = FakeTransport::default().with("https://a.test/x.tar.gz", "hello world");
        let center = DownloadCenter::new(Arc::new(transport), 1);

        let results = center
            .submit(vec![DownloadRequest::archive(
                "https://a.test/x.tar.gz",
                Checksum::md5("5eb63bbbe01eeed093cb22bb8f5acdc3"),
            )])
            .wait();

        let result = &results["https://a.test/x.tar.gz"];
        assert!(result.is_ok());
        let path = result.payload.as_ref().unwrap().path().unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"hello world");
    }

    #[test]
    fn test_duplicate_urls_are_fetched_once() {
        let transport = Arc::new(FakeTransport::default().with("https://a.test/p", "x"));
        let center = DownloadCenter::new(transport.clone(), 4);
        let results = center
            .submit(vec![DownloadRequest::page("https://a.test/p"), DownloadRequest::page("https://a.test/p")])
            .wait();
        assert_eq!(results.len(), 1);
        assert_eq!(transport.call_count(), 1);
    }

    #[test]
    fn test_dead_workers_still_complete_the_batch() {
        let center = DownloadCenter::new(Arc::new(PanickingTransport), 2);
        let results = center
            .submit(vec![DownloadRequest::page("https://a.test/1"), DownloadRequest::page("https://a.test/2")])
            .wait();
        assert_eq!(results.len(), 2);
        assert!(results.values().all(|r| r.error.is_some()));
    }

    #[test]
    fn test_empty_batch_completes_immediately() {
        let center = DownloadCenter::new(Arc::new(FakeTransport::default()), 4);
        let calls = AtomicUsize::new(0);
        center.fetch(Vec::new(), |results| {
            calls.fetch_add(1, Ordering::SeqCst);
            assert!(results.is_empty());
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_worker_count_has_a_floor_of_one() {
        let center = DownloadCenter::new(Arc::new(FakeTransport::default()), 0);
        assert_eq!(center.workers(), 1);
    }
}
