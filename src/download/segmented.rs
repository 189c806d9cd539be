//! Segmented download engine.
//!
//! A [`SegmentedDownloader`] splits one resource into planned byte ranges,
//! fetches every range concurrently into its own scratch file, and
//! concatenates the parts in index order into the destination file.
//!
//! # Concurrency Model
//!
//! - One Tokio task per planned range, no further throttling
//! - Workers share nothing but the progress channel and a cancellation token
//! - One aggregator task owns the running total and feeds the [`ProgressSink`]
//! - Merge starts only after every worker has been joined
//!
//! # Failure Policy
//!
//! The first failed part cancels its siblings and fails the job with
//! [`DownloadError::PartFetchFailed`]. A job whose parts do not add up to the
//! probed length fails with [`DownloadError::IncompleteDownload`]. The scratch
//! directory is removed in every case.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use padron_core::download::{DownloadOptions, HttpClient, SegmentedDownloader};
//! use padron_core::NoProgress;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = SegmentedDownloader::new(HttpClient::new(), DownloadOptions::default())?;
//! let file = downloader
//!     .download("http://example.com/padron.zip", Path::new("padron.zip"), Arc::new(NoProgress))
//!     .await?;
//! println!("{} bytes in {} parts", file.bytes, file.parts);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::constants::{DEFAULT_PARTS, MAX_PARTS, PROGRESS_CHANNEL_PER_PART};
use super::plan::{PartRange, plan};
use super::retry::{RetryDecision, RetryPolicy, classify_error};
use super::scratch::ScratchDir;
use super::{DownloadError, HttpClient};
use crate::progress::{DownloadProgress, PartProgress, ProgressSink};

/// Tunables for a segmented download.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Number of concurrent byte ranges.
    pub parts: usize,
    /// Base directory for the per-job scratch directory; system temp when `None`.
    pub scratch_base: Option<PathBuf>,
    /// Retry policy applied to each part independently.
    pub retry_policy: RetryPolicy,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            parts: DEFAULT_PARTS,
            scratch_base: None,
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl DownloadOptions {
    /// Checks the part count against the configured bounds.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidPartCount`] outside `1..=MAX_PARTS`.
    pub fn validate(&self) -> Result<(), DownloadError> {
        if (1..=MAX_PARTS).contains(&self.parts) {
            Ok(())
        } else {
            Err(DownloadError::InvalidPartCount {
                parts: self.parts,
                total_bytes: 0,
                max: MAX_PARTS as u64,
            })
        }
    }
}

/// One invocation's worth of work: what to fetch and how to split it.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    /// Source URL.
    pub url: String,
    /// Resource length from the size probe.
    pub total_bytes: u64,
    /// Number of parts.
    pub parts: usize,
    /// Base directory for scratch files.
    pub scratch_base: Option<PathBuf>,
}

/// A completed part, read-only once its worker has returned it.
#[derive(Debug, Clone)]
pub struct PartFile {
    /// Planned range.
    pub range: PartRange,
    /// Scratch file holding the range's bytes.
    pub path: PathBuf,
    /// Bytes written to `path`.
    pub written: u64,
}

/// The concatenated output of a successful job.
#[derive(Debug, Clone, Serialize)]
pub struct AssembledFile {
    /// Destination path.
    pub path: PathBuf,
    /// Bytes in the assembled file; equals the probed length.
    pub bytes: u64,
    /// Number of parts fetched.
    pub parts: usize,
    /// Wall-clock time for fetch and merge.
    #[serde(serialize_with = "crate::progress::serialize_secs")]
    pub elapsed: Duration,
}

/// Concurrent byte-range downloader.
#[derive(Debug)]
pub struct SegmentedDownloader {
    client: HttpClient,
    options: DownloadOptions,
    cancel: CancellationToken,
}

impl SegmentedDownloader {
    /// Creates a downloader with validated options.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidPartCount`] if `options.parts` is out of bounds.
    #[instrument(level = "debug", skip(client))]
    pub fn new(client: HttpClient, options: DownloadOptions) -> Result<Self, DownloadError> {
        options.validate()?;
        debug!(
            parts = options.parts,
            max_attempts = options.retry_policy.max_attempts(),
            "creating segmented downloader"
        );
        Ok(Self {
            client,
            options,
            cancel: CancellationToken::new(),
        })
    }

    /// Returns the configured options.
    #[must_use]
    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    /// Token that aborts every in-flight job of this downloader when cancelled.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Probes the resource size and runs a job for it.
    ///
    /// # Errors
    ///
    /// Returns the probe error, or any error from [`run`](Self::run).
    #[instrument(skip(self, sink), fields(url = %url, output = %output.display()))]
    pub async fn download(
        &self,
        url: &str,
        output: &Path,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<AssembledFile, DownloadError> {
        let total_bytes = self.client.probe_size(url).await?;
        let job = DownloadJob {
            url: url.to_string(),
            total_bytes,
            parts: self.options.parts,
            scratch_base: self.options.scratch_base.clone(),
        };
        self.run(&job, output, sink).await
    }

    /// Fetches all parts of `job` concurrently and assembles them into `output`.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::EmptyResource`] if the resource has no bytes
    /// - [`DownloadError::InvalidPartCount`] if the job cannot be planned
    /// - [`DownloadError::PartFetchFailed`] if any part fails
    /// - [`DownloadError::Cancelled`] if the owner cancelled the job
    /// - [`DownloadError::IncompleteDownload`] if the bytes do not add up
    /// - [`DownloadError::Assembly`] if concatenation fails
    #[instrument(skip(self, job, sink), fields(url = %job.url, total_bytes = job.total_bytes, parts = job.parts))]
    pub async fn run(
        &self,
        job: &DownloadJob,
        output: &Path,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<AssembledFile, DownloadError> {
        let started = Instant::now();
        let ranges = plan(job.total_bytes, job.parts)?;
        let scratch = ScratchDir::create(job.scratch_base.as_deref())?;

        info!(parts = ranges.len(), "starting segmented download");
        let result = self.fetch_and_merge(job, &ranges, &scratch, output, sink).await;
        scratch.remove();

        let bytes = result?;
        let assembled = AssembledFile {
            path: output.to_path_buf(),
            bytes,
            parts: ranges.len(),
            elapsed: started.elapsed(),
        };
        info!(
            path = %assembled.path.display(),
            bytes = assembled.bytes,
            elapsed_ms = assembled.elapsed.as_millis(),
            "download assembled"
        );
        Ok(assembled)
    }

    async fn fetch_and_merge(
        &self,
        job: &DownloadJob,
        ranges: &[PartRange],
        scratch: &ScratchDir,
        output: &Path,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<u64, DownloadError> {
        let parts = self.fetch_all(job, ranges, scratch, sink).await?;
        let merged = merge_parts(&parts, output).await?;
        if merged != job.total_bytes {
            let _ = tokio::fs::remove_file(output).await;
            return Err(DownloadError::IncompleteDownload {
                expected_bytes: job.total_bytes,
                actual_bytes: merged,
            });
        }
        Ok(merged)
    }

    /// Runs one worker per range and joins them all before returning.
    async fn fetch_all(
        &self,
        job: &DownloadJob,
        ranges: &[PartRange],
        scratch: &ScratchDir,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<Vec<PartFile>, DownloadError> {
        let cancel = self.cancel.child_token();
        let (tx, rx) = mpsc::channel(ranges.len() * PROGRESS_CHANNEL_PER_PART);
        let aggregator = tokio::spawn(aggregate_progress(rx, ranges.len(), job.total_bytes, sink));

        let mut workers = JoinSet::new();
        let mut task_parts = HashMap::with_capacity(ranges.len());
        for &range in ranges {
            let worker = PartWorker {
                client: self.client.clone(),
                url: job.url.clone(),
                range,
                total_bytes: job.total_bytes,
                dest: scratch.part_path(range.index),
                cancel: cancel.clone(),
                progress: tx.clone(),
                retry_policy: self.options.retry_policy.clone(),
            };
            let handle = workers.spawn(async move {
                worker
                    .run()
                    .await
                    .map_err(|e| DownloadError::part_failed(range.index, e))
            });
            task_parts.insert(handle.id(), range.index);
        }
        drop(tx);

        debug!(task_count = workers.len(), "waiting for part workers");

        let mut parts = Vec::with_capacity(ranges.len());
        let mut first_error: Option<DownloadError> = None;
        while let Some(joined) = workers.join_next().await {
            let error = match joined {
                Ok(Ok(part)) => {
                    debug!(part = part.range.index, bytes = part.written, "part joined");
                    parts.push(part);
                    continue;
                }
                Ok(Err(error)) => error,
                Err(join_error) => DownloadError::WorkerPanicked {
                    index: task_parts.get(&join_error.id()).copied().unwrap_or(usize::MAX),
                    reason: join_error.to_string(),
                },
            };

            if first_error.is_none() {
                warn!(error = %error, "part failed; cancelling remaining parts");
                cancel.cancel();
                first_error = Some(error);
            } else {
                debug!(error = %error, "sibling part stopped");
            }
        }

        let downloaded = aggregator.await.unwrap_or_else(|e| {
            warn!(error = %e, "progress aggregator terminated abnormally");
            parts.iter().map(|p| p.written).sum()
        });
        debug!(downloaded, "all part workers joined");

        if let Some(error) = first_error {
            return Err(unwrap_cancellation(error));
        }

        parts.sort_by_key(|part| part.range.index);
        let written: u64 = parts.iter().map(|part| part.written).sum();
        if parts.len() != ranges.len() || written != job.total_bytes {
            return Err(DownloadError::IncompleteDownload {
                expected_bytes: job.total_bytes,
                actual_bytes: written,
            });
        }
        Ok(parts)
    }
}

/// An owner-initiated cancellation is reported as such, not as a part failure.
fn unwrap_cancellation(error: DownloadError) -> DownloadError {
    match error {
        DownloadError::PartFetchFailed { source, .. }
            if matches!(*source, DownloadError::Cancelled) =>
        {
            DownloadError::Cancelled
        }
        other => other,
    }
}

/// State moved into a single part's task.
struct PartWorker {
    client: HttpClient,
    url: String,
    range: PartRange,
    total_bytes: u64,
    dest: PathBuf,
    cancel: CancellationToken,
    progress: mpsc::Sender<PartProgress>,
    retry_policy: RetryPolicy,
}

impl PartWorker {
    #[instrument(skip(self), fields(part = self.range.index, start = self.range.start, end = self.range.end))]
    async fn run(self) -> Result<PartFile, DownloadError> {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let fetched = self
                .client
                .fetch_range(
                    &self.url,
                    self.range,
                    self.total_bytes,
                    &self.dest,
                    &self.cancel,
                    &self.progress,
                )
                .await;

            let error = match fetched {
                Ok(written) => {
                    return Ok(PartFile {
                        range: self.range,
                        path: self.dest,
                        written,
                    });
                }
                Err(DownloadError::Cancelled) => return Err(DownloadError::Cancelled),
                Err(error) => error,
            };

            match self.retry_policy.should_retry(classify_error(&error), attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                } => {
                    info!(
                        part = self.range.index,
                        attempt = next_attempt,
                        max_attempts = self.retry_policy.max_attempts(),
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "retrying part"
                    );
                    tokio::select! {
                        biased;
                        () = self.cancel.cancelled() => return Err(DownloadError::Cancelled),
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(part = self.range.index, %reason, "not retrying part");
                    return Err(error);
                }
            }
        }
    }
}

/// Sums per-part reports and notifies the sink after each one.
///
/// Reports carry the cumulative bytes of a part's current attempt, so a
/// retried part never counts twice and the total never decreases.
async fn aggregate_progress(
    mut rx: mpsc::Receiver<PartProgress>,
    parts: usize,
    total: u64,
    sink: Arc<dyn ProgressSink>,
) -> u64 {
    let mut per_part = vec![0u64; parts];
    let mut downloaded = 0u64;

    while let Some(report) = rx.recv().await {
        let Some(seen) = per_part.get_mut(report.index) else {
            continue;
        };
        if report.written > *seen {
            downloaded += report.written - *seen;
            *seen = report.written;
        }
        sink.download(DownloadProgress { downloaded, total });
    }

    downloaded
}

/// Concatenates `parts` into `output` in the order given.
///
/// The caller passes parts sorted by index. A partially written output is
/// removed on failure.
///
/// # Errors
///
/// Returns [`DownloadError::Assembly`] if a part cannot be read or the output
/// cannot be written.
#[instrument(skip(parts), fields(output = %output.display(), parts = parts.len()))]
pub async fn merge_parts(parts: &[PartFile], output: &Path) -> Result<u64, DownloadError> {
    let result = concatenate(parts, output).await;
    if result.is_err() {
        debug!("removing partial output after merge failure");
        let _ = tokio::fs::remove_file(output).await;
    }
    result
}

async fn concatenate(parts: &[PartFile], output: &Path) -> Result<u64, DownloadError> {
    let file = File::create(output)
        .await
        .map_err(|e| DownloadError::assembly(output, e))?;
    let mut writer = BufWriter::new(file);
    let mut total = 0u64;

    for part in parts {
        let mut source = File::open(&part.path)
            .await
            .map_err(|e| DownloadError::assembly(&part.path, e))?;
        total += tokio::io::copy(&mut source, &mut writer)
            .await
            .map_err(|e| DownloadError::assembly(output, e))?;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::assembly(output, e))?;
    writer
        .into_inner()
        .sync_all()
        .await
        .map_err(|e| DownloadError::assembly(output, e))?;

    Ok(total)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::progress::NoProgress;
    use crate::test_support::range_server::{mount_range_file, sample_bytes};
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use tempfile::TempDir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, ResponseTemplate};

    #[derive(Default)]
    struct RecordingSink {
        reports: Mutex<Vec<DownloadProgress>>,
    }

    impl ProgressSink for RecordingSink {
        fn download(&self, progress: DownloadProgress) {
            self.reports.lock().unwrap().push(progress);
        }
    }

    fn options(parts: usize, scratch: &Path) -> DownloadOptions {
        DownloadOptions {
            parts,
            scratch_base: Some(scratch.to_path_buf()),
            retry_policy: RetryPolicy::default(),
        }
    }

    fn scratch_is_empty(scratch: &Path) -> bool {
        std::fs::read_dir(scratch).unwrap().next().is_none()
    }

    #[test]
    fn test_options_reject_zero_parts() {
        let result = SegmentedDownloader::new(
            HttpClient::new(),
            DownloadOptions {
                parts: 0,
                ..DownloadOptions::default()
            },
        );
        assert!(matches!(
            result,
            Err(DownloadError::InvalidPartCount { parts: 0, .. })
        ));
    }

    #[test]
    fn test_options_reject_too_many_parts() {
        let options = DownloadOptions {
            parts: MAX_PARTS + 1,
            ..DownloadOptions::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_default_options() {
        let options = DownloadOptions::default();
        assert_eq!(options.parts, 10);
        assert!(options.scratch_base.is_none());
        assert_eq!(options.retry_policy.max_attempts(), 1);
    }

    #[tokio::test]
    async fn test_aggregate_progress_counts_retries_once() {
        let (tx, rx) = mpsc::channel(16);
        let sink = Arc::new(RecordingSink::default());
        let aggregator = tokio::spawn(aggregate_progress(rx, 2, 20, sink.clone()));

        for (index, written) in [(0, 5), (1, 4), (0, 10), (1, 3), (1, 10)] {
            tx.send(PartProgress { index, written }).await.unwrap();
        }
        drop(tx);

        assert_eq!(aggregator.await.unwrap(), 20);
        let totals: Vec<u64> = sink
            .reports
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.downloaded)
            .collect();
        assert_eq!(totals, vec![5, 9, 14, 14, 20]);
    }

    #[tokio::test]
    async fn test_run_reassembles_exact_bytes() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        let body = sample_bytes(1000);
        mount_range_file(&server, "/padron.zip", body.clone()).await;

        let scratch = TempDir::new().unwrap();
        let out_dir = TempDir::new().unwrap();
        let output = out_dir.path().join("padron.zip");
        let sink = Arc::new(RecordingSink::default());

        let downloader =
            SegmentedDownloader::new(HttpClient::new(), options(3, scratch.path())).unwrap();
        let assembled = downloader
            .download(&format!("{}/padron.zip", server.uri()), &output, sink.clone())
            .await
            .unwrap();

        assert_eq!(assembled.bytes, 1000);
        assert_eq!(assembled.parts, 3);
        assert_eq!(std::fs::read(&output).unwrap(), body);
        assert!(scratch_is_empty(scratch.path()), "scratch dir must be removed");

        let reports = sink.reports.lock().unwrap();
        assert!(reports.windows(2).all(|w| w[0].downloaded <= w[1].downloaded));
        assert_eq!(reports.last().unwrap().downloaded, 1000);
    }

    #[tokio::test]
    async fn test_run_fails_whole_job_when_one_part_fails() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/padron.zip"))
            .and(header("range", "bytes=333-665"))
            .respond_with(ResponseTemplate::new(500))
            .with_priority(1)
            .mount(&server)
            .await;
        mount_range_file(&server, "/padron.zip", sample_bytes(1000)).await;

        let scratch = TempDir::new().unwrap();
        let out_dir = TempDir::new().unwrap();
        let output = out_dir.path().join("padron.zip");

        let downloader =
            SegmentedDownloader::new(HttpClient::new(), options(3, scratch.path())).unwrap();
        let result = downloader
            .download(
                &format!("{}/padron.zip", server.uri()),
                &output,
                Arc::new(NoProgress),
            )
            .await;

        match result {
            Err(DownloadError::PartFetchFailed { index, source }) => {
                assert_eq!(index, 1);
                assert!(matches!(*source, DownloadError::HttpStatus { status: 500, .. }));
            }
            other => panic!("expected part failure, got {other:?}"),
        }
        assert!(!output.exists(), "no output on failed job");
        assert!(scratch_is_empty(scratch.path()), "scratch dir must be removed");
    }

    #[tokio::test]
    async fn test_run_cancelled_by_owner() {
        let scratch = TempDir::new().unwrap();
        let out_dir = TempDir::new().unwrap();
        let downloader =
            SegmentedDownloader::new(HttpClient::new(), options(2, scratch.path())).unwrap();
        downloader.cancellation_token().cancel();

        let job = DownloadJob {
            url: "http://127.0.0.1:9/padron.zip".to_string(),
            total_bytes: 100,
            parts: 2,
            scratch_base: Some(scratch.path().to_path_buf()),
        };
        let result = downloader
            .run(&job, &out_dir.path().join("out.zip"), Arc::new(NoProgress))
            .await;

        assert!(matches!(result, Err(DownloadError::Cancelled)));
        assert!(scratch_is_empty(scratch.path()));
    }

    #[tokio::test]
    async fn test_merge_parts_in_index_order() {
        let dir = TempDir::new().unwrap();
        let mut parts = Vec::new();
        for (index, content) in [b"abc".as_slice(), b"def", b"gh"].into_iter().enumerate() {
            let path = dir.path().join(format!("part_{index}"));
            std::fs::write(&path, content).unwrap();
            let start = index as u64 * 3;
            parts.push(PartFile {
                range: PartRange {
                    index,
                    start,
                    end: start + content.len() as u64 - 1,
                },
                path,
                written: content.len() as u64,
            });
        }

        let output = dir.path().join("merged");
        let merged = merge_parts(&parts, &output).await.unwrap();
        assert_eq!(merged, 8);
        assert_eq!(std::fs::read(&output).unwrap(), b"abcdefgh");
    }

    #[tokio::test]
    async fn test_merge_missing_part_removes_output() {
        let dir = TempDir::new().unwrap();
        let present = dir.path().join("part_0");
        std::fs::write(&present, b"abc").unwrap();
        let parts = vec![
            PartFile {
                range: PartRange {
                    index: 0,
                    start: 0,
                    end: 2,
                },
                path: present,
                written: 3,
            },
            PartFile {
                range: PartRange {
                    index: 1,
                    start: 3,
                    end: 5,
                },
                path: dir.path().join("part_1"),
                written: 3,
            },
        ];

        let output = dir.path().join("merged");
        let result = merge_parts(&parts, &output).await;
        assert!(matches!(result, Err(DownloadError::Assembly { .. })));
        assert!(!output.exists());
    }
}
