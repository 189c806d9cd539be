//! HTTP client wrapper for size probes and ranged part fetches.
//!
//! This module provides the `HttpClient` struct which issues the metadata
//! probe for the resource length and streams individual byte ranges to
//! scratch files with timeout configuration and error handling.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, RANGE};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use super::plan::PartRange;
use crate::progress::PartProgress;

/// HTTP client for segmented downloads.
///
/// Created once per job and cloned into every worker, sharing one connection
/// pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// - Connect timeout: 30 seconds
    /// - Read (idle) timeout: 5 minutes
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeouts(
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
            Duration::from_secs(READ_TIMEOUT_SECS),
        )
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_timeouts(connect_timeout: Duration, read_timeout: Duration) -> Self {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .user_agent(default_user_agent())
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Returns the resource length advertised by a `HEAD` request.
    ///
    /// A missing `Accept-Ranges: bytes` header is logged but not fatal: some
    /// servers honor ranges without advertising it, and a server that does not
    /// is caught per part by the `206` check in [`fetch_range`](Self::fetch_range).
    ///
    /// # Errors
    ///
    /// - [`DownloadError::InvalidUrl`] if `url` does not parse
    /// - [`DownloadError::Network`] / [`DownloadError::Timeout`] on transport failure
    /// - [`DownloadError::HttpStatus`] on a non-success status
    /// - [`DownloadError::SizeUnavailable`] if `Content-Length` is absent or non-numeric
    #[instrument(skip(self), fields(url = %url))]
    pub async fn probe_size(&self, url: &str) -> Result<u64, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| DownloadError::transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        let accepts_ranges = response
            .headers()
            .get(ACCEPT_RANGES)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("bytes"));
        if !accepts_ranges {
            warn!(url = %url, "server does not advertise byte-range support");
        }

        let header = response
            .headers()
            .get(CONTENT_LENGTH)
            .ok_or_else(|| DownloadError::size_unavailable(url, "missing Content-Length header"))?;
        let raw = header.to_str().map_err(|_| {
            DownloadError::size_unavailable(url, "Content-Length header is not valid text")
        })?;
        let total_bytes = raw.trim().parse::<u64>().map_err(|_| {
            DownloadError::size_unavailable(url, format!("non-numeric Content-Length {raw:?}"))
        })?;

        debug!(total_bytes, accepts_ranges, "probed resource size");
        Ok(total_bytes)
    }

    /// Fetches one byte range into `dest`, overwriting any prior content.
    ///
    /// Cumulative bytes written for this attempt are sent on `progress` after
    /// every chunk. The transfer stops with [`DownloadError::Cancelled`] as soon
    /// as `cancel` fires.
    ///
    /// `total_bytes` is the full resource length; a plain `200 OK` is accepted
    /// only when `range` covers all of it.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::Network`] / [`DownloadError::Timeout`] on transport failure
    /// - [`DownloadError::HttpStatus`] on a non-success status
    /// - [`DownloadError::RangeNotHonored`] if the server ignored the range
    /// - [`DownloadError::ShortPart`] if the body length differs from the range
    /// - [`DownloadError::Io`] if the scratch file cannot be written
    #[instrument(
        skip(self, dest, cancel, progress),
        fields(url = %url, part = range.index, start = range.start, end = range.end)
    )]
    pub async fn fetch_range(
        &self,
        url: &str,
        range: PartRange,
        total_bytes: u64,
        dest: &Path,
        cancel: &CancellationToken,
        progress: &mpsc::Sender<PartProgress>,
    ) -> Result<u64, DownloadError> {
        let request = self.client.get(url).header(RANGE, range.header_value());
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(DownloadError::Cancelled),
            sent = request.send() => sent.map_err(|e| DownloadError::transport(url, e))?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }
        let whole_resource = range.start == 0 && range.end + 1 == total_bytes;
        if status != StatusCode::PARTIAL_CONTENT && !(status == StatusCode::OK && whole_resource) {
            return Err(DownloadError::RangeNotHonored {
                url: url.to_string(),
                status: status.as_u16(),
                start: range.start,
                end: range.end,
            });
        }

        let file = File::create(dest)
            .await
            .map_err(|e| DownloadError::io(dest, e))?;
        let mut writer = BufWriter::new(file);
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(DownloadError::Cancelled),
                next = stream.next() => next,
            };
            let Some(chunk) = next else { break };
            let chunk = chunk.map_err(|e| DownloadError::transport(url, e))?;

            writer
                .write_all(&chunk)
                .await
                .map_err(|e| DownloadError::io(dest, e))?;
            written += chunk.len() as u64;

            // A closed receiver only means nobody is watching progress.
            let _ = progress
                .send(PartProgress {
                    index: range.index,
                    written: written.min(range.len()),
                })
                .await;
        }

        writer
            .flush()
            .await
            .map_err(|e| DownloadError::io(dest, e))?;

        if written != range.len() {
            return Err(DownloadError::ShortPart {
                index: range.index,
                expected_bytes: range.len(),
                actual_bytes: written,
            });
        }

        debug!(bytes = written, "part complete");
        Ok(written)
    }
}

fn default_user_agent() -> String {
    format!("padron/{}", env!("CARGO_PKG_VERSION"))
}
