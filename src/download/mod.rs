//! Segmented HTTP range downloader.
//!
//! This module fetches one large resource as N concurrent byte ranges and
//! reassembles them into a single file.
//!
//! # Features
//!
//! - Size probe via `HEAD` and `Content-Length`
//! - Even range planning, remainder absorbed by the last part
//! - Streaming part fetches into a per-job scratch directory
//! - Strict `206 Partial Content` and per-part length checks
//! - Monotonic aggregate progress across parts
//! - Fail-fast: one failed part cancels the job
//! - Configurable timeouts (30s connect, 5min read by default)
//!
//! # Example
//!
//! ```no_run
//! use padron_core::download::HttpClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new();
//! let size = client.probe_size("http://example.com/padron.zip").await?;
//! println!("{size} bytes");
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod error;
mod plan;
mod retry;
mod scratch;
mod segmented;

pub use client::HttpClient;
pub use error::DownloadError;
pub use plan::{PartRange, plan};
pub use retry::{DEFAULT_MAX_ATTEMPTS, FailureType, RetryDecision, RetryPolicy, classify_error};
pub use scratch::ScratchDir;
pub use segmented::{
    AssembledFile, DownloadJob, DownloadOptions, PartFile, SegmentedDownloader, merge_parts,
};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
