//! Constants for the download module (timeouts, part limits, buffers).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default per-read idle timeout (5 minutes).
///
/// Applied between body chunks rather than to the whole request, so a large
/// part that keeps making progress never trips it.
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default number of parallel byte ranges.
pub const DEFAULT_PARTS: usize = 10;

/// Upper bound on parallel byte ranges accepted from configuration.
pub const MAX_PARTS: usize = 64;

/// Capacity of the progress channel, per worker.
pub(crate) const PROGRESS_CHANNEL_PER_PART: usize = 16;

/// Prefix for the per-job scratch directory.
pub(crate) const SCRATCH_PREFIX: &str = "padron_parts";
