//! Terminal progress rendering for the `padron` binary.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use padron_core::{DownloadProgress, ProgressSink};

const DOWNLOAD_TEMPLATE: &str =
    "{spinner} [{elapsed_precise}] [{bar:40}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}";
const IMPORT_TEMPLATE: &str = "{spinner} [{elapsed_precise}] {msg}";

/// Renders download bytes as a bar and import rows as a spinner message.
pub(crate) struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    /// A visible bar when `enabled`, otherwise a hidden one.
    pub(crate) fn new(enabled: bool) -> Self {
        let bar = if enabled {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::with_template(DOWNLOAD_TEMPLATE)
                .map(|style| style.progress_chars("=> "))
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar }
    }

    /// Switches from the download bar to the import spinner.
    pub(crate) fn start_import(&self) {
        self.bar.reset();
        self.bar.set_style(
            ProgressStyle::with_template(IMPORT_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        self.bar.set_message("reading archive...");
        self.bar.enable_steady_tick(Duration::from_millis(100));
    }

    /// Clears the current bar.
    pub(crate) fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for ConsoleProgress {
    fn download(&self, progress: DownloadProgress) {
        if self.bar.length() != Some(progress.total) {
            self.bar.set_length(progress.total);
        }
        self.bar.set_position(progress.downloaded);
        self.bar.set_message(format!("{:.1}%", progress.percent()));
    }

    fn import(&self, rows: u64) {
        self.bar.set_message(format!("{rows} rows imported"));
    }
}
