//! Upload progress reporting.

use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar over uploaded points.
pub struct UploadProgress {
    /// Progress bar (None if running in quiet mode)
    progress_bar: Option<ProgressBar>,
    start_time: Instant,
}

impl UploadProgress {
    pub fn new(total: u64, quiet: bool) -> Self {
        let progress_bar = if quiet {
            None
        } else {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        };

        Self {
            progress_bar,
            start_time: Instant::now(),
        }
    }

    /// Record a finished batch.
    pub fn batch_uploaded(&self, points: u64) {
        if let Some(ref pb) = self.progress_bar {
            pb.inc(points);
            let elapsed = self.start_time.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 {
                pb.position() as f64 / elapsed
            } else {
                0.0
            };
            pb.set_message(format!("{:.1} points/s", rate));
        }
    }

    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_with_message("done");
        }
    }
}
