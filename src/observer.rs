//! Progress reporting hooks.
//!
//! The downloader reports through [`ProgressObserver`] so the library stays
//! independent of any particular UI. The CLI plugs in [`ConsoleObserver`].
use indicatif::{ProgressBar, ProgressStyle};

pub trait ProgressObserver: Send + Sync {
    /// Called once the total size is known.
    fn start(&self, _total: u64) {}
    /// A chunk finished writing `delta` bytes.
    fn inc(&self, delta: u64);
    /// Human-facing status text (retries, failures).
    fn message(&self, msg: String);
    /// The whole download completed.
    fn finish(&self);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn inc(&self, _delta: u64) {}
    fn message(&self, _msg: String) {}
    fn finish(&self) {}
}

/// Drives an `indicatif` progress bar.
pub struct ConsoleObserver {
    pub pb: ProgressBar,
}

impl ConsoleObserver {
    pub fn new() -> Self {
        let pb = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
        )
        .map(|s| s.progress_chars("=>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        Self { pb }
    }

    pub fn hidden() -> Self {
        Self {
            pb: ProgressBar::hidden(),
        }
    }
}

impl Default for ConsoleObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for ConsoleObserver {
    fn start(&self, total: u64) {
        self.pb.set_length(total);
        self.pb.set_message("Downloading");
    }

    fn inc(&self, delta: u64) {
        self.pb.inc(delta);
    }

    fn message(&self, msg: String) {
        self.pb.set_message(msg);
    }

    fn finish(&self) {
        self.pb.finish_with_message("Done!");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_observer_tracks_bytes() {
        let observer = ConsoleObserver::hidden();
        observer.start(10_000);
        observer.inc(2_500);
        observer.inc(2_500);
        assert_eq!(observer.pb.position(), 5_000);
        assert_eq!(observer.pb.length(), Some(10_000));

        observer.finish();
        assert!(observer.pb.is_finished());
    }
}
