//! Progress reporting seam between the batch loop and the console.
use indicatif::{ProgressBar, ProgressStyle};

/// Receives batch progress. Implementations must be cheap; they are called
/// once per item.
pub trait ProgressObserver: Send + Sync {
    /// A new batch of `total` items is starting.
    fn start(&self, total: u64);
    fn message(&self, msg: String);
    fn inc(&self, delta: u64);
    fn finish(&self);
}

/// Drives an `indicatif` progress bar.
pub struct ConsoleObserver {
    pub pb: ProgressBar,
}

impl ConsoleObserver {
    pub fn new() -> Self {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::with_template(
                "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
        );
        Self { pb }
    }
}

impl Default for ConsoleObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for ConsoleObserver {
    fn start(&self, total: u64) {
        self.pb.reset();
        self.pb.set_length(total);
        self.pb.set_position(0);
    }

    fn message(&self, msg: String) {
        self.pb.println(msg);
    }

    fn inc(&self, delta: u64) {
        self.pb.inc(delta);
    }

    fn finish(&self) {
        self.pb.finish_and_clear();
    }
}
