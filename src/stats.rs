//! Per-run counters and the end-of-run summary.
use std::fmt;

/// Final state of one item within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Skipped,
    Downloaded,
    Redownloaded,
    Failed,
}

/// Counters for a single run. Not persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadStats {
    pub downloaded: usize,
    pub skipped: usize,
    /// Marked complete but found invalid; always followed by a fetch.
    pub corrupted: usize,
    pub redownloaded: usize,
    pub failed: usize,
}

impl DownloadStats {
    pub fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Skipped => self.skipped += 1,
            ItemOutcome::Downloaded => self.downloaded += 1,
            ItemOutcome::Redownloaded => self.redownloaded += 1,
            ItemOutcome::Failed => self.failed += 1,
        }
    }

    /// Items that ended with a valid file on disk.
    pub fn completed(&self) -> usize {
        self.downloaded + self.skipped + self.redownloaded
    }

    /// Items that reached a terminal outcome.
    pub fn processed(&self) -> usize {
        self.completed() + self.failed
    }

    /// Share of `total` that is complete, in percent.
    pub fn percent_of(&self, total: usize) -> f64 {
        if total == 0 {
            return 100.0;
        }
        self.completed() as f64 / total as f64 * 100.0
    }
}

impl fmt::Display for DownloadStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "=".repeat(40))?;
        writeln!(f, "{:<18} {:>8} files", "Downloaded:", self.downloaded)?;
        writeln!(f, "{:<18} {:>8} files", "Re-downloaded:", self.redownloaded)?;
        writeln!(f, "{:<18} {:>8} files", "Skipped:", self.skipped)?;
        writeln!(f, "{:<18} {:>8} files", "Corrupt/Fixed:", self.corrupted)?;
        writeln!(f, "{:<18} {:>8} files", "Failed:", self.failed)?;
        write!(f, "{}", "=".repeat(40))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_totals() {
        let mut stats = DownloadStats::default();
        stats.record(ItemOutcome::Downloaded);
        stats.record(ItemOutcome::Downloaded);
        stats.record(ItemOutcome::Skipped);
        stats.record(ItemOutcome::Redownloaded);
        stats.record(ItemOutcome::Failed);
        stats.corrupted += 1;

        assert_eq!(stats.downloaded, 2);
        assert_eq!(stats.completed(), 4);
        assert_eq!(stats.processed(), 5);
        assert!((stats.percent_of(8) - 50.0).abs() < f64::EPSILON);
        assert_eq!(stats.percent_of(0), 100.0);
    }

    #[test]
    fn test_summary_lists_every_counter() {
        let stats = DownloadStats {
            downloaded: 3,
            skipped: 4,
            corrupted: 1,
            redownloaded: 2,
            failed: 5,
        };
        let table = stats.to_string();

        for (label, value) in [
            ("Downloaded:", 3),
            ("Re-downloaded:", 2),
            ("Skipped:", 4),
            ("Corrupt/Fixed:", 1),
            ("Failed:", 5),
        ] {
            let line = table
                .lines()
                .find(|l| l.starts_with(label))
                .unwrap_or_else(|| panic!("missing {label}"));
            assert!(line.contains(&format!("{value} files")), "{line}");
        }
    }
}
