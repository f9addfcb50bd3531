//! The batch loop: decides per item whether to skip, repair bookkeeping or
//! fetch, and keeps the progress file in step with the disk.
//!
//! Items are resolved strictly one after another. A failed item is left
//! unmarked so the next invocation picks it up again.
use crate::catalog::{Catalog, Item, Selection};
use crate::error::{Error, Result};
use crate::observer::ProgressObserver;
use crate::state::ProgressStore;
use crate::stats::{DownloadStats, ItemOutcome};
use crate::validator::{FileState, Validator};
use crate::worker::Fetcher;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_PACING: Duration = Duration::from_millis(100);
pub const DEFAULT_REPORT_EVERY: usize = 10;

/// What to do with one item, given its bookkeeping and disk state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Marked complete and valid on disk.
    Skip,
    /// Valid on disk but not marked: mark it now, no network call.
    Adopt,
    Fetch {
        /// Was marked complete but is no longer valid.
        corrupted: bool,
        /// A file already exists at the target path.
        redownload: bool,
    },
}

/// First matching rule wins.
pub fn decide(marked_complete: bool, on_disk: FileState) -> Decision {
    match (marked_complete, on_disk) {
        (true, FileState::Valid) => Decision::Skip,
        (false, FileState::Valid) => Decision::Adopt,
        (corrupted, state) => Decision::Fetch {
            corrupted,
            redownload: state.exists(),
        },
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    /// Sleep after every item, whatever its outcome.
    pub pacing: Duration,
    /// Emit a running percentage every this many processed items.
    pub report_every: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            pacing: DEFAULT_PACING,
            report_every: DEFAULT_REPORT_EVERY,
        }
    }
}

pub struct BatchDownloader {
    catalog: Catalog,
    fetcher: Fetcher,
    validator: Validator,
    options: BatchOptions,
    observer: Arc<dyn ProgressObserver>,
    cancel: CancellationToken,
}

impl BatchDownloader {
    pub fn new(
        catalog: Catalog,
        fetcher: Fetcher,
        validator: Validator,
        options: BatchOptions,
        observer: Arc<dyn ProgressObserver>,
    ) -> Self {
        Self {
            catalog,
            fetcher,
            validator,
            options,
            observer,
            cancel: CancellationToken::new(),
        }
    }

    /// Stops the run before the next item once the token is cancelled.
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs one batch over `selection`.
    ///
    /// # Errors
    ///
    /// Only fails if the target directory cannot be created; every per-item
    /// failure is counted in the returned statistics instead.
    pub async fn run(&self, selection: Selection, verify_first: bool) -> Result<DownloadStats> {
        let target_dir = self.catalog.target_dir();
        tokio::fs::create_dir_all(target_dir)
            .await
            .map_err(|source| Error::TargetDir {
                path: target_dir.to_path_buf(),
                source,
            })?;

        let mut store = ProgressStore::load(target_dir).await;

        if verify_first {
            self.verify_existing(&mut store).await;
        }

        let total = selection.item_count();
        tracing::info!(total, dir = %target_dir.display(), "Starting batch");
        if store.last_surah() > 0 {
            tracing::info!(last_surah = store.last_surah(), "Resuming after previous run");
        }

        let mut stats = DownloadStats::default();
        self.observer.start(total as u64);

        'surahs: for (surah, ayah_count) in selection.surahs() {
            tracing::debug!(surah, ayah_count, "Surah");

            for item in self.catalog.surah_items(surah, ayah_count) {
                if self.cancel.is_cancelled() {
                    tracing::warn!(file = %item.file_name, "Interrupted, stopping before next item");
                    break 'surahs;
                }

                let outcome = self.process_item(&item, &mut store, &mut stats).await;
                stats.record(outcome);
                self.observer.inc(1);

                let processed = stats.processed();
                if processed % self.options.report_every.max(1) == 0 {
                    let msg = format!(
                        "Progress: {}/{} files ({:.1}%)",
                        stats.completed(),
                        total,
                        stats.percent_of(total)
                    );
                    tracing::info!("{}", msg);
                    self.observer.message(msg);
                }

                // Be polite to the server
                sleep(self.options.pacing).await;
            }

            if let Err(e) = store.set_last_surah(surah).await {
                tracing::error!(surah, error = %e, "Failed to save progress");
            }
        }

        self.observer.finish();
        Ok(stats)
    }

    /// Checks every existing target file and drops the progress entry of each
    /// invalid one. Files are left in place; a later fetch overwrites them.
    ///
    /// Returns the names of the invalid files.
    pub async fn verify_existing(&self, store: &mut ProgressStore) -> Vec<String> {
        tracing::info!(dir = %self.catalog.target_dir().display(), "Verifying existing files");

        let mut corrupt = Vec::new();
        let mut existing = 0usize;

        for item in self.catalog.all_items() {
            match self.validator.inspect(&item.target_path).await {
                FileState::Missing => {}
                FileState::Valid => existing += 1,
                FileState::Invalid => {
                    existing += 1;
                    let size = tokio::fs::metadata(&item.target_path)
                        .await
                        .map(|m| m.len())
                        .unwrap_or(0);
                    tracing::warn!(file = %item.file_name, size, "Corrupt file found");
                    corrupt.push(item.file_name);
                }
            }
        }

        if corrupt.is_empty() {
            tracing::info!(existing, "All existing files are valid");
            return corrupt;
        }

        tracing::warn!(
            corrupt = corrupt.len(),
            existing,
            "Corrupt files will be downloaded again"
        );
        if let Err(e) = store
            .mark_all_incomplete(corrupt.iter().map(String::as_str))
            .await
        {
            tracing::error!(error = %e, "Failed to save progress");
        }

        corrupt
    }

    async fn process_item(
        &self,
        item: &Item,
        store: &mut ProgressStore,
        stats: &mut DownloadStats,
    ) -> ItemOutcome {
        let on_disk = self.validator.inspect(&item.target_path).await;

        let redownload = match decide(store.is_complete(&item.file_name), on_disk) {
            Decision::Skip => return ItemOutcome::Skipped,
            Decision::Adopt => {
                if let Err(e) = store.mark_complete(&item.file_name).await {
                    tracing::error!(file = %item.file_name, error = %e, "Failed to save progress");
                }
                return ItemOutcome::Skipped;
            }
            Decision::Fetch {
                corrupted,
                redownload,
            } => {
                if corrupted {
                    stats.corrupted += 1;
                    self.observer
                        .message(format!("Re-downloading corrupt file: {}", item.file_name));
                }
                redownload
            }
        };

        let ok = self
            .fetcher
            .fetch(&item.source_url, &item.target_path, &item.file_name)
            .await;

        if !ok {
            self.observer
                .message(format!("Failed to download: {}", item.file_name));
            return ItemOutcome::Failed;
        }

        if let Err(e) = store.mark_complete(&item.file_name).await {
            tracing::error!(file = %item.file_name, error = %e, "Failed to save progress");
        }

        if redownload {
            self.observer.message(format!("Re-downloaded: {}", item.file_name));
            ItemOutcome::Redownloaded
        } else {
            self.observer.message(format!("Downloaded: {}", item.file_name));
            ItemOutcome::Downloaded
        }
    }
}
