//! # ayah-fetch
//!
//! `ayah-fetch` downloads one recitation audio file per ayah (6,236 files
//! for a full set) into a local directory and survives network failures,
//! partial downloads and restarts. It supports:
//! - Resuming from a JSON progress file kept next to the audio files
//! - Heuristic corruption detection (size and readable header)
//! - Automatic retries with exponential backoff
//! - Atomic placement through a temp file and rename
//! - Optional bandwidth throttling
//!
//! The batch is strictly sequential: one file is fully resolved before the
//! next one starts.

pub mod args;
pub mod catalog;
pub mod config;
pub mod downloader;
pub mod error;
pub mod observer;
pub mod state;
pub mod stats;
pub mod validator;
pub mod worker;

pub use args::Args;
pub use catalog::{Catalog, Item, Selection};
pub use config::{Reciter, RunConfig, Settings};
pub use downloader::{BatchDownloader, BatchOptions};
pub use error::{Error, FetchError};
pub use state::{ProgressRecord, ProgressStore};
pub use stats::DownloadStats;
pub use validator::Validator;
pub use worker::{Fetcher, RetryPolicy, Throttle};
