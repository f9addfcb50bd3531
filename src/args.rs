use clap::Parser;
use std::path::PathBuf;

/// A resumable, integrity-checked downloader for per-ayah recitation audio.
///
/// Every flag overrides the matching key of the settings file; anything left
/// unset falls back to the built-in default.
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Settings file (TOML). Defaults to `<config dir>/ayah-fetch/config.toml`.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Reciter identifier used in reports (e.g. "alafasy").
    #[arg(long, requires = "url_path")]
    pub reciter: Option<String>,

    /// Reciter path segment on the remote source (e.g. "Alafasy_128kbps").
    #[arg(long, requires = "reciter")]
    pub url_path: Option<String>,

    /// Base URL of the remote source.
    #[arg(long)]
    pub base_url: Option<String>,

    /// Root directory; each reciter downloads into `<dir>/<url-path>`.
    #[arg(short = 'd', long)]
    pub dir: Option<PathBuf>,

    /// Minimum size in bytes for a file to count as valid.
    #[arg(long)]
    pub min_size: Option<u64>,

    /// Only process surah 1 and surahs 112-114.
    #[arg(long)]
    pub sample: bool,

    /// Process all 114 surahs, even if the settings file asks for the sample.
    #[arg(long, conflicts_with = "sample")]
    pub full: bool,

    /// Skip the verification sweep over existing files.
    #[arg(long)]
    pub no_verify: bool,

    /// Attempts per file before it is counted as failed.
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Pause after every file, in milliseconds.
    #[arg(long)]
    pub pacing_ms: Option<u64>,

    /// Print a progress line every N files.
    #[arg(long)]
    pub report_every: Option<usize>,

    /// Per-request timeout in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// A rate limit in bytes per second (e.g., 1048576 for 1MB/s).
    #[arg(long)]
    pub rate_limit: Option<u32>,
}
