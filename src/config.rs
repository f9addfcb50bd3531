//! Settings file and its merge with command-line flags.
//!
//! Precedence is flag, then settings file, then built-in default.
use crate::args::Args;
use crate::catalog::Selection;
use crate::downloader::{BatchOptions, DEFAULT_PACING, DEFAULT_REPORT_EVERY};
use crate::error::{Error, Result};
use crate::validator::DEFAULT_MIN_FILE_SIZE;
use crate::worker::{DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://everyayah.com/data";
pub const DEFAULT_TARGET_ROOT: &str = "audio/quran";

/// A reciter and the path segment its files live under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reciter {
    pub id: String,
    pub url_path: String,
}

impl Reciter {
    pub fn new(id: impl Into<String>, url_path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url_path: url_path.into(),
        }
    }
}

impl Default for Reciter {
    fn default() -> Self {
        Self::new("alafasy", "Alafasy_128kbps")
    }
}

/// Contents of the settings file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub base_url: Option<String>,
    pub target_root: Option<PathBuf>,
    pub min_file_size: Option<u64>,
    pub full_set: Option<bool>,
    pub verify_first: Option<bool>,
    pub max_attempts: Option<u32>,
    pub pacing_ms: Option<u64>,
    pub report_every: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub rate_limit: Option<u32>,
    pub reciters: Option<Vec<Reciter>>,
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("ayah-fetch").join("config.toml"))
    }

    /// Loads settings from `path`, or from the default location when `None`.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(p) => p,
            None => return Ok(Self::default()),
        };

        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content).map_err(|e| {
                Error::Config(format!("{}: {}", path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Fully resolved options for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub base_url: String,
    pub target_root: PathBuf,
    pub min_file_size: u64,
    pub selection: Selection,
    pub verify_first: bool,
    pub retry: RetryPolicy,
    pub pacing: Duration,
    pub report_every: usize,
    pub timeout: Duration,
    pub rate_limit: Option<NonZeroU32>,
    pub reciters: Vec<Reciter>,
}

impl RunConfig {
    /// Merges flags over settings over defaults and validates the result.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` or `Error::InvalidUrl` for unusable values.
    pub fn resolve(args: &Args, settings: Settings) -> Result<Self> {
        let base_url = args
            .base_url
            .clone()
            .or(settings.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        url::Url::parse(&base_url)?;

        let max_attempts = args
            .max_attempts
            .or(settings.max_attempts)
            .unwrap_or(DEFAULT_MAX_ATTEMPTS);
        if max_attempts == 0 {
            return Err(Error::Config("max_attempts must be at least 1".into()));
        }

        let report_every = args
            .report_every
            .or(settings.report_every)
            .unwrap_or(DEFAULT_REPORT_EVERY);
        if report_every == 0 {
            return Err(Error::Config("report_every must be at least 1".into()));
        }

        let reciters = match (&args.reciter, &args.url_path) {
            (Some(id), Some(url_path)) => vec![Reciter::new(id, url_path)],
            _ => settings.reciters.unwrap_or_else(|| vec![Reciter::default()]),
        };
        if reciters.is_empty() {
            return Err(Error::Config("no reciters configured".into()));
        }

        let full_set = if args.full {
            true
        } else if args.sample {
            false
        } else {
            settings.full_set.unwrap_or(true)
        };
        let verify_first = !args.no_verify && settings.verify_first.unwrap_or(true);

        Ok(Self {
            base_url,
            target_root: args
                .dir
                .clone()
                .or(settings.target_root)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TARGET_ROOT)),
            min_file_size: args
                .min_size
                .or(settings.min_file_size)
                .unwrap_or(DEFAULT_MIN_FILE_SIZE),
            selection: Selection::from_full_set(full_set),
            verify_first,
            retry: RetryPolicy {
                max_attempts,
                ..RetryPolicy::default()
            },
            pacing: args
                .pacing_ms
                .or(settings.pacing_ms)
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_PACING),
            report_every,
            timeout: args
                .timeout_secs
                .or(settings.timeout_secs)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
            rate_limit: args
                .rate_limit
                .or(settings.rate_limit)
                .and_then(NonZeroU32::new),
            reciters,
        })
    }

    /// Where one reciter's files go.
    pub fn target_dir(&self, reciter: &Reciter) -> PathBuf {
        self.target_root.join(&reciter.url_path)
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            pacing: self.pacing,
            report_every: self.report_every,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = RunConfig::resolve(&Args::default(), Settings::default()).unwrap();

        assert_eq!(config.base_url, "https://everyayah.com/data");
        assert_eq!(config.min_file_size, 5000);
        assert_eq!(config.selection, Selection::Full);
        assert!(config.verify_first);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.pacing, Duration::from_millis(100));
        assert_eq!(config.report_every, 10);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.rate_limit, None);
        assert_eq!(config.reciters, vec![Reciter::default()]);
        assert_eq!(
            config.target_dir(&config.reciters[0]),
            PathBuf::from("audio/quran/Alafasy_128kbps")
        );
    }

    #[test]
    fn test_flags_override_settings() {
        let settings = Settings::parse(
            r#"
            base_url = "http://mirror.local/data"
            min_file_size = 1000
            max_attempts = 5
            full_set = true
            pacing_ms = 250

            [[reciters]]
            id = "husary"
            url_path = "Husary_128kbps"

            [[reciters]]
            id = "minshawi"
            url_path = "Minshawy_Murattal_128kbps"
            "#,
        )
        .unwrap();

        let args = Args::parse_from(["ayah-fetch", "--max-attempts", "2", "--sample"]);
        let config = RunConfig::resolve(&args, settings.clone()).unwrap();

        assert_eq!(config.base_url, "http://mirror.local/data");
        assert_eq!(config.min_file_size, 1000);
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.selection, Selection::Sample);
        assert_eq!(config.pacing, Duration::from_millis(250));
        assert_eq!(config.reciters.len(), 2);

        let args = Args::parse_from([
            "ayah-fetch",
            "--reciter",
            "alafasy",
            "--url-path",
            "Alafasy_64kbps",
            "--no-verify",
        ]);
        let config = RunConfig::resolve(&args, settings).unwrap();
        assert_eq!(config.reciters, vec![Reciter::new("alafasy", "Alafasy_64kbps")]);
        assert!(!config.verify_first);
    }

    #[test]
    fn test_full_flag_overrides_sample_setting() {
        let settings = Settings {
            full_set: Some(false),
            ..Default::default()
        };

        let config = RunConfig::resolve(&Args::default(), settings.clone()).unwrap();
        assert_eq!(config.selection, Selection::Sample);

        let args = Args::parse_from(["ayah-fetch", "--full"]);
        let config = RunConfig::resolve(&args, settings).unwrap();
        assert_eq!(config.selection, Selection::Full);

        assert!(Args::try_parse_from(["ayah-fetch", "--full", "--sample"]).is_err());
    }

    #[test]
    fn test_reciter_requires_url_path() {
        assert!(Args::try_parse_from(["ayah-fetch", "--reciter", "alafasy"]).is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let args = Args::parse_from(["ayah-fetch", "--max-attempts", "0"]);
        assert!(RunConfig::resolve(&args, Settings::default()).is_err());

        let args = Args::parse_from(["ayah-fetch", "--base-url", "nope"]);
        assert!(RunConfig::resolve(&args, Settings::default()).is_err());

        let settings = Settings {
            reciters: Some(vec![]),
            ..Default::default()
        };
        assert!(RunConfig::resolve(&Args::default(), settings).is_err());
    }

    #[test]
    fn test_zero_rate_limit_means_unlimited() {
        let args = Args::parse_from(["ayah-fetch", "--rate-limit", "0"]);
        let config = RunConfig::resolve(&args, Settings::default()).unwrap();
        assert_eq!(config.rate_limit, None);
    }

    #[test]
    fn test_load_settings_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        // Missing file falls back to defaults
        assert_eq!(Settings::load(Some(path.as_path())).unwrap(), Settings::default());

        std::fs::write(&path, "min_file_size = 42\nverify_first = false\n").unwrap();
        let settings = Settings::load(Some(path.as_path())).unwrap();
        assert_eq!(settings.min_file_size, Some(42));
        assert_eq!(settings.verify_first, Some(false));

        std::fs::write(&path, "min_file_size = \"big\"").unwrap();
        assert!(Settings::load(Some(path.as_path())).is_err());

        std::fs::write(&path, "unknown_key = 1").unwrap();
        assert!(Settings::load(Some(path.as_path())).is_err());
    }
}
