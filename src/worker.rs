use crate::error::{FetchError, Result};
use crate::validator::Validator;
use governor::state::InMemoryState;
use governor::{RateLimiter, clock::DefaultClock, state::direct::NotKeyed};
use reqwest::StatusCode;
use std::ffi::OsString;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::time::sleep;

pub type ArcRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const TEMP_SUFFIX: &str = ".tmp";

/// Builds the HTTP client used for all fetches: browser User-Agent, and
/// `timeout` bounding the connect and each idle wait on the body. A body that
/// keeps streaming is never cut off, however long it takes in total.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(timeout)
        .read_timeout(timeout)
        .build()?;
    Ok(client)
}

/// `target` with the temp suffix appended to its file name.
pub fn temp_path(target: &Path) -> PathBuf {
    let mut s: OsString = target.as_os_str().to_owned();
    s.push(TEMP_SUFFIX);
    PathBuf::from(s)
}

/// Attempt budget and exponential backoff (no jitter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubled for each later one.
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Sleep after failed attempt `attempt` (0-based): `base * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(2u32.saturating_pow(attempt))
    }

    fn has_attempts_left(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }
}

/// Byte-rate cap applied to streamed bodies.
#[derive(Clone)]
pub struct Throttle {
    limiter: ArcRateLimiter,
    burst: NonZeroU32,
}

impl Throttle {
    pub fn per_second(bytes_per_sec: NonZeroU32) -> Self {
        let quota = governor::Quota::per_second(bytes_per_sec);
        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
            burst: bytes_per_sec,
        }
    }

    async fn consume(&self, len: usize) {
        let mut remaining = u32::try_from(len).unwrap_or(u32::MAX);

        // A single request may not exceed the burst size, so large chunks
        // are paid for in burst-sized slices.
        while let Some(n) = NonZeroU32::new(remaining.min(self.burst.get())) {
            if self.limiter.until_n_ready(n).await.is_err() {
                break;
            }
            remaining -= n.get();
        }
    }
}

/// Downloads one file with retries and atomic placement.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    validator: Validator,
    policy: RetryPolicy,
    throttle: Option<Throttle>,
}

impl Fetcher {
    pub fn new(client: reqwest::Client, validator: Validator, policy: RetryPolicy) -> Self {
        Self {
            client,
            validator,
            policy,
            throttle: None,
        }
    }

    pub fn with_throttle(mut self, throttle: Option<Throttle>) -> Self {
        self.throttle = throttle;
        self
    }

    /// Fetches `url` into `target`.
    ///
    /// The body is streamed into `<target>.tmp`, validated, and only then
    /// renamed over `target`, so `target` is never partially written. All
    /// failures are retried up to `max_attempts` and end as `false`; nothing
    /// propagates to the caller.
    pub async fn fetch(&self, url: &str, target: &Path, label: &str) -> bool {
        let temp = temp_path(target);

        for attempt in 0..self.policy.max_attempts {
            if attempt > 0 {
                tracing::info!(
                    file = label,
                    attempt = attempt + 1,
                    max_attempts = self.policy.max_attempts,
                    "Retrying"
                );
            }

            match self.attempt(url, target, &temp).await {
                Ok(()) => return true,
                Err(e) => {
                    // Never leave a stale temp file behind a failed attempt
                    if let Err(rm) = tokio::fs::remove_file(&temp).await
                        && rm.kind() != std::io::ErrorKind::NotFound
                    {
                        tracing::debug!(file = label, error = %rm, "Could not remove temp file");
                    }

                    if self.policy.has_attempts_left(attempt) {
                        let delay = self.policy.delay_for(attempt);
                        tracing::warn!(
                            file = label,
                            error = %e,
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            "Fetch attempt failed, backing off"
                        );
                        sleep(delay).await;
                    } else {
                        tracing::error!(
                            file = label,
                            error = %e,
                            attempts = self.policy.max_attempts,
                            "Fetch failed after all attempts"
                        );
                    }
                }
            }
        }

        false
    }

    async fn attempt(
        &self,
        url: &str,
        target: &Path,
        temp: &Path,
    ) -> std::result::Result<(), FetchError> {
        let mut response = self.client.get(url).send().await?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::Status(response.status()));
        }

        let file = tokio::fs::File::create(temp).await?;
        let mut writer = BufWriter::new(file);

        while let Some(bytes) = response.chunk().await? {
            if let Some(throttle) = &self.throttle {
                throttle.consume(bytes.len()).await;
            }
            writer.write_all(&bytes).await?;
        }

        // Ensure all bytes are on disk before the file is judged or renamed
        writer.flush().await?;
        writer.into_inner().sync_all().await?;

        if !self.validator.is_valid(temp).await {
            let size = tokio::fs::metadata(temp).await.map(|m| m.len()).unwrap_or(0);
            return Err(FetchError::Integrity { size });
        }

        tokio::fs::rename(temp, target).await?;
        Ok(())
    }
}
