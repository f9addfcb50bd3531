//! Heuristic integrity check for downloaded audio files.
//!
//! A file is considered complete when it exists, is at least `min_size`
//! bytes long, and its first bytes can actually be read. No codec-level
//! inspection is done.
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Default minimum size of a real audio segment. Error pages and truncated
/// bodies are reliably smaller.
pub const DEFAULT_MIN_FILE_SIZE: u64 = 5000;

/// Number of leading bytes that must be readable.
pub const HEADER_LEN: usize = 10;

/// Verdict for a path on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Missing,
    /// Exists but too small or unreadable.
    Invalid,
    Valid,
}

impl FileState {
    pub fn exists(self) -> bool {
        !matches!(self, FileState::Missing)
    }

    pub fn is_valid(self) -> bool {
        matches!(self, FileState::Valid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validator {
    min_size: u64,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_FILE_SIZE)
    }
}

impl Validator {
    pub fn new(min_size: u64) -> Self {
        Self { min_size }
    }

    /// Inspects `path` without modifying it.
    pub async fn inspect(&self, path: &Path) -> FileState {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(m) => m,
            Err(_) => return FileState::Missing,
        };

        if !metadata.is_file() || metadata.len() < self.min_size {
            return FileState::Invalid;
        }

        let mut header = [0u8; HEADER_LEN];
        match read_prefix(path, &mut header).await {
            Ok(n) if n == HEADER_LEN => FileState::Valid,
            _ => FileState::Invalid,
        }
    }

    pub async fn is_valid(&self, path: &Path) -> bool {
        self.inspect(path).await.is_valid()
    }
}

/// Reads up to `buf.len()` bytes from the start of the file.
async fn read_prefix(path: &Path, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut filled = 0;

    while filled < buf.len() {
        let n = file.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }

    Ok(filled)
}
