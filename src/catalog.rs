//! The enumerable item set: one audio file per ayah.
//!
//! Items are a pure function of the fixed ayah-count table, the reciter's
//! URL segment and the target directory.
use crate::error::Result;
use std::path::{Path, PathBuf};
use url::Url;

/// Number of ayahs in each of the 114 surahs, in order.
pub const AYAH_COUNTS: [u16; 114] = [
    7, 286, 200, 176, 120, 165, 206, 75, 129, 109, // 1-10
    123, 111, 43, 52, 99, 128, 111, 110, 98, 135, // 11-20
    112, 78, 118, 64, 77, 227, 93, 88, 69, 60, // 21-30
    34, 30, 73, 54, 45, 83, 182, 88, 75, 85, // 31-40
    54, 53, 89, 59, 37, 35, 38, 29, 18, 45, // 41-50
    60, 49, 62, 55, 78, 96, 29, 22, 24, 13, // 51-60
    14, 11, 11, 18, 12, 12, 30, 52, 52, 44, // 61-70
    28, 28, 20, 56, 40, 31, 50, 40, 46, 42, // 71-80
    29, 19, 36, 25, 22, 17, 19, 26, 30, 20, // 81-90
    15, 21, 11, 8, 8, 19, 5, 8, 8, 11, // 91-100
    11, 8, 3, 9, 5, 4, 7, 3, 6, 3, // 101-110
    5, 4, 5, 6, // 111-114
];

pub const SURAH_COUNT: u16 = 114;

/// First surah of the tail included in the representative subset.
const SAMPLE_TAIL_START: u16 = 112;

/// Which surahs a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    /// All 114 surahs.
    #[default]
    Full,
    /// Surah 1 plus surahs 112..=114.
    Sample,
}

impl Selection {
    pub fn from_full_set(full_set: bool) -> Self {
        if full_set { Self::Full } else { Self::Sample }
    }

    pub fn includes(self, surah: u16) -> bool {
        match self {
            Self::Full => true,
            Self::Sample => surah == 1 || surah >= SAMPLE_TAIL_START,
        }
    }

    /// Selected surahs in ascending order, paired with their ayah count.
    pub fn surahs(self) -> impl Iterator<Item = (u16, u16)> {
        (1..=SURAH_COUNT)
            .zip(AYAH_COUNTS)
            .filter(move |(surah, _)| self.includes(*surah))
    }

    /// Number of items covered by this selection.
    pub fn item_count(self) -> usize {
        self.surahs().map(|(_, count)| count as usize).sum()
    }
}

/// Zero-padded `SSSAAA.mp3` name for one ayah.
pub fn file_name(surah: u16, ayah: u16) -> String {
    format!("{:03}{:03}.mp3", surah, ayah)
}

/// One (surah, ayah) unit of work and where it comes from / goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub surah: u16,
    pub ayah: u16,
    pub file_name: String,
    pub source_url: String,
    pub target_path: PathBuf,
}

/// Derives items for one reciter.
#[derive(Debug, Clone)]
pub struct Catalog {
    base_url: Url,
    reciter_path: String,
    target_dir: PathBuf,
}

impl Catalog {
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid absolute URL.
    pub fn new(base_url: &str, reciter_path: &str, target_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            reciter_path: reciter_path.trim_matches('/').to_string(),
            target_dir: target_dir.into(),
        })
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    pub fn item(&self, surah: u16, ayah: u16) -> Item {
        let file_name = file_name(surah, ayah);
        let source_url = format!(
            "{}/{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            self.reciter_path,
            file_name
        );
        let target_path = self.target_dir.join(&file_name);

        Item {
            surah,
            ayah,
            file_name,
            source_url,
            target_path,
        }
    }

    /// All items of one surah, ayah 1 first.
    pub fn surah_items(&self, surah: u16, ayah_count: u16) -> impl Iterator<Item = Item> + '_ {
        (1..=ayah_count).map(move |ayah| self.item(surah, ayah))
    }

    /// Every item of the full set, regardless of selection.
    pub fn all_items(&self) -> impl Iterator<Item = Item> + '_ {
        Selection::Full
            .surahs()
            .flat_map(move |(surah, count)| self.surah_items(surah, count))
    }
}
