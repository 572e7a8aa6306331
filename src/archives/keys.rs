use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::{ArchiveError, ArchiveResult};

pub const ARCHIVE_SUFFIX: &str = ".br";
pub const PHOTO_SUFFIX: &str = ".jpg";

static INDEX_VERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(v\d{4}-\d{2}-\d{2}T\d{2}-\d{2}Z)\.br$").expect("valid index version pattern")
});

/// Entities that publish a name index next to the daily archives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexEntity {
    Players,
    Tournaments,
}

impl IndexEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexEntity::Players => "players",
            IndexEntity::Tournaments => "tournaments",
        }
    }
}

impl fmt::Display for IndexEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexEntity {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "players" => Ok(IndexEntity::Players),
            "tournaments" => Ok(IndexEntity::Tournaments),
            other => Err(ArchiveError::invalid_key(format!("Unknown index entity '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveKind {
    Daily,
    MatchDetail,
    NameIndex(IndexEntity),
    /// Per-player rating history, `players/ts/{id}.br`
    PlayerTimeSeries,
    /// Player photos, `players/photo/{id}.jpg` plus the two defaults
    PlayerPhoto,
}

/// Which default photo to fall back to (`?g=W` or `?g=M`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhotoGender {
    #[default]
    Men,
    Women,
}

impl PhotoGender {
    /// Anything other than `W` means the men's default
    pub fn from_query(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(g) if g.eq_ignore_ascii_case("w") => PhotoGender::Women,
            _ => PhotoGender::Men,
        }
    }

    pub fn default_photo(self) -> &'static str {
        match self {
            PhotoGender::Men => "photoM.jpg",
            PhotoGender::Women => "photoW.jpg",
        }
    }
}

/// Player TP ids are plain digit strings
fn is_player_id(id: &str) -> bool {
    (1..=12).contains(&id.len()) && id.bytes().all(|b| b.is_ascii_digit())
}

/// Validated reference to a stored archive blob.
///
/// Construction is the only place keys are checked, so a value of this type
/// can be handed to any storage backend without further validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveObjectRef {
    kind: ArchiveKind,
    key: String,
}

impl ArchiveObjectRef {
    /// Daily match list for `yyyymmdd`. A trailing `.br` is tolerated.
    pub fn daily(date: &str) -> ArchiveResult<Self> {
        let trimmed = date.trim();
        let key = strip_archive_suffix(trimmed).unwrap_or(trimmed);

        if key.len() != 8 || !key.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ArchiveError::invalid_key("Invalid date format."));
        }

        Ok(Self {
            kind: ArchiveKind::Daily,
            key: key.to_string(),
        })
    }

    /// Per-match detail document, ids are 5 to 12 digits
    pub fn match_detail(id: &str) -> ArchiveResult<Self> {
        let key = id.trim();
        if !(5..=12).contains(&key.len()) || !key.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ArchiveError::invalid_key("Invalid id format."));
        }

        Ok(Self {
            kind: ArchiveKind::MatchDetail,
            key: key.to_string(),
        })
    }

    pub fn name_index(entity: IndexEntity, file: &str) -> ArchiveResult<Self> {
        let key = file.trim();
        if key.is_empty() || key.contains("..") || key.contains('/') || key.contains('\\') {
            return Err(ArchiveError::invalid_key("Invalid index file name."));
        }
        if strip_archive_suffix(key).is_none() {
            return Err(ArchiveError::invalid_key("Index file must end with .br"));
        }

        Ok(Self {
            kind: ArchiveKind::NameIndex(entity),
            key: key.to_string(),
        })
    }

    pub fn player_time_series(id: &str) -> ArchiveResult<Self> {
        let key = id.trim();
        if !is_player_id(key) {
            return Err(ArchiveError::invalid_key("Invalid player id."));
        }

        Ok(Self {
            kind: ArchiveKind::PlayerTimeSeries,
            key: key.to_string(),
        })
    }

    /// A player's photo by id, or one of the default photos by file name
    pub fn player_photo(id: &str) -> ArchiveResult<Self> {
        let id = id.trim();
        let key = if [PhotoGender::Men, PhotoGender::Women]
            .iter()
            .any(|g| g.default_photo() == id)
        {
            id.to_string()
        } else if is_player_id(id) {
            format!("{}{}", id, PHOTO_SUFFIX)
        } else {
            return Err(ArchiveError::invalid_key("Invalid player id."));
        };

        Ok(Self {
            kind: ArchiveKind::PlayerPhoto,
            key,
        })
    }

    pub fn is_default_photo(&self) -> bool {
        self.kind == ArchiveKind::PlayerPhoto
            && [PhotoGender::Men, PhotoGender::Women]
                .iter()
                .any(|g| g.default_photo() == self.key)
    }

    pub fn kind(&self) -> ArchiveKind {
        self.kind
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// File (or object) name under the kind's root
    pub fn file_name(&self) -> String {
        match self.kind {
            ArchiveKind::Daily | ArchiveKind::MatchDetail | ArchiveKind::PlayerTimeSeries => {
                format!("{}{}", self.key, ARCHIVE_SUFFIX)
            }
            ArchiveKind::NameIndex(_) | ArchiveKind::PlayerPhoto => self.key.clone(),
        }
    }
}

impl fmt::Display for ArchiveObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ArchiveKind::Daily => write!(f, "daily/{}", self.file_name()),
            ArchiveKind::MatchDetail => write!(f, "matches/{}", self.file_name()),
            ArchiveKind::NameIndex(entity) => write!(f, "{}/index/{}", entity, self.file_name()),
            ArchiveKind::PlayerTimeSeries => write!(f, "players/ts/{}", self.file_name()),
            ArchiveKind::PlayerPhoto => write!(f, "players/photo/{}", self.file_name()),
        }
    }
}

/// Returns the name without its `.br` suffix (any case), or None if absent
pub fn strip_archive_suffix(name: &str) -> Option<&str> {
    let split = name.len().checked_sub(ARCHIVE_SUFFIX.len())?;
    if !name.is_char_boundary(split) {
        return None;
    }
    let (stem, suffix) = name.split_at(split);
    suffix.eq_ignore_ascii_case(ARCHIVE_SUFFIX).then_some(stem)
}

pub fn is_archive_file_name(name: &str) -> bool {
    strip_archive_suffix(name).is_some_and(|stem| !stem.is_empty())
}

/// `yyyymmdd.br`
pub fn is_daily_file_name(name: &str) -> bool {
    strip_archive_suffix(name).is_some_and(|stem| stem.len() == 8 && stem.bytes().all(|b| b.is_ascii_digit()))
}

pub fn date_from_key(yyyymmdd: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(yyyymmdd, "%Y%m%d").ok()
}

/// `20250601` -> `2025-06-01`, purely positional
pub fn yyyymmdd_to_iso(yyyymmdd: &str) -> String {
    if yyyymmdd.len() != 8 || !yyyymmdd.is_ascii() {
        return yyyymmdd.to_string();
    }
    format!("{}-{}-{}", &yyyymmdd[0..4], &yyyymmdd[4..6], &yyyymmdd[6..8])
}

/// `players.index.v2026-01-22T19-35Z.br` -> `v2026-01-22T19-35Z`
pub fn index_version(file: &str) -> Option<String> {
    INDEX_VERSION
        .captures(file)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
