use async_trait::async_trait;
use serde_json::json;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{finalize_listing, ArchiveStorage};
use crate::archives::error::{ArchiveError, ArchiveResult};
use crate::archives::keys::{ArchiveKind, ArchiveObjectRef, IndexEntity};

/// Root directory per archive kind
#[derive(Debug, Clone)]
pub struct LocalDirs {
    pub daily: PathBuf,
    pub match_details: PathBuf,
    pub players_index: PathBuf,
    pub tournaments_index: PathBuf,
    pub players_ts: PathBuf,
    pub players_photo: PathBuf,
}

impl LocalDirs {
    /// Conventional layout below a single root, as produced by the ingestion job
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            daily: root.join("daily"),
            match_details: root.join("matches"),
            players_index: root.join("players").join("indexBuild"),
            tournaments_index: root.join("tournaments").join("indexBuild"),
            players_ts: root.join("players").join("ts"),
            players_photo: root.join("players").join("photo"),
        }
    }

    pub fn dir_for(&self, kind: ArchiveKind) -> &Path {
        match kind {
            ArchiveKind::Daily => &self.daily,
            ArchiveKind::MatchDetail => &self.match_details,
            ArchiveKind::NameIndex(IndexEntity::Players) => &self.players_index,
            ArchiveKind::NameIndex(IndexEntity::Tournaments) => &self.tournaments_index,
            ArchiveKind::PlayerTimeSeries => &self.players_ts,
            ArchiveKind::PlayerPhoto => &self.players_photo,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocalStorage {
    dirs: LocalDirs,
}

impl LocalStorage {
    pub fn new(dirs: LocalDirs) -> Self {
        Self { dirs }
    }
}

#[async_trait]
impl ArchiveStorage for LocalStorage {
    async fn list(&self, kind: ArchiveKind) -> ArchiveResult<Vec<String>> {
        let dir = self.dirs.dir_for(kind);
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Archive directory {} does not exist, listing empty", dir.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(ArchiveError::storage(format!("read_dir {}: {}", dir.display(), e))),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ArchiveError::storage(format!("read_dir {}: {}", dir.display(), e)))?
        {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }

        Ok(finalize_listing(kind, names))
    }

    async fn read(&self, object: &ArchiveObjectRef) -> ArchiveResult<Vec<u8>> {
        let path = self.dirs.dir_for(object.kind()).join(object.file_name());
        debug!("Reading local archive {}", path.display());

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ArchiveError::not_found(object.to_string())),
            Err(e) => Err(ArchiveError::storage(format!("read {}: {}", path.display(), e))),
        }
    }

    fn source(&self) -> &'static str {
        "local"
    }

    fn describe(&self) -> serde_json::Value {
        json!({
            "dailyDir": self.dirs.daily.display().to_string(),
            "matchDetailsDir": self.dirs.match_details.display().to_string(),
            "playersIndexDir": self.dirs.players_index.display().to_string(),
            "tournamentsIndexDir": self.dirs.tournaments_index.display().to_string(),
            "playersTsDir": self.dirs.players_ts.display().to_string(),
            "playersPhotoDir": self.dirs.players_photo.display().to_string(),
        })
    }
}
