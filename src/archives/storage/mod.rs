pub mod local;
pub mod remote;

use async_trait::async_trait;

use super::error::ArchiveResult;
use super::keys::{ArchiveKind, ArchiveObjectRef};

pub use local::{LocalDirs, LocalStorage};
pub use remote::{ListPage, ObjectStoreClient, RemoteStorage, S3ObjectStore};

/// Uniform read/list access to archive blobs, local or remote.
///
/// `list` returns every file name under the kind's root (e.g. `20250601.br`)
/// sorted ascending. There is no finer name prefix: each kind maps to one
/// directory or bucket prefix. Callers take the last element as "latest",
/// which only holds while names embed a lexically increasing date or version
/// token.
#[async_trait]
pub trait ArchiveStorage: Send + Sync {
    async fn list(&self, kind: ArchiveKind) -> ArchiveResult<Vec<String>>;

    async fn read(&self, object: &ArchiveObjectRef) -> ArchiveResult<Vec<u8>>;

    /// Short label for logs and the status endpoint
    fn source(&self) -> &'static str;

    /// Backend-specific location hints (bucket, directories) for the status endpoint
    fn describe(&self) -> serde_json::Value;
}

/// Applies the per-kind name filter and the ascending sort shared by both backends
pub(crate) fn finalize_listing(kind: ArchiveKind, names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut names: Vec<String> = names
        .into_iter()
        .filter(|name| match kind {
            ArchiveKind::Daily => super::keys::is_daily_file_name(name),
            ArchiveKind::MatchDetail | ArchiveKind::NameIndex(_) | ArchiveKind::PlayerTimeSeries => {
                super::keys::is_archive_file_name(name)
            }
            ArchiveKind::PlayerPhoto => name.ends_with(super::keys::PHOTO_SUFFIX),
        })
        .collect();
    names.sort();
    names.dedup();
    names
}
