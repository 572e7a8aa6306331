use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Archive not found: {0}")]
    NotFound(String),

    #[error("Invalid archive key: {0}")]
    InvalidKey(String),

    #[error("Corrupt archive {key}: {reason}")]
    CorruptArchive { key: String, reason: String },

    #[error("Storage backend error: {0}")]
    Storage(String),
}

impl ArchiveError {
    pub fn not_found(key: impl Into<String>) -> Self {
        ArchiveError::NotFound(key.into())
    }

    pub fn invalid_key(message: impl Into<String>) -> Self {
        ArchiveError::InvalidKey(message.into())
    }

    pub fn corrupt(key: impl Into<String>, reason: impl Into<String>) -> Self {
        ArchiveError::CorruptArchive {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        ArchiveError::Storage(message.into())
    }
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;
