use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProfileSyncError>;

#[derive(Error, Debug)]
pub enum ProfileSyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The persisted snapshot exists but is not the expected shape.
    /// Recovered by the store; never returned from a run.
    #[error("Persisted snapshot is corrupt: {0}")]
    PersistenceCorrupt(String),

    #[error("Failed to write snapshot to {}: {source}", path.display())]
    PersistenceWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Image download failed: {0}")]
    ImageDownload(String),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
