use std::path::{Path, PathBuf};

use profilesync_common::{PersistedSnapshot, ProfileSyncError, Result};
use tracing::{info, warn};

/// The persisted snapshot file. Read once at the start of a run and written
/// once at the end.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the last snapshot. Absent, unreadable or malformed files all
    /// yield the zero-valued scaffold; this never fails.
    pub async fn load(&self) -> PersistedSnapshot {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %self.path.display(), "No existing snapshot, starting from scratch");
                return PersistedSnapshot::scaffold();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Snapshot unreadable, using defaults");
                return PersistedSnapshot::scaffold();
            }
        };

        let parsed = serde_json::from_str(&raw)
            .map_err(|e| ProfileSyncError::PersistenceCorrupt(e.to_string()))
            .and_then(PersistedSnapshot::from_json);

        match parsed {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Snapshot corrupt, using defaults");
                PersistedSnapshot::scaffold()
            }
        }
    }

    /// Write the snapshot in full via a sibling temp file and a rename, so an
    /// interrupted run never leaves a half-written file behind.
    pub async fn save(&self, snapshot: &PersistedSnapshot) -> Result<()> {
        let payload = render(snapshot)?;
        let write_err = |source: std::io::Error| ProfileSyncError::PersistenceWrite {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let tmp = temp_path(&self.path);
        tokio::fs::write(&tmp, payload).await.map_err(write_err)?;

        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(write_err(e));
        }

        info!(path = %self.path.display(), "Snapshot saved");
        Ok(())
    }
}

/// The exact text `save` writes: two-space indented JSON plus a newline.
pub fn render(snapshot: &PersistedSnapshot) -> Result<String> {
    let mut payload = serde_json::to_string_pretty(&snapshot.to_json()?)?;
    payload.push('\n');
    Ok(payload)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
