use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, error, info};

use crate::session::types::SessionMap;
use crate::utils::{AzaleaError, Result};

/// File name of the snapshot inside the data directory
pub const SNAPSHOT_FILE: &str = "users.json";

/// Whole-file JSON snapshot of every session.
///
/// Each save overwrites the complete document. Writes go to a sibling temp
/// file that is renamed into place, so a crash mid-write leaves the previous
/// snapshot intact.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<data_dir>/users.json`
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(SNAPSHOT_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the snapshot. A missing file is an empty map; a file that
    /// cannot be parsed is `CorruptStore` and is left untouched.
    pub async fn load(&self) -> Result<SessionMap> {
        let json = match fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No snapshot at {:?}, starting empty", self.path);
                return Ok(SessionMap::new());
            }
            Err(e) => return Err(AzaleaError::storage_read(&self.path, e)),
        };

        let mut sessions: SessionMap = serde_json::from_str(&json).map_err(|e| {
            error!("Failed to parse snapshot {:?}: {}", self.path, e);
            AzaleaError::corrupt_store(&self.path, e.to_string())
        })?;

        for session in sessions.values_mut() {
            session.enforce_history_limit();
        }

        info!("Loaded {} sessions from {:?}", sessions.len(), self.path);
        Ok(sessions)
    }

    /// Replaces the snapshot with `sessions`
    pub async fn save(&self, sessions: &SessionMap) -> Result<()> {
        let json = serde_json::to_string_pretty(sessions)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AzaleaError::storage_write(parent, e))?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .await
            .map_err(|e| AzaleaError::storage_write(&tmp_path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            fs::set_permissions(&tmp_path, permissions)
                .await
                .map_err(|e| AzaleaError::storage_write(&tmp_path, e))?;
        }

        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| AzaleaError::storage_write(&self.path, e))?;

        debug!(sessions = sessions.len(), "Saved snapshot to {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Mode;
    use crate::session::types::{Session, Turn, ensure_session};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::in_dir(temp_dir.path());

        let sessions = store.load().await.unwrap();
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::in_dir(temp_dir.path());

        let mut sessions = SessionMap::new();
        let session = ensure_session(&mut sessions, "42");
        session.message_count = 3;
        session.mode = Mode::Smart;
        session.push_turn(Turn::new("hi", "hello!"));
        ensure_session(&mut sessions, "7").is_pro = true;

        store.save(&sessions).await.unwrap();
        let loaded = store.load().await.unwrap();

        assert_eq!(loaded, sessions);
    }

    #[tokio::test]
    async fn test_save_creates_parent_dir() {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::in_dir(&temp_dir.path().join("nested").join("data"));

        store.save(&SessionMap::new()).await.unwrap();
        assert!(store.path().exists());
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_non_ascii_is_kept_verbatim() {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::in_dir(temp_dir.path());

        let mut sessions = SessionMap::new();
        ensure_session(&mut sessions, "1").push_turn(Turn::new("привет", "🌸"));
        store.save(&sessions).await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("привет"));
        assert!(raw.contains("🌸"));
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_reported_and_kept() {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::in_dir(temp_dir.path());
        std::fs::write(store.path(), "invalid json {{").unwrap();

        let result = store.load().await;
        assert!(matches!(result, Err(AzaleaError::CorruptStore { .. })));

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw, "invalid json {{");
    }

    #[tokio::test]
    async fn test_load_trims_oversized_history() {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::in_dir(temp_dir.path());

        let history: Vec<[String; 2]> = (0..25)
            .map(|i| [format!("q{}", i), format!("a{}", i)])
            .collect();
        let json = serde_json::json!({
            "5": {"count": 0, "mode": "Therapist", "is_pro": false, "history": history}
        });
        std::fs::write(store.path(), json.to_string()).unwrap();

        let loaded = store.load().await.unwrap();
        let session: &Session = &loaded["5"];
        assert_eq!(session.history.len(), 20);
        assert_eq!(session.history[0].question(), "q5");
    }

    #[tokio::test]
    async fn test_save_into_unwritable_location_fails() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let store = SessionStore::in_dir(&blocker);

        let result = store.save(&SessionMap::new()).await;
        assert!(matches!(result, Err(AzaleaError::StorageWrite { .. })));
    }

    #[tokio::test]
    async fn test_file_permissions_unix() {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let temp_dir = TempDir::new().unwrap();
            let store = SessionStore::in_dir(temp_dir.path());
            store.save(&SessionMap::new()).await.unwrap();

            let metadata = fs::metadata(store.path()).await.unwrap();
            assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
        }
    }
}
