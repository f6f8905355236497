//! On-device credential store: one JSON file holding the bearer token and
//! the logged-in profile. Written at login, removed at logout.

use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tarefa_core::UserRef;

const APP_DIR: &str = "tarefa";
const SESSION_FILE_NAME: &str = "session.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: UserRef,
}

/// Platform data directory for this app.
pub(crate) fn data_dir() -> Result<PathBuf, ClientError> {
    if cfg!(windows) {
        let appdata = std::env::var("APPDATA")
            .map_err(|_| ClientError::Storage("APPDATA is not set".to_string()))?;
        Ok(PathBuf::from(appdata).join(APP_DIR))
    } else {
        let home = std::env::var("HOME")
            .map_err(|_| ClientError::Storage("HOME is not set".to_string()))?;
        Ok(PathBuf::from(home).join(".config").join(APP_DIR))
    }
}

fn default_path() -> Result<PathBuf, ClientError> {
    if let Ok(path) = std::env::var("TAREFA_SESSION_PATH") {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    Ok(data_dir()?.join(SESSION_FILE_NAME))
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new() -> Result<Self, ClientError> {
        Ok(SessionStore { path: default_path()? })
    }

    /// Store at an explicit path (tests, alternate profiles).
    pub fn at(path: impl Into<PathBuf>) -> Self {
        SessionStore { path: path.into() }
    }

    pub fn load(&self) -> Result<Option<Session>, ClientError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        let session = serde_json::from_str(&content)
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        Ok(Some(session))
    }

    pub fn save(&self, session: &Session) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| ClientError::Storage(e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(session)
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        fs::write(&self.path, content).map_err(|e| ClientError::Storage(e.to_string()))
    }

    pub fn clear(&self) -> Result<(), ClientError> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| ClientError::Storage(e.to_string()))?;
        }
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn session() -> Session {
        Session {
            token: "tok-123".to_string(),
            user: UserRef {
                id: Uuid::new_v4(),
                name: "Ana".to_string(),
                email: "ana@example.com".to_string(),
            },
        }
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::at(dir.path().join("session.json"));

        assert!(store.load().unwrap().is_none());

        let s = session();
        store.save(&s).unwrap();
        assert_eq!(store.load().unwrap(), Some(s));
    }

    #[test]
    fn clear_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::at(dir.path().join("session.json"));

        store.save(&session()).unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());

        // Clearing again is a no-op.
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_file_is_reported_not_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        let store = SessionStore::at(path);
        assert!(matches!(store.load(), Err(ClientError::Storage(_))));
    }
}
