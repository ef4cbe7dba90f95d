use crate::level::{Level, Tier};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// The client-persisted session keys, kept in one place with an explicit
/// load/save/clear lifecycle instead of being read ad hoc.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredSession {
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub level_type: Tier,
    pub level_number: u8,
}

impl Default for StoredSession {
    fn default() -> Self {
        Self {
            user_id: None,
            username: None,
            level_type: Tier::Beginner,
            level_number: 1,
        }
    }
}

impl StoredSession {
    pub fn level(&self) -> Level {
        Level::new(self.level_type, self.level_number)
    }

    pub fn set_level(&mut self, level: Level) {
        self.level_type = level.tier;
        self.level_number = level.number;
    }
}

pub trait SessionStore {
    fn load(&self) -> StoredSession;
    fn save(&self, session: &StoredSession) -> std::io::Result<()>;
    /// Sign-out: forget all stored keys.
    fn clear(&self) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "signik") {
            pd.config_dir().join("session.json")
        } else {
            PathBuf::from("signik_session.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> StoredSession {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(session) = serde_json::from_slice::<StoredSession>(&bytes) {
                return session;
            }
        }
        StoredSession::default()
    }

    fn save(&self, session: &StoredSession) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(session).unwrap_or_default();
        fs::write(&self.path, data)
    }

    fn clear(&self) -> std::io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_beginner_level_one() {
        let dir = tempdir().unwrap();
        let store = FileSessionStore::with_path(dir.path().join("session.json"));

        let session = store.load();
        assert_eq!(session.level(), Level::new(Tier::Beginner, 1));
        assert_eq!(session.user_id, None);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let store = FileSessionStore::with_path(dir.path().join("session.json"));

        let mut session = StoredSession {
            user_id: Some(42),
            username: Some("mira".into()),
            ..Default::default()
        };
        session.set_level(Level::new(Tier::Expert, 3));
        store.save(&session).unwrap();

        assert_eq!(store.load(), session);
    }

    #[test]
    fn clear_forgets_all_keys() {
        let dir = tempdir().unwrap();
        let store = FileSessionStore::with_path(dir.path().join("session.json"));

        let session = StoredSession {
            user_id: Some(7),
            username: Some("sam".into()),
            level_type: Tier::Pro,
            level_number: 4,
        };
        store.save(&session).unwrap();
        store.clear().unwrap();

        assert_eq!(store.load(), StoredSession::default());
        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_file_falls_back_to_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, b"not json").unwrap();

        let store = FileSessionStore::with_path(&path);
        assert_eq!(store.load(), StoredSession::default());
    }
}
