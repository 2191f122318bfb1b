use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::errors::StoreError;
use crate::models::GameSession;
use crate::store::SessionStore;

/// One JSON file per session under a directory
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        info!("Persisting sessions under {}", dir.display());
        FileStore { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        // Ids come from the session cookie; keep them from escaping the directory
        let safe: String = session_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

impl SessionStore for FileStore {
    fn load(&self, session_id: &str) -> Result<GameSession, StoreError> {
        let path = self.path_for(session_id);
        match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                warn!("Stored session {} does not decode: {}", session_id, e);
                StoreError::Corrupt(e.to_string())
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No stored session {}, starting fresh", session_id);
                Ok(GameSession::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, session_id: &str, session: &GameSession) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(session_id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(session)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}
