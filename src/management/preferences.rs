use std::{collections::HashSet, path::PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    config,
    error::PreferenceError,
    types::{CollectionRef, CreatorRef, Preferences, TriageRecord},
};

/// Storage of triage decisions.
///
/// Saves replace the whole list; there are no partial updates.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn load_collections(&self) -> Result<Vec<CollectionRef>, PreferenceError>;
    async fn save_collections(&self, records: &[CollectionRef]) -> Result<(), PreferenceError>;
    async fn load_creators(&self) -> Result<Vec<CreatorRef>, PreferenceError>;
    async fn save_creators(&self, records: &[CreatorRef]) -> Result<(), PreferenceError>;
}

/// JSON file holding `{ "playlists": [...], "artists": [...] }`.
///
/// A missing file reads as empty preferences. Saving one list keeps the
/// other one as it is on disk.
pub struct PreferenceManager {
    path: PathBuf,
    // serializes read-modify-write of the file
    write_lock: Mutex<()>,
}

impl PreferenceManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Manager for the configured preferences file.
    pub fn from_config() -> Self {
        Self::new(config::preferences_path())
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub async fn load(&self) -> Result<Preferences, PreferenceError> {
        let content = match async_fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Preferences::default());
            }
            Err(source) => return Err(self.io_error(source)),
        };

        if content.trim().is_empty() {
            return Ok(Preferences::default());
        }

        let mut prefs: Preferences =
            serde_json::from_str(&content).map_err(|source| PreferenceError::Serde {
                path: self.path.display().to_string(),
                source,
            })?;
        prefs.playlists = dedup_by_id(prefs.playlists);
        prefs.artists = dedup_by_id(prefs.artists);
        Ok(prefs)
    }

    pub async fn persist(&self, prefs: &Preferences) -> Result<(), PreferenceError> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }

        let json = serde_json::to_string_pretty(prefs).map_err(|source| PreferenceError::Serde {
            path: self.path.display().to_string(),
            source,
        })?;
        async_fs::write(&self.path, json)
            .await
            .map_err(|source| self.io_error(source))
    }

    async fn update<F>(&self, apply: F) -> Result<(), PreferenceError>
    where
        F: FnOnce(&mut Preferences) + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut prefs = self.load().await?;
        apply(&mut prefs);
        self.persist(&prefs).await
    }

    fn io_error(&self, source: std::io::Error) -> PreferenceError {
        PreferenceError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl PreferenceStore for PreferenceManager {
    async fn load_collections(&self) -> Result<Vec<CollectionRef>, PreferenceError> {
        Ok(self.load().await?.playlists)
    }

    async fn save_collections(&self, records: &[CollectionRef]) -> Result<(), PreferenceError> {
        let records = dedup_by_id(records.to_vec());
        self.update(move |prefs| prefs.playlists = records).await
    }

    async fn load_creators(&self) -> Result<Vec<CreatorRef>, PreferenceError> {
        Ok(self.load().await?.artists)
    }

    async fn save_creators(&self, records: &[CreatorRef]) -> Result<(), PreferenceError> {
        let records = dedup_by_id(records.to_vec());
        self.update(move |prefs| prefs.artists = records).await
    }
}

/// Drops records whose id was already seen, keeping the first one.
pub fn dedup_by_id(records: Vec<TriageRecord>) -> Vec<TriageRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.id.clone()))
        .collect()
}
