//! Favorites and recents persistence with file locking.
//!
//! Preferences live in a single JSON file in the data directory. Reads take
//! a shared lock; writes go to a locked temp file that is renamed over the
//! original, so a crash mid-write never leaves a truncated file behind.

use crate::config::RecentsConfig;
use crate::{Error, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// User favorites and recently used items
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Preferences {
    /// Favorite medication ids in the order they were added
    #[serde(default)]
    pub favorites: Vec<String>,

    /// Search terms, most recent first
    #[serde(default)]
    pub recent_searches: Vec<String>,

    /// Viewed medication ids, most recent first
    #[serde(default)]
    pub recent_medications: Vec<String>,
}

/// Put `item` at the front of `list`, dropping older copies and anything
/// past `max_items`
fn push_recent(list: &mut Vec<String>, item: &str, max_items: usize) {
    list.retain(|existing| existing != item);
    list.insert(0, item.to_string());
    list.truncate(max_items);
}

impl Preferences {
    /// Add or remove a favorite; returns whether it is now a favorite
    pub fn toggle_favorite(&mut self, medication_id: &str) -> bool {
        if self.is_favorite(medication_id) {
            self.favorites.retain(|id| id != medication_id);
            false
        } else {
            self.favorites.push(medication_id.to_string());
            true
        }
    }

    pub fn is_favorite(&self, medication_id: &str) -> bool {
        self.favorites.iter().any(|id| id == medication_id)
    }

    /// Remember a search term
    ///
    /// Terms shorter than `limits.min_search_len` once trimmed are ignored.
    pub fn add_recent_search(&mut self, term: &str, limits: &RecentsConfig) {
        let term = term.trim();
        if term.is_empty() || term.chars().count() < limits.min_search_len {
            return;
        }
        push_recent(&mut self.recent_searches, term, limits.max_items);
    }

    pub fn add_recent_medication(&mut self, medication_id: &str, limits: &RecentsConfig) {
        if medication_id.is_empty() {
            return;
        }
        push_recent(&mut self.recent_medications, medication_id, limits.max_items);
    }

    pub fn clear_recent_searches(&mut self) {
        self.recent_searches.clear();
    }

    pub fn clear_recent_medications(&mut self) {
        self.recent_medications.clear();
    }

    /// Load preferences from a file with shared locking
    ///
    /// Returns defaults if the file doesn't exist.
    /// If the file is unreadable or corrupted, logs a warning and returns defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No preferences file found, using defaults");
            return Ok(Self::default());
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(
                    "Unable to open preferences file {:?}: {}. Using defaults.",
                    path,
                    e
                );
                return Ok(Self::default());
            }
        };

        if let Err(e) = file.lock_shared() {
            tracing::warn!(
                "Unable to lock preferences file {:?}: {}. Using defaults.",
                path,
                e
            );
            return Ok(Self::default());
        }

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        if let Err(e) = reader.read_to_string(&mut contents) {
            let _ = file.unlock();
            tracing::warn!(
                "Failed to read preferences file {:?}: {}. Using defaults.",
                path,
                e
            );
            return Ok(Self::default());
        }

        file.unlock()?;

        match serde_json::from_str::<Preferences>(&contents) {
            Ok(prefs) => {
                tracing::debug!("Loaded preferences from {:?}", path);
                Ok(prefs)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to parse preferences file {:?}: {}. Using defaults.",
                    path,
                    e
                );
                Ok(Self::default())
            }
        }
    }

    /// Save preferences with exclusive locking
    ///
    /// Atomically writes by:
    /// 1. Writing to a temp file
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::State(format!("preferences path {:?} has no parent", path)))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved preferences to {:?}", path);
        Ok(())
    }

    /// Load preferences, modify them, and save them back atomically
    pub fn update<F>(path: &Path, f: F) -> Result<Self>
    where
        F: FnOnce(&mut Preferences) -> Result<()>,
    {
        let mut prefs = Self::load(path)?;
        f(&mut prefs)?;
        prefs.save(path)?;
        Ok(prefs)
    }
}
