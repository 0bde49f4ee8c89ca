//! Preference storage.

use crate::{PrefsError, PrefsResult};
use lore_core::ids::StudentId;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const PREFS_FILE: &str = "prefs.json";

/// Well-known preference keys.
pub mod keys {
    /// Cached copy of the student's progress aggregate.
    pub const PROGRESS_CACHE: &str = "progress";
    /// Save slot last chosen in the save menu.
    pub const SELECTED_SLOT: &str = "selectedSlot";
}

/// Factory for per-student preference handles.
#[derive(Debug, Clone)]
pub struct PrefsStore {
    root: PathBuf,
}

impl PrefsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Handle for one student's preferences,
    /// `{root}/{studentId}/prefs.json`.
    ///
    /// Each handle keeps its own lazy cache; create one per student and
    /// share it rather than constructing handles ad hoc.
    pub fn student(&self, student: &StudentId) -> StudentPrefs {
        let dir = self.root.join(student.as_str());
        StudentPrefs {
            student: student.clone(),
            path: dir.join(PREFS_FILE),
            dir,
            state: Mutex::new(None),
        }
    }
}

/// One student's preferences.
///
/// The file is loaded lazily on first access and every write goes
/// through to disk, so a crash never loses more than the in-flight
/// write.
#[derive(Debug)]
pub struct StudentPrefs {
    student: StudentId,
    dir: PathBuf,
    path: PathBuf,
    state: Mutex<Option<HashMap<String, Value>>>,
}

impl StudentPrefs {
    pub fn student(&self) -> &StudentId {
        &self.student
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// String value, or `default` when absent or not a string.
    pub fn get_string(&self, key: &str, default: &str) -> String {
        match self.get_entry(key) {
            Some(Value::String(s)) => s,
            Some(_) => {
                self.clear_corrupt_entry(key);
                default.to_string()
            }
            None => default.to_string(),
        }
    }

    pub fn set_string(&self, key: &str, value: &str) -> PrefsResult<()> {
        self.set_entry(key, Value::String(value.to_string()))
    }

    /// Integer value, or `default` when absent or unparseable. Digit
    /// strings from older files are accepted.
    pub fn get_u32(&self, key: &str, default: u32) -> u32 {
        let parsed = match self.get_entry(key) {
            Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Some(Value::String(s)) => s.trim().parse().ok(),
            Some(_) => None,
            None => return default,
        };
        match parsed {
            Some(n) => n,
            None => {
                self.clear_corrupt_entry(key);
                default
            }
        }
    }

    pub fn set_u32(&self, key: &str, value: u32) -> PrefsResult<()> {
        self.set_entry(key, Value::from(value))
    }

    /// Typed JSON blob, or `None` when absent or unparseable. An
    /// unparseable blob is cleared.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_entry(key)?;
        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                log::warn!(
                    "Corrupt preference '{}' for student {}: {}",
                    key,
                    self.student,
                    err
                );
                self.clear_corrupt_entry(key);
                None
            }
        }
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> PrefsResult<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| PrefsError::Serialization(e.to_string()))?;
        self.set_entry(key, value)
    }

    pub fn contains(&self, key: &str) -> bool {
        let mut state = self.state.lock();
        self.loaded(&mut state).contains_key(key)
    }

    /// Removes a key. Removing an absent key is a no-op.
    pub fn delete(&self, key: &str) -> PrefsResult<()> {
        let mut state = self.state.lock();
        let map = self.loaded(&mut state);
        if map.remove(key).is_some() {
            self.persist(map)?;
        }
        Ok(())
    }

    /// Drops every key and removes the file.
    pub fn clear(&self) -> PrefsResult<()> {
        let mut state = self.state.lock();
        *state = Some(HashMap::new());
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    fn get_entry(&self, key: &str) -> Option<Value> {
        let mut state = self.state.lock();
        self.loaded(&mut state).get(key).cloned()
    }

    fn set_entry(&self, key: &str, value: Value) -> PrefsResult<()> {
        let mut state = self.state.lock();
        let map = self.loaded(&mut state);
        map.insert(key.to_string(), value);
        self.persist(map)
    }

    /// Drops an entry that failed to parse. Read paths stay infallible,
    /// so a failed persist here is only logged.
    fn clear_corrupt_entry(&self, key: &str) {
        log::warn!(
            "Clearing corrupt preference '{}' for student {}",
            key,
            self.student
        );
        let mut state = self.state.lock();
        let map = self.loaded(&mut state);
        if map.remove(key).is_some() {
            if let Err(err) = self.persist(map) {
                log::warn!("Failed to persist preference cleanup: {}", err);
            }
        }
    }

    fn loaded<'a>(
        &self,
        state: &'a mut Option<HashMap<String, Value>>,
    ) -> &'a mut HashMap<String, Value> {
        state.get_or_insert_with(|| self.load_from_disk())
    }

    /// A wholly unreadable file is treated as empty and removed, so the
    /// next write starts clean. Callers fall back to their defaults, the
    /// same as a cache miss.
    fn load_from_disk(&self) -> HashMap<String, Value> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return HashMap::new(),
        };
        match serde_json::from_str::<HashMap<String, Value>>(&raw) {
            Ok(map) => map,
            Err(err) => {
                log::warn!(
                    "Corrupt preference file for student {} ({}); starting empty",
                    self.student,
                    err
                );
                if let Err(err) = fs::remove_file(&self.path) {
                    log::warn!("Failed to remove corrupt preference file: {}", err);
                }
                HashMap::new()
            }
        }
    }

    // Write to a temp file first, then rename. A crash mid-write leaves
    // the previous file intact.
    fn persist(&self, map: &HashMap<String, Value>) -> PrefsResult<()> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(map)
            .map_err(|e| PrefsError::Serialization(e.to_string()))?;
        let temp_path = self.dir.join(format!(".{}.tmp", PREFS_FILE));
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn test_store(name: &str) -> PrefsStore {
        let dir = std::env::temp_dir().join(format!(
            "lore_prefs_{}_{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        PrefsStore::new(dir)
    }

    fn cleanup(store: &PrefsStore) {
        let _ = fs::remove_dir_all(store.root());
    }

    #[test]
    fn test_set_get_round_trip_across_handles() {
        let store = test_store("round_trip");
        let student = StudentId::new("s-1");

        let prefs = store.student(&student);
        prefs.set_string("name", "Aria").unwrap();
        prefs.set_u32(keys::SELECTED_SLOT, 2).unwrap();

        // A fresh handle reads from disk.
        let reloaded = store.student(&student);
        assert_eq!(reloaded.get_string("name", ""), "Aria");
        assert_eq!(reloaded.get_u32(keys::SELECTED_SLOT, 1), 2);

        cleanup(&store);
    }

    #[test]
    fn test_missing_keys_yield_defaults() {
        let store = test_store("defaults");
        let prefs = store.student(&StudentId::new("s-1"));
        assert_eq!(prefs.get_string("missing", "fallback"), "fallback");
        assert_eq!(prefs.get_u32("missing", 7), 7);
        assert_eq!(prefs.get_json::<Vec<String>>("missing"), None);
        cleanup(&store);
    }

    #[test]
    fn test_students_are_namespaced() {
        let store = test_store("namespaced");
        let a = store.student(&StudentId::new("s-a"));
        let b = store.student(&StudentId::new("s-b"));

        a.set_u32("hearts", 1).unwrap();
        b.set_u32("hearts", 3).unwrap();

        assert_eq!(a.get_u32("hearts", 0), 1);
        assert_eq!(b.get_u32("hearts", 0), 3);
        cleanup(&store);
    }

    #[test]
    fn test_corrupt_file_treated_as_empty_and_removed() {
        let store = test_store("corrupt_file");
        let student = StudentId::new("s-1");
        let prefs = store.student(&student);
        prefs.set_string("key", "value").unwrap();

        fs::write(prefs.path(), "{not json at all").unwrap();

        let reloaded = store.student(&student);
        assert_eq!(reloaded.get_string("key", "fallback"), "fallback");
        assert!(!reloaded.path().exists());

        // The store still accepts writes afterwards.
        reloaded.set_string("key", "again").unwrap();
        assert_eq!(reloaded.get_string("key", ""), "again");
        cleanup(&store);
    }

    #[test]
    fn test_wrong_shape_entry_is_cleared() {
        let store = test_store("wrong_shape");
        let prefs = store.student(&StudentId::new("s-1"));
        prefs.set_string("count", "not a number").unwrap();

        assert_eq!(prefs.get_u32("count", 9), 9);
        assert!(!prefs.contains("count"));
        cleanup(&store);
    }

    #[test]
    fn test_numeric_strings_from_legacy_files_parse() {
        let store = test_store("legacy_numeric");
        let prefs = store.student(&StudentId::new("s-1"));
        prefs.set_string("slot", "3").unwrap();
        assert_eq!(prefs.get_u32("slot", 1), 3);
        cleanup(&store);
    }

    #[test]
    fn test_json_blob_round_trip_and_corruption() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Blob {
            hearts: u32,
            stories: Vec<String>,
        }

        let store = test_store("json_blob");
        let prefs = store.student(&StudentId::new("s-1"));
        let blob = Blob {
            hearts: 3,
            stories: vec!["ST001".to_string()],
        };
        prefs.set_json(keys::PROGRESS_CACHE, &blob).unwrap();
        assert_eq!(prefs.get_json::<Blob>(keys::PROGRESS_CACHE), Some(blob));

        // A blob of the wrong shape is cleared on read.
        prefs.set_string(keys::PROGRESS_CACHE, "garbage").unwrap();
        assert_eq!(prefs.get_json::<Blob>(keys::PROGRESS_CACHE), None);
        assert!(!prefs.contains(keys::PROGRESS_CACHE));
        cleanup(&store);
    }

    #[test]
    fn test_delete_and_clear_are_idempotent() {
        let store = test_store("delete_clear");
        let prefs = store.student(&StudentId::new("s-1"));
        prefs.set_string("key", "value").unwrap();

        prefs.delete("key").unwrap();
        prefs.delete("key").unwrap();
        assert!(!prefs.contains("key"));

        prefs.clear().unwrap();
        prefs.clear().unwrap();
        assert!(!prefs.path().exists());
        cleanup(&store);
    }
}
