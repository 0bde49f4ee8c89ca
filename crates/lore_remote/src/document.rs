//! Document store seam.
//!
//! The remote database is modeled as named collections of JSON documents
//! addressed by string ids. Two write shapes exist and the distinction
//! matters: `put` replaces a whole document (save slots), `merge` upserts
//! top-level fields and leaves the rest intact (progress documents).

use crate::{RemoteError, RemoteResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Collection names and document-id builders, kept in one place so the
/// wire schema cannot drift between callers.
pub mod collections {
    use lore_core::ids::{SlotNumber, StudentId};

    /// Score rollups per student.
    pub const STUDENT_PROGRESS: &str = "studentProgress";
    /// Unlocks, hearts, and the current story per student.
    pub const GAME_PROGRESS: &str = "gameProgress";
    /// One full-replace document per save slot.
    pub const SAVE_DATA: &str = "saveData";
    /// First-attempt leaderboard entry per student.
    pub const STUDENT_LEADERBOARDS: &str = "studentLeaderboards";

    /// Append-only quiz attempt log for one student.
    pub fn quiz_attempts(student: &StudentId) -> String {
        format!("quizAttempts/{}/attempts", student)
    }

    /// Save-slot document id, `{studentId}_slot_{n}`.
    pub fn save_slot_doc_id(student: &StudentId, slot: SlotNumber) -> String {
        format!("{}_slot_{}", student, slot)
    }
}

/// Remote JSON document database.
///
/// `delete` is idempotent; deleting an absent document succeeds. `list`
/// returns documents in unspecified order.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> RemoteResult<Option<Value>>;

    /// Replaces the whole document.
    async fn put(&self, collection: &str, id: &str, doc: Value) -> RemoteResult<()>;

    /// Upserts top-level fields, leaving unmentioned fields intact.
    async fn merge(&self, collection: &str, id: &str, fields: Value) -> RemoteResult<()>;

    async fn delete(&self, collection: &str, id: &str) -> RemoteResult<()>;

    /// Appends with a store-generated id, returning the id.
    async fn add(&self, collection: &str, doc: Value) -> RemoteResult<String>;

    async fn list(&self, collection: &str) -> RemoteResult<Vec<Value>>;
}

/// In-memory document store for tests and offline development.
///
/// Fault injection: `set_offline` fails every call, `set_latency` delays
/// every call (which lets a test hold an operation in flight), and
/// per-operation counters record how often the store was actually hit.
#[derive(Default)]
pub struct MemoryDocumentStore {
    data: RwLock<HashMap<String, BTreeMap<String, Value>>>,
    offline: AtomicBool,
    latency: RwLock<Option<Duration>>,
    gets: AtomicU64,
    puts: AtomicU64,
    merges: AtomicU64,
    deletes: AtomicU64,
    adds: AtomicU64,
    lists: AtomicU64,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Delay applied before every operation answers.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write() = Some(latency);
    }

    pub fn get_count(&self) -> u64 {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn put_count(&self) -> u64 {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn merge_count(&self) -> u64 {
        self.merges.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> u64 {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn add_count(&self) -> u64 {
        self.adds.load(Ordering::SeqCst)
    }

    pub fn list_count(&self) -> u64 {
        self.lists.load(Ordering::SeqCst)
    }

    /// Documents currently held in a collection.
    pub fn collection_len(&self, collection: &str) -> usize {
        self.data
            .read()
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    // Latency is read in its own scope; no guard is held across the
    // sleep.
    async fn gate(&self) -> RemoteResult<()> {
        let latency = *self.latency.read();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("store is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> RemoteResult<Option<Value>> {
        self.gate().await?;
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .data
            .read()
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn put(&self, collection: &str, id: &str, doc: Value) -> RemoteResult<()> {
        self.gate().await?;
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.data
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), doc);
        Ok(())
    }

    async fn merge(&self, collection: &str, id: &str, fields: Value) -> RemoteResult<()> {
        self.gate().await?;
        self.merges.fetch_add(1, Ordering::SeqCst);
        let mut data = self.data.write();
        let doc = data
            .entry(collection.to_string())
            .or_default()
            .entry(id.to_string())
            .or_insert_with(|| Value::Object(Default::default()));
        match fields {
            Value::Object(incoming) => {
                if let Value::Object(existing) = doc {
                    for (key, value) in incoming {
                        existing.insert(key, value);
                    }
                } else {
                    *doc = Value::Object(incoming);
                }
            }
            other => *doc = other,
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> RemoteResult<()> {
        self.gate().await?;
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if let Some(docs) = self.data.write().get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn add(&self, collection: &str, doc: Value) -> RemoteResult<String> {
        self.gate().await?;
        self.adds.fetch_add(1, Ordering::SeqCst);
        let id = uuid::Uuid::new_v4().to_string();
        self.data
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), doc);
        Ok(id)
    }

    async fn list(&self, collection: &str) -> RemoteResult<Vec<Value>> {
        self.gate().await?;
        self.lists.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .data
            .read()
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }
}
