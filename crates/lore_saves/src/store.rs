//! Save slot store.
//!
//! Local slot files under `{root}/{studentId}/slot_{n}.json` are the
//! source of truth for resuming within a session. Every save mirrors the
//! slot to the remote document store fire-and-forget; remote failures
//! are logged and never fail the local operation.

use crate::codec::SaveSlotDoc;
use crate::data::{SaveSlotData, SlotView};
use crate::{SaveError, SaveResult};
use chrono::Utc;
use lore_core::ids::{SceneId, SlotNumber, StudentId};
use lore_core::session::SessionContext;
use lore_progress::ProgressService;
use lore_remote::{collections, DocumentStore};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct SaveSlotStore {
    root: PathBuf,
    session: Arc<SessionContext>,
    docs: Arc<dyn DocumentStore>,
    progress: Arc<ProgressService>,
    saving: AtomicBool,
}

impl SaveSlotStore {
    pub fn new(
        root: impl Into<PathBuf>,
        session: Arc<SessionContext>,
        docs: Arc<dyn DocumentStore>,
        progress: Arc<ProgressService>,
    ) -> Self {
        Self {
            root: root.into(),
            session,
            docs,
            progress,
            saving: AtomicBool::new(false),
        }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Writes the slot locally, then mirrors it to the remote store in
    /// the background with the current progress snapshot embedded.
    ///
    /// Returns `Ok(false)` when another save is already in flight (the
    /// later request is dropped, not queued). Fails with
    /// [`SaveError::SaveNotAllowed`] in teacher preview.
    pub async fn save_game(
        &self,
        slot: SlotNumber,
        scene: SceneId,
        dialogue_index: u32,
    ) -> SaveResult<bool> {
        if !self.session.can_save() {
            return Err(SaveError::SaveNotAllowed);
        }
        let student = self.require_student()?;
        if self
            .saving
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::debug!("Save already in progress; dropping slot {} request", slot);
            return Ok(false);
        }
        let result = self.save_inner(&student, slot, scene, dialogue_index);
        self.saving.store(false, Ordering::SeqCst);
        result.map(|_| true)
    }

    fn save_inner(
        &self,
        student: &StudentId,
        slot: SlotNumber,
        scene: SceneId,
        dialogue_index: u32,
    ) -> SaveResult<()> {
        let data = SaveSlotData {
            scene_id: scene,
            dialogue_index,
            saved_at: Utc::now(),
        };
        self.write_local(student, slot, &data)?;
        self.mirror_remote(student, slot, &data);
        Ok(())
    }

    /// Reads the local slot and resumes from it.
    ///
    /// As a side effect the matching remote document is fetched in the
    /// background and its progress snapshot, if present, replaces the
    /// in-memory aggregate. The remote snapshot wins over the local
    /// cache on an explicit load; that is what makes cross-device
    /// resume correct.
    pub async fn load_game(&self, slot: SlotNumber) -> SaveResult<SaveSlotData> {
        let student = self.require_student()?;
        let data = self.read_local(&student, slot)?;
        self.spawn_snapshot_pull(&student, slot);
        Ok(data)
    }

    /// Removes the local and remote copies. Idempotent on both sides.
    pub async fn delete_save(&self, slot: SlotNumber) -> SaveResult<()> {
        let student = self.require_student()?;
        let path = self.slot_path(&student, slot);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        let docs = self.docs.clone();
        let id = collections::save_slot_doc_id(&student, slot);
        tokio::spawn(async move {
            if let Err(err) = docs.delete(collections::SAVE_DATA, &id).await {
                log::warn!("Failed to delete remote save {}: {}", id, err);
            }
        });
        Ok(())
    }

    /// Local-only existence probe. False when nobody is signed in.
    pub fn has_save_file(&self, slot: SlotNumber) -> bool {
        match self.session.active_student() {
            Some(student) => self.slot_path(&student, slot).exists(),
            None => false,
        }
    }

    /// What the save menu shows, from local files only. Unreadable slot
    /// files are cleared and render as empty.
    pub fn local_views(&self) -> [SlotView; 4] {
        let Some(student) = self.session.active_student() else {
            return std::array::from_fn(|_| SlotView::Empty);
        };
        SlotNumber::ALL.map(|slot| match self.read_local(&student, slot) {
            Ok(data) => SlotView::Occupied(data),
            Err(_) => SlotView::Empty,
        })
    }

    /// Rewrites every populated slot to the given position; empty slots
    /// stay empty. Returns how many slots were rewritten.
    ///
    /// Invariant: after a scored challenge completes, no slot may point
    /// at a position before it, or reloading would let the student
    /// replay the challenge for a better score.
    pub async fn overwrite_all_saves_after_challenge(
        &self,
        scene: SceneId,
        dialogue_index: u32,
    ) -> SaveResult<u32> {
        if !self.session.can_save() {
            return Err(SaveError::SaveNotAllowed);
        }
        let student = self.require_student()?;
        let mut rewritten = 0;
        for slot in SlotNumber::ALL {
            if !self.slot_path(&student, slot).exists() {
                continue;
            }
            let data = SaveSlotData {
                scene_id: scene.clone(),
                dialogue_index,
                saved_at: Utc::now(),
            };
            self.write_local(&student, slot, &data)?;
            self.mirror_remote(&student, slot, &data);
            rewritten += 1;
        }
        Ok(rewritten)
    }

    /// Pulls one slot's remote document into the local file.
    ///
    /// The sync coordinator fans this out over all four slots when the
    /// save menu opens. An absent or malformed remote document leaves
    /// the local file alone; the returned bool is whether the slot is
    /// populated afterwards.
    pub async fn pull_remote(&self, slot: SlotNumber) -> SaveResult<bool> {
        let student = self.require_student()?;
        let id = collections::save_slot_doc_id(&student, slot);
        let Some(value) = self.docs.get(collections::SAVE_DATA, &id).await? else {
            return Ok(self.slot_path(&student, slot).exists());
        };
        let data = serde_json::from_value::<SaveSlotDoc>(value)
            .ok()
            .and_then(|doc| doc.slot_data());
        match data {
            Some(data) => {
                self.write_local(&student, slot, &data)?;
                Ok(true)
            }
            None => {
                log::warn!("Malformed remote save {}; keeping the local copy", id);
                Ok(self.slot_path(&student, slot).exists())
            }
        }
    }

    fn require_student(&self) -> SaveResult<StudentId> {
        self.session
            .active_student()
            .ok_or(SaveError::NoActiveStudent)
    }

    fn slot_path(&self, student: &StudentId, slot: SlotNumber) -> PathBuf {
        self.root
            .join(student.as_str())
            .join(format!("slot_{}.json", slot))
    }

    // Atomic local write: temp file in the same directory, then rename.
    fn write_local(
        &self,
        student: &StudentId,
        slot: SlotNumber,
        data: &SaveSlotData,
    ) -> SaveResult<()> {
        let dir = self.root.join(student.as_str());
        std::fs::create_dir_all(&dir)?;
        let json = serde_json::to_string_pretty(data)
            .map_err(|e| SaveError::Serialization(e.to_string()))?;
        let tmp = dir.join(format!(".slot_{}.json.tmp", slot));
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, dir.join(format!("slot_{}.json", slot)))?;
        Ok(())
    }

    fn read_local(&self, student: &StudentId, slot: SlotNumber) -> SaveResult<SaveSlotData> {
        let path = self.slot_path(student, slot);
        if !path.exists() {
            return Err(SaveError::SlotEmpty(slot));
        }
        let raw = std::fs::read_to_string(&path)?;
        match serde_json::from_str(&raw) {
            Ok(data) => Ok(data),
            Err(err) => {
                log::warn!(
                    "Save slot {} for {} is unreadable: {} (clearing it)",
                    slot,
                    student,
                    err
                );
                let _ = std::fs::remove_file(&path);
                Err(SaveError::SlotCorrupt(slot))
            }
        }
    }

    fn mirror_remote(&self, student: &StudentId, slot: SlotNumber, data: &SaveSlotData) {
        let doc = SaveSlotDoc::from_parts(student, slot, data, &self.progress.progress());
        let value = match serde_json::to_value(&doc) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("Failed to encode save slot {} document: {}", slot, err);
                return;
            }
        };
        let docs = self.docs.clone();
        let id = collections::save_slot_doc_id(student, slot);
        tokio::spawn(async move {
            if let Err(err) = docs.put(collections::SAVE_DATA, &id, value).await {
                log::warn!("Failed to mirror save slot {}: {}", id, err);
            }
        });
    }

    fn spawn_snapshot_pull(&self, student: &StudentId, slot: SlotNumber) {
        let docs = self.docs.clone();
        let progress = self.progress.clone();
        let student = student.clone();
        let id = collections::save_slot_doc_id(&student, slot);
        tokio::spawn(async move {
            let value = match docs.get(collections::SAVE_DATA, &id).await {
                Ok(Some(value)) => value,
                Ok(None) => return,
                Err(err) => {
                    log::warn!("Remote save {} unavailable: {}", id, err);
                    return;
                }
            };
            let doc: SaveSlotDoc = match serde_json::from_value(value) {
                Ok(doc) => doc,
                Err(err) => {
                    log::warn!("Malformed remote save {}: {}", id, err);
                    return;
                }
            };
            if let Some(snapshot) = doc.snapshot() {
                progress.replace_with_snapshot(&student, snapshot);
            }
        });
    }
}
