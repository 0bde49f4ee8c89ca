//! The `saveData/{studentId}_slot_{n}` document.
//!
//! A slot document carries the saved position plus a snapshot of the
//! student's progress and scores at save time, so an explicit load can
//! restore all of it in one fetch. Written with `put` (full replace);
//! a slot is either wholly present or wholly absent.

use crate::data::SaveSlotData;
use lore_core::ids::{SceneId, SlotNumber, StudentId};
use lore_progress::codec::{lenient_u32, parse_timestamp, GameProgressDoc, StudentScoreDoc};
use lore_progress::StudentProgress;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaveSlotDoc {
    pub student_id: String,
    pub slot: Option<Value>,
    pub scene_id: String,
    pub dialogue_index: Option<Value>,
    pub timestamp: Option<String>,
    pub progress: Option<GameProgressDoc>,
    pub scores: Option<StudentScoreDoc>,
}

impl SaveSlotDoc {
    pub fn from_parts(
        student: &StudentId,
        slot: SlotNumber,
        data: &SaveSlotData,
        progress: &StudentProgress,
    ) -> Self {
        Self {
            student_id: student.as_str().to_string(),
            slot: Some(Value::from(u32::from(slot.get()))),
            scene_id: data.scene_id.as_str().to_string(),
            dialogue_index: Some(Value::from(data.dialogue_index)),
            timestamp: Some(data.saved_at.to_rfc3339()),
            progress: Some(GameProgressDoc::from_progress(progress)),
            scores: Some(StudentScoreDoc::from_scores(
                progress.overall_score(),
                progress.success_rate(),
            )),
        }
    }

    /// The saved position, or `None` when the document has no scene.
    pub fn slot_data(&self) -> Option<SaveSlotData> {
        if self.scene_id.is_empty() {
            return None;
        }
        Some(SaveSlotData {
            scene_id: SceneId::new(self.scene_id.clone()),
            dialogue_index: self
                .dialogue_index
                .as_ref()
                .and_then(lenient_u32)
                .unwrap_or(0),
            saved_at: parse_timestamp(self.timestamp.as_deref()),
        })
    }

    /// The embedded progress snapshot, or `None` when the document
    /// carries none. Zero-valued stored scores come back stale so they
    /// are recomputed rather than trusted.
    pub fn snapshot(&self) -> Option<StudentProgress> {
        let mut progress = self.progress.clone()?.into_progress();
        if let Some(scores) = &self.scores {
            let overall = scores.overall_score_value();
            let rate = scores.success_rate_value();
            progress.set_scores(overall, rate);
            if overall == 0 && rate == 0.0 {
                progress.mark_scores_stale();
            }
        }
        Some(progress)
    }
}
