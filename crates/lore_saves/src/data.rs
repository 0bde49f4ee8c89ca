//! Save slot data and menu views.

use chrono::{DateTime, Utc};
use lore_core::catalog::SceneTable;
use lore_core::ids::SceneId;
use serde::{Deserialize, Serialize};

/// Position captured by one save slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveSlotData {
    pub scene_id: SceneId,
    pub dialogue_index: u32,
    pub saved_at: DateTime<Utc>,
}

/// What the save menu shows for one slot.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotView {
    Empty,
    Occupied(SaveSlotData),
}

impl SlotView {
    pub fn is_empty(&self) -> bool {
        matches!(self, SlotView::Empty)
    }

    pub fn data(&self) -> Option<&SaveSlotData> {
        match self {
            SlotView::Empty => None,
            SlotView::Occupied(data) => Some(data),
        }
    }

    /// Menu label: "Empty" for an empty slot, otherwise the scene's
    /// friendly name and the save time.
    pub fn label(&self, scenes: &SceneTable) -> String {
        match self {
            SlotView::Empty => "Empty".to_string(),
            SlotView::Occupied(data) => format!(
                "{} - {}",
                scenes.friendly_name(&data.scene_id),
                data.saved_at.format("%Y-%m-%d %H:%M")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_empty_slot_label() {
        let scenes = SceneTable::builtin();
        assert_eq!(SlotView::Empty.label(&scenes), "Empty");
    }

    #[test]
    fn test_occupied_slot_label_uses_friendly_name() {
        let scenes = SceneTable::builtin();
        let view = SlotView::Occupied(SaveSlotData {
            scene_id: SceneId::new("SumerianStory"),
            dialogue_index: 4,
            saved_at: Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap(),
        });
        assert_eq!(view.label(&scenes), "The Cradle of Writing - 2026-03-14 09:30");
    }

    #[test]
    fn test_unknown_scene_falls_back_to_raw_id() {
        let scenes = SceneTable::builtin();
        let view = SlotView::Occupied(SaveSlotData {
            scene_id: SceneId::new("RemovedScene"),
            dialogue_index: 0,
            saved_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        });
        assert!(view.label(&scenes).starts_with("RemovedScene"));
    }
}
