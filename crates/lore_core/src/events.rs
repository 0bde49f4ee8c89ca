//! Game event channel.
//!
//! UI layers observe domain transitions through this channel instead of
//! being called back directly. Senders are cheap clones; a missing
//! listener is normal and never blocks game logic.

use crate::catalog::Civilization;
use crate::ids::{AchievementId, ArtifactId, ChapterId, StoryId};
use crossbeam_channel::{Receiver, Sender};

/// A domain transition worth surfacing to the player.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// Fired exactly once, when the chapter first unlocks.
    ChapterUnlocked(ChapterId),
    /// Fired exactly once, when the story first unlocks.
    StoryUnlocked(StoryId),
    /// Fired exactly once, when the achievement first unlocks.
    AchievementUnlocked(AchievementId),
    /// Fired exactly once, when the artifact first unlocks.
    ArtifactUnlocked(ArtifactId),
    /// Fired exactly once, when the civilization first unlocks.
    CivilizationUnlocked(Civilization),
    /// Hearts changed to the carried count.
    HeartsChanged(u32),
    /// A score recalculation finished with these rollups.
    ScoresRecalculated { overall_score: u32, success_rate: f32 },
    /// All four save slots are ready for display. Fired once per load
    /// cycle, a degraded (signed-out) cycle included.
    SlotsLoaded,
}

/// Creates a connected sender/receiver pair.
pub fn channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (EventSender { tx }, EventReceiver { rx })
}

/// Sending half. Never blocks; events sent with no live receiver are
/// dropped.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<GameEvent>,
}

impl EventSender {
    pub fn send(&self, event: GameEvent) {
        let _ = self.tx.send(event);
    }
}

/// Receiving half, polled by UI loops.
#[derive(Debug, Clone)]
pub struct EventReceiver {
    rx: Receiver<GameEvent>,
}

impl EventReceiver {
    /// Non-blocking poll for per-frame pumps.
    pub fn try_recv(&self) -> Option<GameEvent> {
        self.rx.try_recv().ok()
    }

    /// Drains everything currently queued.
    pub fn drain(&self) -> Vec<GameEvent> {
        self.rx.try_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
