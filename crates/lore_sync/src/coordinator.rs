//! The synchronization coordinator.
//!
//! Two triggers exist: `on_session_start` (initialize the progress
//! aggregate once sign-in lands) and `enter_save_menu` (pull all four
//! slots, then publish the views). Both wait a bounded time for the
//! student session and degrade instead of hanging. Atomic guards make
//! overlapping triggers no-ops, and a cooldown spaces out persists so
//! rapid triggers cannot storm the remote store.

use crate::{SyncError, SyncResult};
use futures_util::future::join_all;
use lore_core::events::{EventSender, GameEvent};
use lore_core::ids::SlotNumber;
use lore_core::session::SessionContext;
use lore_prefs::{keys, PrefsStore};
use lore_progress::{ProgressError, ProgressService};
use lore_saves::{SaveSlotStore, SlotView};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Coordinator timing knobs.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// How long a trigger waits for a signed-in student before
    /// degrading to defaults.
    pub session_wait: Duration,
    /// Minimum spacing between consecutive persists.
    pub persist_cooldown: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            session_wait: Duration::from_secs(8),
            persist_cooldown: Duration::from_secs(2),
        }
    }
}

impl SyncConfig {
    /// Short windows for tests.
    pub fn testing() -> Self {
        Self {
            session_wait: Duration::from_millis(50),
            persist_cooldown: Duration::from_millis(100),
        }
    }
}

/// Coordinator counters.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Completed save-menu load cycles, degraded cycles included.
    pub load_cycles: u64,
    /// Individual slot pulls that completed.
    pub slots_pulled: u64,
    /// Individual slot pulls that failed (logged, local copy kept).
    pub pull_failures: u64,
    /// Persists that reached the remote store.
    pub persists: u64,
    /// Persists dropped by the cooldown window.
    pub persists_skipped: u64,
}

pub struct SyncCoordinator {
    session: Arc<SessionContext>,
    saves: Arc<SaveSlotStore>,
    progress: Arc<ProgressService>,
    prefs: PrefsStore,
    events: EventSender,
    config: SyncConfig,
    loading: AtomicBool,
    initializing: AtomicBool,
    /// Check-and-claim stamp for the persist cooldown.
    last_persist: Mutex<Option<Instant>>,
    stats: RwLock<SyncStats>,
}

impl SyncCoordinator {
    pub fn new(
        session: Arc<SessionContext>,
        saves: Arc<SaveSlotStore>,
        progress: Arc<ProgressService>,
        prefs: PrefsStore,
        events: EventSender,
        config: SyncConfig,
    ) -> Self {
        Self {
            session,
            saves,
            progress,
            prefs,
            events,
            config,
            loading: AtomicBool::new(false),
            initializing: AtomicBool::new(false),
            last_persist: Mutex::new(None),
            stats: RwLock::new(SyncStats::default()),
        }
    }

    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Session-start trigger: waits for sign-in with a bound, then
    /// initializes the progress aggregate. A second trigger while one is
    /// running is a no-op; a timeout leaves progress uninitialized and
    /// is not an error.
    pub async fn on_session_start(&self) -> SyncResult<()> {
        if self
            .initializing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::debug!("Session start already in progress; ignoring trigger");
            return Ok(());
        }
        let result = self.initialize_inner().await;
        self.initializing.store(false, Ordering::SeqCst);
        result
    }

    async fn initialize_inner(&self) -> SyncResult<()> {
        let Some(student) = self.session.wait_for_student(self.config.session_wait).await
        else {
            log::warn!(
                "No student session within {:?}; progress stays uninitialized",
                self.config.session_wait
            );
            return Ok(());
        };
        self.progress.initialize().await?;
        log::info!("Progress initialized for {}", student);
        Ok(())
    }

    /// Save-menu trigger: pulls all four slots concurrently, rebuilds
    /// the views from local files, and fires [`GameEvent::SlotsLoaded`]
    /// exactly once per cycle, regardless of completion order.
    ///
    /// Returns `Ok(None)` when a load cycle is already in flight (the
    /// second trigger is dropped, not queued). Without a student inside
    /// the bounded wait, the cycle completes degraded: four empty views,
    /// still exactly one `SlotsLoaded`.
    pub async fn enter_save_menu(&self) -> SyncResult<Option<[SlotView; 4]>> {
        if self
            .loading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::debug!("Slot load already in flight; ignoring trigger");
            return Ok(None);
        }
        let views = self.load_slots().await;
        self.loading.store(false, Ordering::SeqCst);
        self.stats.write().load_cycles += 1;
        self.events.send(GameEvent::SlotsLoaded);
        Ok(Some(views))
    }

    async fn load_slots(&self) -> [SlotView; 4] {
        if self
            .session
            .wait_for_student(self.config.session_wait)
            .await
            .is_none()
        {
            log::warn!(
                "No student session within {:?}; showing empty slots",
                self.config.session_wait
            );
            return std::array::from_fn(|_| SlotView::Empty);
        }
        let pulls = SlotNumber::ALL.map(|slot| self.saves.pull_remote(slot));
        let results = join_all(pulls).await;
        {
            let mut stats = self.stats.write();
            for (slot, result) in SlotNumber::ALL.iter().zip(&results) {
                match result {
                    Ok(_) => stats.slots_pulled += 1,
                    Err(err) => {
                        stats.pull_failures += 1;
                        log::warn!("Slot {} pull failed: {} (keeping the local copy)", slot, err);
                    }
                }
            }
        }
        self.saves.local_views()
    }

    /// Persists the progress aggregate, spaced by the cooldown.
    ///
    /// A call inside the window returns `Ok(false)` and writes nothing.
    /// A remote failure is logged and swallowed; the local cache was
    /// already refreshed and the next persist will carry the same state.
    pub async fn persist_progress(&self) -> SyncResult<bool> {
        {
            let mut gate = self.last_persist.lock();
            if let Some(at) = *gate {
                if at.elapsed() < self.config.persist_cooldown {
                    log::debug!(
                        "Persist suppressed inside the {:?} cooldown",
                        self.config.persist_cooldown
                    );
                    self.stats.write().persists_skipped += 1;
                    return Ok(false);
                }
            }
            *gate = Some(Instant::now());
        }
        match self.progress.persist().await {
            Ok(()) => {}
            Err(ProgressError::Remote(err)) => {
                log::warn!("Progress mirror unavailable: {}", err);
            }
            Err(err) => return Err(SyncError::Progress(err)),
        }
        self.stats.write().persists += 1;
        Ok(true)
    }

    /// The single designated save-after-recalculation path.
    ///
    /// Recalculation on its own never persists and persisting never
    /// recalculates; composing them only here is what keeps a load from
    /// triggering a save from triggering another load.
    pub async fn recalculate_and_save(&self) -> SyncResult<bool> {
        self.progress.recalculate_scores().await?;
        self.persist_progress().await
    }

    /// Remembers the slot chosen in the save menu, so the gameplay scene
    /// can save back to it without carrying the number across scene
    /// loads.
    pub fn select_slot(&self, slot: SlotNumber) {
        let Some(student) = self.session.active_student() else {
            log::warn!("Slot selection ignored: no active student");
            return;
        };
        let prefs = self.prefs.student(&student);
        if let Err(err) = prefs.set_u32(keys::SELECTED_SLOT, u32::from(slot.get())) {
            log::warn!("Failed to store slot selection for {}: {}", student, err);
        }
    }

    /// The remembered slot, defaulting to slot 1. Out-of-range stored
    /// values fall back to the default rather than escaping the 1..=4
    /// range.
    pub fn selected_slot(&self) -> SlotNumber {
        let fallback = SlotNumber::ALL[0];
        let Some(student) = self.session.active_student() else {
            return fallback;
        };
        let stored = self
            .prefs
            .student(&student)
            .get_u32(keys::SELECTED_SLOT, u32::from(fallback.get()));
        u8::try_from(stored)
            .ok()
            .and_then(SlotNumber::new)
            .unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lore_core::events::{self, EventReceiver};
    use lore_core::ids::{StoryId, StudentId};
    use lore_remote::{DocumentStore, MemoryDocumentStore};
    use std::path::PathBuf;

    struct Fixture {
        coordinator: Arc<SyncCoordinator>,
        progress: Arc<ProgressService>,
        docs: Arc<MemoryDocumentStore>,
        session: Arc<SessionContext>,
        events: EventReceiver,
        prefs: PrefsStore,
        root: PathBuf,
    }

    fn fixture(name: &str, signed_in: bool) -> Fixture {
        let root = std::env::temp_dir().join(format!(
            "lore_sync_{}_{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&root);
        let session = Arc::new(SessionContext::new());
        if signed_in {
            session.set_active_student(StudentId::new("s-1"));
        }
        let docs = Arc::new(MemoryDocumentStore::new());
        let prefs = PrefsStore::new(root.join("prefs"));
        let (tx, rx) = events::channel();
        let progress = Arc::new(ProgressService::new(
            session.clone(),
            docs.clone() as Arc<dyn DocumentStore>,
            prefs.clone(),
            tx.clone(),
        ));
        let saves = Arc::new(SaveSlotStore::new(
            root.join("saves"),
            session.clone(),
            docs.clone() as Arc<dyn DocumentStore>,
            progress.clone(),
        ));
        let coordinator = Arc::new(SyncCoordinator::new(
            session.clone(),
            saves,
            progress.clone(),
            prefs.clone(),
            tx,
            SyncConfig::testing(),
        ));
        Fixture {
            coordinator,
            progress,
            docs,
            session,
            events: rx,
            prefs,
            root,
        }
    }

    fn cleanup(fx: &Fixture) {
        let _ = std::fs::remove_dir_all(&fx.root);
    }

    #[tokio::test]
    async fn test_session_start_initializes_once() {
        let fx = fixture("start_once", true);
        fx.docs.set_latency(Duration::from_millis(50));

        let first = fx.coordinator.clone();
        let second = fx.coordinator.clone();
        let (r1, r2) = tokio::join!(first.on_session_start(), second.on_session_start());
        r1.unwrap();
        r2.unwrap();

        // The guarded second trigger issued no second remote fetch.
        assert_eq!(fx.docs.get_count(), 1);
        assert!(fx.progress.unlock_story(StoryId::new("ST002")));
        cleanup(&fx);
    }

    #[tokio::test]
    async fn test_session_start_waits_for_late_sign_in() {
        let fx = fixture("late_sign_in", false);
        let session = fx.session.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            session.set_active_student(StudentId::new("s-1"));
        });

        fx.coordinator.on_session_start().await.unwrap();
        // Initialized: mutations for the signed-in student are accepted.
        assert!(fx.progress.unlock_story(StoryId::new("ST002")));
        cleanup(&fx);
    }

    #[tokio::test]
    async fn test_menu_trigger_while_loading_is_noop() {
        let fx = fixture("menu_noop", true);
        fx.coordinator.on_session_start().await.unwrap();
        fx.docs.set_latency(Duration::from_millis(50));
        fx.events.drain();

        let first = fx.coordinator.clone();
        let second = fx.coordinator.clone();
        let (r1, r2) = tokio::join!(first.enter_save_menu(), second.enter_save_menu());
        let outcomes = [r1.unwrap(), r2.unwrap()];
        assert_eq!(outcomes.iter().filter(|v| v.is_some()).count(), 1);
        assert_eq!(outcomes.iter().filter(|v| v.is_none()).count(), 1);

        // One cycle, one notification.
        assert_eq!(fx.events.drain(), vec![GameEvent::SlotsLoaded]);
        assert_eq!(fx.coordinator.stats().load_cycles, 1);
        cleanup(&fx);
    }

    #[tokio::test]
    async fn test_menu_degrades_without_student() {
        let fx = fixture("menu_degraded", false);
        let views = fx.coordinator.enter_save_menu().await.unwrap().unwrap();
        assert!(views.iter().all(SlotView::is_empty));
        assert_eq!(fx.events.drain(), vec![GameEvent::SlotsLoaded]);

        let stats = fx.coordinator.stats();
        assert_eq!(stats.load_cycles, 1);
        assert_eq!(stats.slots_pulled, 0);
        cleanup(&fx);
    }

    #[tokio::test]
    async fn test_persist_cooldown_window() {
        let fx = fixture("cooldown", true);
        fx.coordinator.on_session_start().await.unwrap();

        assert!(fx.coordinator.persist_progress().await.unwrap());
        assert!(!fx.coordinator.persist_progress().await.unwrap());

        let stats = fx.coordinator.stats();
        assert_eq!(stats.persists, 1);
        assert_eq!(stats.persists_skipped, 1);

        // Outside the window the persist goes through again.
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(fx.coordinator.persist_progress().await.unwrap());
        assert_eq!(fx.coordinator.stats().persists, 2);
        cleanup(&fx);
    }

    #[tokio::test]
    async fn test_persist_swallows_remote_outage() {
        let fx = fixture("persist_offline", true);
        fx.coordinator.on_session_start().await.unwrap();
        fx.docs.set_offline(true);

        // Logged and swallowed; the local cache is the durable copy
        // until the remote comes back.
        assert!(fx.coordinator.persist_progress().await.unwrap());
        cleanup(&fx);
    }

    #[tokio::test]
    async fn test_slot_selection_round_trip() {
        let fx = fixture("selection", true);
        assert_eq!(fx.coordinator.selected_slot().get(), 1);

        fx.coordinator.select_slot(SlotNumber::new(3).unwrap());
        assert_eq!(fx.coordinator.selected_slot().get(), 3);

        // A stored value outside 1..=4 falls back to the default.
        fx.prefs
            .student(&StudentId::new("s-1"))
            .set_u32(keys::SELECTED_SLOT, 9)
            .unwrap();
        assert_eq!(fx.coordinator.selected_slot().get(), 1);
        cleanup(&fx);
    }
}
