//! Progress service.
//!
//! Owns the aggregate for the active student, keeps the preference cache
//! write-through, mirrors to the remote documents, and fires events on
//! transitions. Persistence timing belongs to the sync coordinator; the
//! only remote writes issued directly here are the quiz-flow rollups.

use crate::aggregate::StudentProgress;
use crate::codec::{GameProgressDoc, LeaderboardDoc, QuizAttemptDoc, StudentScoreDoc};
use crate::quiz::{self, QuizAttempt};
use crate::{ProgressError, ProgressResult};
use chrono::Utc;
use lore_core::catalog::Civilization;
use lore_core::events::{EventSender, GameEvent};
use lore_core::ids::{AchievementId, ArtifactId, ChapterId, QuizId, StoryId, StudentId};
use lore_core::session::SessionContext;
use lore_prefs::{keys, PrefsStore};
use lore_remote::{collections, DocumentStore, RemoteResult};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct ProgressService {
    session: Arc<SessionContext>,
    docs: Arc<dyn DocumentStore>,
    prefs: PrefsStore,
    events: EventSender,
    state: RwLock<ProgressState>,
    recalculating: AtomicBool,
}

#[derive(Debug)]
struct ProgressState {
    /// Student the aggregate belongs to. `None` until the first
    /// `initialize`; compared against the session on every mutation so
    /// a student switch can never bleed progress across accounts.
    student: Option<StudentId>,
    progress: StudentProgress,
}

impl ProgressService {
    pub fn new(
        session: Arc<SessionContext>,
        docs: Arc<dyn DocumentStore>,
        prefs: PrefsStore,
        events: EventSender,
    ) -> Self {
        Self {
            session,
            docs,
            prefs,
            events,
            state: RwLock::new(ProgressState {
                student: None,
                progress: StudentProgress::new(),
            }),
            recalculating: AtomicBool::new(false),
        }
    }

    /// Loads the active student's aggregate: preference cache first, then
    /// the remote documents, then fresh defaults. A broken remote
    /// degrades to defaults instead of blocking. Re-running for the same
    /// student is a no-op; a different student replaces the aggregate.
    pub async fn initialize(&self) -> ProgressResult<()> {
        let student = self.require_student()?;
        if self.state.read().student.as_ref() == Some(&student) {
            return Ok(());
        }
        let progress = self.load_for(&student).await;
        *self.state.write() = ProgressState {
            student: Some(student),
            progress,
        };
        Ok(())
    }

    /// Snapshot of the current aggregate.
    pub fn progress(&self) -> StudentProgress {
        self.state.read().progress.clone()
    }

    pub fn hearts(&self) -> u32 {
        self.state.read().progress.hearts()
    }

    pub fn latest_unlocked_story(&self) -> StoryId {
        self.state.read().progress.latest_unlocked_story()
    }

    pub fn is_recalculating(&self) -> bool {
        self.recalculating.load(Ordering::SeqCst)
    }

    /// True only when the chapter was not already unlocked; fires
    /// `ChapterUnlocked` exactly then.
    pub fn unlock_chapter(&self, chapter: ChapterId) -> bool {
        if self.guard_active().is_none() {
            return false;
        }
        let newly = self.state.write().progress.unlock_chapter(chapter.clone());
        if newly {
            self.events.send(GameEvent::ChapterUnlocked(chapter));
            self.cache_current();
        }
        newly
    }

    /// True only when the story was not already unlocked; fires
    /// `StoryUnlocked` exactly then.
    pub fn unlock_story(&self, story: StoryId) -> bool {
        if self.guard_active().is_none() {
            return false;
        }
        let newly = self.state.write().progress.unlock_story(story.clone());
        if newly {
            self.events.send(GameEvent::StoryUnlocked(story));
            self.cache_current();
        }
        newly
    }

    pub fn unlock_achievement(&self, achievement: AchievementId) -> bool {
        if self.guard_active().is_none() {
            return false;
        }
        let newly = self
            .state
            .write()
            .progress
            .unlock_achievement(achievement.clone());
        if newly {
            self.events.send(GameEvent::AchievementUnlocked(achievement));
            self.cache_current();
        }
        newly
    }

    pub fn unlock_artifact(&self, artifact: ArtifactId) -> bool {
        if self.guard_active().is_none() {
            return false;
        }
        let newly = self.state.write().progress.unlock_artifact(artifact.clone());
        if newly {
            self.events.send(GameEvent::ArtifactUnlocked(artifact));
            self.cache_current();
        }
        newly
    }

    /// Validates the name against the closed roster and unlocks the
    /// civilization together with its mapped story. Unknown names are
    /// logged and ignored.
    pub fn unlock_civilization(&self, name: &str) -> bool {
        let Some(civ) = Civilization::from_name(name) else {
            log::warn!("Unknown civilization '{}' ignored", name);
            return false;
        };
        if self.guard_active().is_none() {
            return false;
        }
        let (civ_newly, story_newly) =
            self.state.write().progress.unlock_civilization(civ);
        if story_newly {
            self.events.send(GameEvent::StoryUnlocked(civ.story()));
        }
        if civ_newly {
            self.events.send(GameEvent::CivilizationUnlocked(civ));
        }
        if civ_newly || story_newly {
            self.cache_current();
        }
        civ_newly
    }

    /// Spends one heart. False at zero; hearts never underflow.
    pub fn use_heart(&self) -> bool {
        if self.guard_active().is_none() {
            return false;
        }
        let (used, remaining) = {
            let mut state = self.state.write();
            let used = state.progress.use_heart();
            (used, state.progress.hearts())
        };
        if used {
            self.events.send(GameEvent::HeartsChanged(remaining));
            self.cache_current();
        }
        used
    }

    pub fn add_hearts(&self, count: u32) {
        if count == 0 || self.guard_active().is_none() {
            return;
        }
        let remaining = {
            let mut state = self.state.write();
            state.progress.add_hearts(count);
            state.progress.hearts()
        };
        self.events.send(GameEvent::HeartsChanged(remaining));
        self.cache_current();
    }

    /// Recomputes both score rollups from the attempt log.
    ///
    /// Re-entrancy safe: a second call while a fetch is in flight is a
    /// silent no-op and issues no second fetch. A failed fetch degrades
    /// to zeroed, stale scores. Never persists anything; the coordinator
    /// owns the save-after-recalculation path.
    pub async fn recalculate_scores(&self) -> ProgressResult<()> {
        let student = self.require_current()?;
        if self
            .recalculating
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::debug!("Score recalculation already in flight; skipping");
            return Ok(());
        }
        let result = self.recalculate_inner(&student).await;
        self.recalculating.store(false, Ordering::SeqCst);
        result
    }

    async fn recalculate_inner(&self, student: &StudentId) -> ProgressResult<()> {
        let attempts = match self.fetch_attempts(student).await {
            Ok(attempts) => attempts,
            Err(err) => {
                log::warn!(
                    "Attempt log unavailable for {}: {} (scores zeroed until the next recalculation)",
                    student,
                    err
                );
                let mut state = self.state.write();
                state.progress.set_scores(0, 0.0);
                state.progress.mark_scores_stale();
                return Ok(());
            }
        };
        let overall_score = quiz::best_per_quiz_total(&attempts);
        let success_rate = quiz::success_rate(&attempts);
        self.state
            .write()
            .progress
            .set_scores(overall_score, success_rate);
        self.cache_current();
        self.events.send(GameEvent::ScoresRecalculated {
            overall_score,
            success_rate,
        });
        Ok(())
    }

    /// Appends an attempt to the remote log and folds it into both
    /// rollups: best-per-quiz into the progress document,
    /// first-attempt-only into the leaderboard. The attempt number is
    /// derived from the log, never taken from the caller.
    ///
    /// The append itself must succeed (the log is the system of record);
    /// the rollup mirrors are best-effort.
    pub async fn record_quiz_attempt(
        &self,
        quiz: QuizId,
        score: u32,
        total: u32,
        passed: bool,
    ) -> ProgressResult<QuizAttempt> {
        let student = self.require_current()?;
        let mut attempts = self.fetch_attempts(&student).await?;
        let attempt = QuizAttempt {
            quiz_id: quiz.clone(),
            attempt_number: quiz::next_attempt_number(&attempts, &quiz),
            score,
            total,
            is_passed: passed,
            date_completed: Utc::now(),
        };
        let doc = serde_json::to_value(QuizAttemptDoc::from_attempt(&attempt))
            .map_err(|e| ProgressError::Serialization(e.to_string()))?;
        self.docs
            .add(&collections::quiz_attempts(&student), doc)
            .await?;

        attempts.push(attempt.clone());
        let overall_score = quiz::best_per_quiz_total(&attempts);
        let success_rate = quiz::success_rate(&attempts);
        let leaderboard_score = quiz::first_attempt_total(&attempts);
        self.state
            .write()
            .progress
            .set_scores(overall_score, success_rate);
        self.cache_current();
        self.events.send(GameEvent::ScoresRecalculated {
            overall_score,
            success_rate,
        });

        let scores = StudentScoreDoc::from_scores(overall_score, success_rate);
        self.merge_best_effort(collections::STUDENT_PROGRESS, &student, &scores)
            .await;
        let board = LeaderboardDoc::from_score(&student, leaderboard_score);
        self.merge_best_effort(collections::STUDENT_LEADERBOARDS, &student, &board)
            .await;
        Ok(attempt)
    }

    /// Merge-upserts both progress documents and refreshes the local
    /// cache. The sync coordinator owns when this runs; nothing here
    /// triggers a recalculation.
    pub async fn persist(&self) -> ProgressResult<()> {
        let student = self.require_current()?;
        self.cache_current();
        self.persist_docs(&student).await
    }

    /// Resets to a fresh playthrough. Achievements and artifacts
    /// survive. The reset is cached and mirrored immediately so an
    /// abandoned session cannot resurrect the old run.
    pub async fn start_new_game(&self) -> ProgressResult<()> {
        let student = self.require_current()?;
        self.state.write().progress.start_new_game();
        self.cache_current();
        self.persist_docs(&student).await
    }

    /// Replaces the aggregate with a snapshot pulled from a save
    /// document and refreshes the cache. Remote wins on explicit load,
    /// even when the local aggregate is further along.
    pub fn replace_with_snapshot(&self, student: &StudentId, progress: StudentProgress) {
        {
            let mut state = self.state.write();
            if state.student.as_ref() != Some(student) {
                log::warn!(
                    "Discarding progress snapshot for {}: aggregate belongs to another student",
                    student
                );
                return;
            }
            state.progress = progress;
        }
        self.cache_current();
    }

    fn require_student(&self) -> ProgressResult<StudentId> {
        self.session
            .active_student()
            .ok_or(ProgressError::NoActiveStudent)
    }

    fn require_current(&self) -> ProgressResult<StudentId> {
        let student = self.require_student()?;
        if self.state.read().student.as_ref() != Some(&student) {
            return Err(ProgressError::NotInitialized);
        }
        Ok(student)
    }

    /// Mutation guard: the aggregate must belong to the signed-in
    /// student. Mismatches are logged and the mutation dropped.
    fn guard_active(&self) -> Option<StudentId> {
        let Some(active) = self.session.active_student() else {
            log::warn!("Progress mutation ignored: no active student");
            return None;
        };
        if self.state.read().student.as_ref() != Some(&active) {
            log::warn!(
                "Progress mutation ignored: aggregate not initialized for {}",
                active
            );
            return None;
        }
        Some(active)
    }

    async fn load_for(&self, student: &StudentId) -> StudentProgress {
        let prefs = self.prefs.student(student);
        if let Some(progress) = prefs.get_json::<StudentProgress>(keys::PROGRESS_CACHE) {
            return progress;
        }
        match self.fetch_remote(student).await {
            Ok(Some(progress)) => {
                if let Err(err) = prefs.set_json(keys::PROGRESS_CACHE, &progress) {
                    log::warn!("Failed to cache progress for {}: {}", student, err);
                }
                progress
            }
            Ok(None) => StudentProgress::new(),
            Err(err) => {
                log::warn!(
                    "Remote progress unavailable for {}: {} (using defaults)",
                    student,
                    err
                );
                StudentProgress::new()
            }
        }
    }

    async fn fetch_remote(&self, student: &StudentId) -> RemoteResult<Option<StudentProgress>> {
        let Some(game_value) = self
            .docs
            .get(collections::GAME_PROGRESS, student.as_str())
            .await?
        else {
            return Ok(None);
        };
        let mut progress = match serde_json::from_value::<GameProgressDoc>(game_value) {
            Ok(doc) => doc.into_progress(),
            Err(err) => {
                log::warn!("Malformed game progress document for {}: {}", student, err);
                StudentProgress::new()
            }
        };
        // Scores live in their own document; absence just leaves them
        // stale. Zero-valued stored scores are not trusted either.
        match self
            .docs
            .get(collections::STUDENT_PROGRESS, student.as_str())
            .await
        {
            Ok(Some(value)) => match serde_json::from_value::<StudentScoreDoc>(value) {
                Ok(doc) => {
                    let overall = doc.overall_score_value();
                    let rate = doc.success_rate_value();
                    progress.set_scores(overall, rate);
                    if overall == 0 && rate == 0.0 {
                        progress.mark_scores_stale();
                    }
                }
                Err(err) => {
                    log::warn!("Malformed score document for {}: {}", student, err)
                }
            },
            Ok(None) => {}
            Err(err) => log::warn!("Score document unavailable for {}: {}", student, err),
        }
        Ok(Some(progress))
    }

    async fn fetch_attempts(&self, student: &StudentId) -> RemoteResult<Vec<QuizAttempt>> {
        let collection = collections::quiz_attempts(student);
        let values = self.docs.list(&collection).await?;
        let mut attempts = Vec::with_capacity(values.len());
        for value in values {
            match serde_json::from_value::<QuizAttemptDoc>(value) {
                Ok(doc) => match doc.into_attempt() {
                    Some(attempt) => attempts.push(attempt),
                    None => log::debug!("Skipping malformed attempt document for {}", student),
                },
                Err(err) => log::debug!(
                    "Skipping unreadable attempt document for {}: {}",
                    student,
                    err
                ),
            }
        }
        Ok(attempts)
    }

    async fn persist_docs(&self, student: &StudentId) -> ProgressResult<()> {
        let (game_doc, score_doc) = {
            let state = self.state.read();
            (
                GameProgressDoc::from_progress(&state.progress),
                StudentScoreDoc::from_scores(
                    state.progress.overall_score(),
                    state.progress.success_rate(),
                ),
            )
        };
        let game_value = serde_json::to_value(&game_doc)
            .map_err(|e| ProgressError::Serialization(e.to_string()))?;
        let score_value = serde_json::to_value(&score_doc)
            .map_err(|e| ProgressError::Serialization(e.to_string()))?;
        self.docs
            .merge(collections::GAME_PROGRESS, student.as_str(), game_value)
            .await?;
        self.docs
            .merge(collections::STUDENT_PROGRESS, student.as_str(), score_value)
            .await?;
        Ok(())
    }

    async fn merge_best_effort<T: serde::Serialize>(
        &self,
        collection: &str,
        student: &StudentId,
        doc: &T,
    ) {
        match serde_json::to_value(doc) {
            Ok(value) => {
                if let Err(err) = self.docs.merge(collection, student.as_str(), value).await {
                    log::warn!("Failed to update {} for {}: {}", collection, student, err);
                }
            }
            Err(err) => log::warn!("Failed to encode {} document: {}", collection, err),
        }
    }

    // Best-effort write-through of the aggregate to the preference
    // cache. Failures are logged; the remote mirror is the durable copy.
    fn cache_current(&self) {
        let (student, progress) = {
            let state = self.state.read();
            match &state.student {
                Some(student) => (student.clone(), state.progress.clone()),
                None => return,
            }
        };
        let prefs = self.prefs.student(&student);
        if let Err(err) = prefs.set_json(keys::PROGRESS_CACHE, &progress) {
            log::warn!("Failed to cache progress for {}: {}", student, err);
        }
    }
}
