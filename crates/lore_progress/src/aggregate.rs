//! The progress aggregate.
//!
//! Pure state, no I/O. The service owns one behind a lock, persists
//! snapshots of it, and fires events off the booleans returned here.

use chrono::{DateTime, Utc};
use lore_core::catalog::{self, Civilization};
use lore_core::ids::{AchievementId, ArtifactId, ChapterId, StoryId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Hearts a student starts with.
pub const DEFAULT_HEARTS: u32 = 3;

/// Everything the game tracks per student.
///
/// Unlock sets are append-only during play; only [`start_new_game`]
/// shrinks them, and achievements and artifacts survive even that.
///
/// [`start_new_game`]: StudentProgress::start_new_game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentProgress {
    pub(crate) hearts: u32,
    pub(crate) unlocked_chapters: BTreeSet<ChapterId>,
    pub(crate) unlocked_stories: BTreeSet<StoryId>,
    pub(crate) unlocked_achievements: BTreeSet<AchievementId>,
    pub(crate) unlocked_artifacts: BTreeSet<ArtifactId>,
    pub(crate) unlocked_civilizations: BTreeSet<Civilization>,
    pub(crate) current_story: StoryId,
    pub(crate) overall_score: u32,
    pub(crate) success_rate: f32,
    /// Scores are derived data. While this is set they must be
    /// recomputed from the attempt log before being trusted.
    pub(crate) scores_stale: bool,
    pub(crate) last_updated: DateTime<Utc>,
}

impl StudentProgress {
    /// A fresh student: three hearts, the first chapter, story, and
    /// civilization unlocked, scores pending their first recalculation.
    pub fn new() -> Self {
        Self {
            hearts: DEFAULT_HEARTS,
            unlocked_chapters: catalog::default_chapters(),
            unlocked_stories: catalog::default_stories(),
            unlocked_achievements: BTreeSet::new(),
            unlocked_artifacts: BTreeSet::new(),
            unlocked_civilizations: catalog::default_civilizations(),
            current_story: catalog::fallback_story(),
            overall_score: 0,
            success_rate: 0.0,
            scores_stale: true,
            last_updated: Utc::now(),
        }
    }

    pub fn hearts(&self) -> u32 {
        self.hearts
    }

    /// Spends one heart. Returns false at zero; hearts never underflow.
    pub fn use_heart(&mut self) -> bool {
        if self.hearts == 0 {
            return false;
        }
        self.hearts -= 1;
        self.touch();
        true
    }

    pub fn add_hearts(&mut self, count: u32) {
        self.hearts = self.hearts.saturating_add(count);
        self.touch();
    }

    pub fn unlocked_chapters(&self) -> &BTreeSet<ChapterId> {
        &self.unlocked_chapters
    }

    pub fn unlocked_stories(&self) -> &BTreeSet<StoryId> {
        &self.unlocked_stories
    }

    pub fn unlocked_achievements(&self) -> &BTreeSet<AchievementId> {
        &self.unlocked_achievements
    }

    pub fn unlocked_artifacts(&self) -> &BTreeSet<ArtifactId> {
        &self.unlocked_artifacts
    }

    pub fn unlocked_civilizations(&self) -> &BTreeSet<Civilization> {
        &self.unlocked_civilizations
    }

    pub fn is_story_unlocked(&self, story: &StoryId) -> bool {
        self.unlocked_stories.contains(story)
    }

    /// True only when the chapter was not already unlocked.
    pub fn unlock_chapter(&mut self, chapter: ChapterId) -> bool {
        let newly = self.unlocked_chapters.insert(chapter);
        if newly {
            self.touch();
        }
        newly
    }

    /// True only when the story was not already unlocked. Refreshes the
    /// derived current story.
    pub fn unlock_story(&mut self, story: StoryId) -> bool {
        let newly = self.unlocked_stories.insert(story);
        if newly {
            self.current_story = self.latest_unlocked_story();
            self.touch();
        }
        newly
    }

    /// True only when the achievement was not already unlocked.
    pub fn unlock_achievement(&mut self, achievement: AchievementId) -> bool {
        let newly = self.unlocked_achievements.insert(achievement);
        if newly {
            self.touch();
        }
        newly
    }

    /// True only when the artifact was not already unlocked.
    pub fn unlock_artifact(&mut self, artifact: ArtifactId) -> bool {
        let newly = self.unlocked_artifacts.insert(artifact);
        if newly {
            self.touch();
        }
        newly
    }

    /// Unlocks a civilization together with its mapped story.
    ///
    /// Returns `(civilization_newly, story_newly)` so the caller can
    /// fire each notification exactly once.
    pub fn unlock_civilization(&mut self, civ: Civilization) -> (bool, bool) {
        let civ_newly = self.unlocked_civilizations.insert(civ);
        let story_newly = self.unlock_story(civ.story());
        if civ_newly {
            self.touch();
        }
        (civ_newly, story_newly)
    }

    /// The story the student should land in.
    ///
    /// Priority: highest numeric `ST{n}` among unlocked stories, else
    /// the story of the furthest unlocked civilization, else the
    /// fallback story. Deterministic for any input.
    pub fn latest_unlocked_story(&self) -> StoryId {
        let numeric = self
            .unlocked_stories
            .iter()
            .filter_map(|story| story.number().map(|n| (n, story)))
            .max_by_key(|(n, _)| *n);
        if let Some((_, story)) = numeric {
            return story.clone();
        }
        if let Some(civ) = self.unlocked_civilizations.iter().max() {
            return civ.story();
        }
        catalog::fallback_story()
    }

    /// Last value `latest_unlocked_story` resolved to.
    pub fn current_story(&self) -> &StoryId {
        &self.current_story
    }

    pub fn overall_score(&self) -> u32 {
        self.overall_score
    }

    pub fn success_rate(&self) -> f32 {
        self.success_rate
    }

    pub fn scores_stale(&self) -> bool {
        self.scores_stale
    }

    pub fn set_scores(&mut self, overall_score: u32, success_rate: f32) {
        self.overall_score = overall_score;
        self.success_rate = success_rate;
        self.scores_stale = false;
        self.touch();
    }

    pub fn mark_scores_stale(&mut self) {
        self.scores_stale = true;
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// Resets position and unlocks to a fresh start. Achievements and
    /// artifacts are kept; they belong to the student, not the
    /// playthrough.
    pub fn start_new_game(&mut self) {
        self.hearts = DEFAULT_HEARTS;
        self.unlocked_chapters = catalog::default_chapters();
        self.unlocked_stories = catalog::default_stories();
        self.unlocked_civilizations = catalog::default_civilizations();
        self.current_story = catalog::fallback_story();
        self.overall_score = 0;
        self.success_rate = 0.0;
        self.scores_stale = true;
        self.touch();
    }

    fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}

impl Default for StudentProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_student_defaults() {
        let progress = StudentProgress::new();
        assert_eq!(progress.hearts(), 3);
        assert!(progress.is_story_unlocked(&StoryId::new("ST001")));
        assert!(progress
            .unlocked_chapters()
            .contains(&ChapterId::new("CH001")));
        assert!(progress
            .unlocked_civilizations()
            .contains(&Civilization::Sumerian));
        assert!(progress.scores_stale());
    }

    #[test]
    fn test_hearts_never_underflow() {
        let mut progress = StudentProgress::new();
        assert!(progress.use_heart());
        assert!(progress.use_heart());
        assert!(progress.use_heart());
        assert_eq!(progress.hearts(), 0);
        assert!(!progress.use_heart());
        assert_eq!(progress.hearts(), 0);
    }

    #[test]
    fn test_unlock_is_idempotent() {
        let mut progress = StudentProgress::new();
        assert!(progress.unlock_chapter(ChapterId::new("CH002")));
        assert!(!progress.unlock_chapter(ChapterId::new("CH002")));
        assert_eq!(progress.unlocked_chapters().len(), 2);

        assert!(progress.unlock_achievement(AchievementId::new("first-steps")));
        assert!(!progress.unlock_achievement(AchievementId::new("first-steps")));
    }

    #[test]
    fn test_civilization_unlock_carries_its_story() {
        let mut progress = StudentProgress::new();
        let (civ_newly, story_newly) =
            progress.unlock_civilization(Civilization::Akkadian);
        assert!(civ_newly);
        assert!(story_newly);
        assert!(progress.is_story_unlocked(&StoryId::new("ST002")));
        assert_eq!(progress.current_story().as_str(), "ST002");

        // Unlocking again reports nothing new.
        let (civ_again, story_again) =
            progress.unlock_civilization(Civilization::Akkadian);
        assert!(!civ_again);
        assert!(!story_again);
    }

    #[test]
    fn test_latest_story_orders_numerically() {
        let mut progress = StudentProgress::new();
        progress.unlock_story(StoryId::new("ST2"));
        progress.unlock_story(StoryId::new("ST10"));
        // Lexical comparison would pick ST2.
        assert_eq!(progress.latest_unlocked_story().as_str(), "ST10");
    }

    #[test]
    fn test_latest_story_falls_back_to_civilization() {
        let mut progress = StudentProgress::new();
        progress.unlocked_stories.clear();
        progress.unlocked_stories.insert(StoryId::new("bonus_tale"));
        progress.unlocked_civilizations.insert(Civilization::Babylonian);
        assert_eq!(progress.latest_unlocked_story().as_str(), "ST003");
    }

    #[test]
    fn test_latest_story_final_fallback() {
        let mut progress = StudentProgress::new();
        progress.unlocked_stories.clear();
        progress.unlocked_civilizations.clear();
        assert_eq!(progress.latest_unlocked_story().as_str(), "ST001");
    }

    #[test]
    fn test_new_game_preserves_achievements_and_artifacts() {
        let mut progress = StudentProgress::new();
        progress.unlock_achievement(AchievementId::new("scribe"));
        progress.unlock_artifact(ArtifactId::new("clay-tablet"));
        progress.unlock_civilization(Civilization::Greek);
        progress.use_heart();
        progress.set_scores(42, 80.0);

        progress.start_new_game();

        assert_eq!(progress.hearts(), 3);
        assert_eq!(progress.unlocked_stories().len(), 1);
        assert!(progress.is_story_unlocked(&StoryId::new("ST001")));
        assert_eq!(progress.unlocked_civilizations().len(), 1);
        assert_eq!(progress.overall_score(), 0);
        assert!(progress.scores_stale());
        // Kept.
        assert!(progress
            .unlocked_achievements()
            .contains(&AchievementId::new("scribe")));
        assert!(progress
            .unlocked_artifacts()
            .contains(&ArtifactId::new("clay-tablet")));
    }
}
