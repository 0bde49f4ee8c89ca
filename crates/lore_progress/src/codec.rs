//! Typed documents at the remote boundary.
//!
//! Remote payloads are deserialized into these structs in one place;
//! nothing else walks raw JSON. Score fields are stored as strings (the
//! legacy document format) and parsed leniently on the way in, so
//! documents written by older clients still load.

use crate::aggregate::{StudentProgress, DEFAULT_HEARTS};
use crate::quiz::QuizAttempt;
use chrono::{DateTime, Utc};
use lore_core::catalog::Civilization;
use lore_core::ids::{AchievementId, ArtifactId, ChapterId, QuizId, StoryId, StudentId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Integer from a number or a digit string. A trailing `%` is tolerated.
pub fn lenient_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    }
}

/// Float from a number or a decimal string. A trailing `%` is tolerated.
pub fn lenient_f32(value: &Value) -> Option<f32> {
    match value {
        Value::Number(n) => n.as_f64().map(|n| n as f32),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    }
}

/// RFC 3339 timestamp from a document field; anything unreadable
/// resolves to now.
pub fn parse_timestamp(value: Option<&str>) -> DateTime<Utc> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

/// The `gameProgress/{studentId}` document: unlocks, hearts, and the
/// current story.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameProgressDoc {
    pub hearts: Option<Value>,
    pub unlocked_chapters: Vec<String>,
    pub unlocked_stories: Vec<String>,
    pub unlocked_achievements: Vec<String>,
    pub unlocked_artifacts: Vec<String>,
    pub unlocked_civilizations: Vec<String>,
    pub current_story: Option<String>,
    pub last_updated: Option<String>,
}

impl GameProgressDoc {
    pub fn from_progress(progress: &StudentProgress) -> Self {
        Self {
            hearts: Some(Value::from(progress.hearts())),
            unlocked_chapters: progress
                .unlocked_chapters()
                .iter()
                .map(|c| c.as_str().to_string())
                .collect(),
            unlocked_stories: progress
                .unlocked_stories()
                .iter()
                .map(|s| s.as_str().to_string())
                .collect(),
            unlocked_achievements: progress
                .unlocked_achievements()
                .iter()
                .map(|a| a.as_str().to_string())
                .collect(),
            unlocked_artifacts: progress
                .unlocked_artifacts()
                .iter()
                .map(|a| a.as_str().to_string())
                .collect(),
            unlocked_civilizations: progress
                .unlocked_civilizations()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            current_story: Some(progress.latest_unlocked_story().as_str().to_string()),
            last_updated: Some(progress.last_updated().to_rfc3339()),
        }
    }

    /// Rebuilds an aggregate. Missing or empty fields keep the fresh
    /// defaults; unknown civilization names are dropped. Scores are not
    /// carried here (see [`StudentScoreDoc`]) and come back stale.
    pub fn into_progress(self) -> StudentProgress {
        let mut progress = StudentProgress::new();
        progress.hearts = self
            .hearts
            .as_ref()
            .and_then(lenient_u32)
            .unwrap_or(DEFAULT_HEARTS);
        if !self.unlocked_chapters.is_empty() {
            progress.unlocked_chapters =
                self.unlocked_chapters.into_iter().map(ChapterId::new).collect();
        }
        if !self.unlocked_stories.is_empty() {
            progress.unlocked_stories =
                self.unlocked_stories.into_iter().map(StoryId::new).collect();
        }
        progress.unlocked_achievements = self
            .unlocked_achievements
            .into_iter()
            .map(AchievementId::new)
            .collect();
        progress.unlocked_artifacts = self
            .unlocked_artifacts
            .into_iter()
            .map(ArtifactId::new)
            .collect();
        let civilizations: std::collections::BTreeSet<Civilization> = self
            .unlocked_civilizations
            .iter()
            .filter_map(|name| Civilization::from_name(name))
            .collect();
        if !civilizations.is_empty() {
            progress.unlocked_civilizations = civilizations;
        }
        progress.current_story = self
            .current_story
            .map(StoryId::new)
            .unwrap_or_else(|| progress.latest_unlocked_story());
        progress.last_updated = parse_timestamp(self.last_updated.as_deref());
        progress.scores_stale = true;
        progress
    }
}

/// The `studentProgress/{studentId}` document: score rollups, stored as
/// strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentScoreDoc {
    pub overall_score: Option<Value>,
    pub success_rate: Option<Value>,
    pub last_updated: Option<String>,
}

impl StudentScoreDoc {
    pub fn from_scores(overall_score: u32, success_rate: f32) -> Self {
        Self {
            overall_score: Some(Value::String(overall_score.to_string())),
            success_rate: Some(Value::String(format!("{:.1}", success_rate))),
            last_updated: Some(Utc::now().to_rfc3339()),
        }
    }

    pub fn overall_score_value(&self) -> u32 {
        self.overall_score.as_ref().and_then(lenient_u32).unwrap_or(0)
    }

    pub fn success_rate_value(&self) -> f32 {
        self.success_rate.as_ref().and_then(lenient_f32).unwrap_or(0.0)
    }
}

/// One document in the `quizAttempts/{studentId}/attempts` log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuizAttemptDoc {
    pub quiz_id: String,
    pub attempt_number: Option<Value>,
    pub score: Option<Value>,
    pub total: Option<Value>,
    pub is_passed: Option<bool>,
    pub date_completed: Option<String>,
}

impl QuizAttemptDoc {
    pub fn from_attempt(attempt: &QuizAttempt) -> Self {
        Self {
            quiz_id: attempt.quiz_id.as_str().to_string(),
            attempt_number: Some(Value::from(attempt.attempt_number)),
            score: Some(Value::from(attempt.score)),
            total: Some(Value::from(attempt.total)),
            is_passed: Some(attempt.is_passed),
            date_completed: Some(attempt.date_completed.to_rfc3339()),
        }
    }

    /// `None` for documents missing their quiz id or attempt number;
    /// those cannot participate in any rollup.
    pub fn into_attempt(self) -> Option<QuizAttempt> {
        if self.quiz_id.is_empty() {
            return None;
        }
        let attempt_number = self.attempt_number.as_ref().and_then(lenient_u32)?;
        Some(QuizAttempt {
            quiz_id: QuizId::new(self.quiz_id),
            attempt_number,
            score: self.score.as_ref().and_then(lenient_u32).unwrap_or(0),
            total: self.total.as_ref().and_then(lenient_u32).unwrap_or(0),
            is_passed: self.is_passed.unwrap_or(false),
            date_completed: parse_timestamp(self.date_completed.as_deref()),
        })
    }
}

/// The `studentLeaderboards/{studentId}` document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeaderboardDoc {
    pub student_id: String,
    pub score: Option<Value>,
    pub last_updated: Option<String>,
}

impl LeaderboardDoc {
    pub fn from_score(student: &StudentId, score: u32) -> Self {
        Self {
            student_id: student.as_str().to_string(),
            score: Some(Value::String(score.to_string())),
            last_updated: Some(Utc::now().to_rfc3339()),
        }
    }

    pub fn score_value(&self) -> u32 {
        self.score.as_ref().and_then(lenient_u32).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lenient_numbers() {
        assert_eq!(lenient_u32(&json!(12)), Some(12));
        assert_eq!(lenient_u32(&json!("12")), Some(12));
        assert_eq!(lenient_u32(&json!(" 12 ")), Some(12));
        assert_eq!(lenient_u32(&json!("87%")), Some(87));
        assert_eq!(lenient_u32(&json!("twelve")), None);
        assert_eq!(lenient_u32(&json!(null)), None);

        assert_eq!(lenient_f32(&json!("86.7")), Some(86.7));
        assert_eq!(lenient_f32(&json!("86.7%")), Some(86.7));
        assert_eq!(lenient_f32(&json!(86.7)), Some(86.7));
    }

    #[test]
    fn test_progress_doc_round_trip() {
        let mut progress = StudentProgress::new();
        progress.unlock_civilization(Civilization::Akkadian);
        progress.unlock_chapter(ChapterId::new("CH002"));
        progress.unlock_achievement(AchievementId::new("scribe"));
        progress.use_heart();

        let doc = GameProgressDoc::from_progress(&progress);
        let rebuilt = doc.into_progress();

        assert_eq!(rebuilt.hearts(), 2);
        assert_eq!(rebuilt.unlocked_chapters(), progress.unlocked_chapters());
        assert_eq!(rebuilt.unlocked_stories(), progress.unlocked_stories());
        assert_eq!(
            rebuilt.unlocked_civilizations(),
            progress.unlocked_civilizations()
        );
        assert_eq!(rebuilt.current_story().as_str(), "ST002");
        assert!(rebuilt.scores_stale());
    }

    #[test]
    fn test_empty_doc_degrades_to_defaults() {
        let doc: GameProgressDoc = serde_json::from_value(json!({})).unwrap();
        let progress = doc.into_progress();
        assert_eq!(progress.hearts(), 3);
        assert!(progress.is_story_unlocked(&StoryId::new("ST001")));
        assert!(progress
            .unlocked_civilizations()
            .contains(&Civilization::Sumerian));
    }

    #[test]
    fn test_legacy_string_fields_parse() {
        let doc: GameProgressDoc = serde_json::from_value(json!({
            "hearts": "2",
            "unlockedStories": ["ST001", "ST002"],
            "unlockedCivilizations": ["Akkadian", "NotACivilization"],
        }))
        .unwrap();
        let progress = doc.into_progress();
        assert_eq!(progress.hearts(), 2);
        assert!(progress.is_story_unlocked(&StoryId::new("ST002")));
        // The junk name is dropped, the valid one kept.
        assert!(progress
            .unlocked_civilizations()
            .contains(&Civilization::Akkadian));
        assert_eq!(progress.unlocked_civilizations().len(), 1);
    }

    #[test]
    fn test_score_doc_stores_strings() {
        let doc = StudentScoreDoc::from_scores(12, 86.666);
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["overallScore"], "12");
        assert_eq!(value["successRate"], "86.7");

        let parsed: StudentScoreDoc = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.overall_score_value(), 12);
        assert!((parsed.success_rate_value() - 86.7).abs() < 0.01);
    }

    #[test]
    fn test_attempt_doc_round_trip_and_rejection() {
        let attempt = QuizAttempt {
            quiz_id: QuizId::new("quiz-a"),
            attempt_number: 2,
            score: 9,
            total: 10,
            is_passed: true,
            date_completed: Utc::now(),
        };
        let doc = QuizAttemptDoc::from_attempt(&attempt);
        let rebuilt = doc.into_attempt().unwrap();
        assert_eq!(rebuilt.quiz_id, attempt.quiz_id);
        assert_eq!(rebuilt.attempt_number, 2);
        assert_eq!(rebuilt.score, 9);

        // Documents without a quiz id or attempt number are dropped.
        let nameless: QuizAttemptDoc = serde_json::from_value(json!({"score": 5})).unwrap();
        assert!(nameless.into_attempt().is_none());
        let unnumbered: QuizAttemptDoc =
            serde_json::from_value(json!({"quizId": "quiz-a"})).unwrap();
        assert!(unnumbered.into_attempt().is_none());
    }

    #[test]
    fn test_legacy_attempt_strings_parse() {
        let doc: QuizAttemptDoc = serde_json::from_value(json!({
            "quizId": "quiz-a",
            "attemptNumber": "3",
            "score": "7",
        }))
        .unwrap();
        let attempt = doc.into_attempt().unwrap();
        assert_eq!(attempt.attempt_number, 3);
        assert_eq!(attempt.score, 7);
        assert!(!attempt.is_passed);
    }
}
