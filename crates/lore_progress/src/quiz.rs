//! Quiz attempts and score rollups.
//!
//! Two rollup policies exist on purpose and must not be merged:
//! progress scores reward the best attempt per quiz, the leaderboard
//! counts only the first attempt so retries cannot climb it.

use chrono::{DateTime, Utc};
use lore_core::ids::QuizId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One completed quiz run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub quiz_id: QuizId,
    /// 1-based, assigned from the count of prior attempts at the same
    /// quiz. Never supplied by the caller.
    pub attempt_number: u32,
    pub score: u32,
    pub total: u32,
    pub is_passed: bool,
    pub date_completed: DateTime<Utc>,
}

/// Number for a new attempt: prior count plus one.
pub fn next_attempt_number(attempts: &[QuizAttempt], quiz: &QuizId) -> u32 {
    attempts.iter().filter(|a| &a.quiz_id == quiz).count() as u32 + 1
}

/// Progress rollup: each quiz counts once, at its best score.
///
/// Idempotent over the same log; recomputing never double-counts.
pub fn best_per_quiz_total(attempts: &[QuizAttempt]) -> u32 {
    let mut best: BTreeMap<&QuizId, u32> = BTreeMap::new();
    for attempt in attempts {
        let entry = best.entry(&attempt.quiz_id).or_insert(0);
        *entry = (*entry).max(attempt.score);
    }
    best.values().sum()
}

/// Leaderboard rollup: each quiz counts once, at its first-attempt
/// score. Later attempts never move it.
pub fn first_attempt_total(attempts: &[QuizAttempt]) -> u32 {
    let mut firsts: BTreeMap<&QuizId, u32> = BTreeMap::new();
    for attempt in attempts {
        if attempt.attempt_number == 1 {
            firsts.entry(&attempt.quiz_id).or_insert(attempt.score);
        }
    }
    firsts.values().sum()
}

/// Passed share of all attempts, as a percentage. 0.0 for an empty log.
pub fn success_rate(attempts: &[QuizAttempt]) -> f32 {
    if attempts.is_empty() {
        return 0.0;
    }
    let passed = attempts.iter().filter(|a| a.is_passed).count();
    (passed as f32 / attempts.len() as f32) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(quiz: &str, number: u32, score: u32, passed: bool) -> QuizAttempt {
        QuizAttempt {
            quiz_id: QuizId::new(quiz),
            attempt_number: number,
            score,
            total: 10,
            is_passed: passed,
            date_completed: Utc::now(),
        }
    }

    #[test]
    fn test_attempt_numbering_counts_per_quiz() {
        let mut attempts = Vec::new();
        let quiz_a = QuizId::new("quiz-a");
        let quiz_b = QuizId::new("quiz-b");

        assert_eq!(next_attempt_number(&attempts, &quiz_a), 1);
        attempts.push(attempt("quiz-a", 1, 5, true));
        assert_eq!(next_attempt_number(&attempts, &quiz_a), 2);
        assert_eq!(next_attempt_number(&attempts, &quiz_b), 1);
        attempts.push(attempt("quiz-a", 2, 7, true));
        assert_eq!(next_attempt_number(&attempts, &quiz_a), 3);
    }

    #[test]
    fn test_best_per_quiz_takes_the_maximum() {
        let attempts = vec![
            attempt("quiz-a", 1, 5, true),
            attempt("quiz-a", 2, 9, true),
            attempt("quiz-b", 1, 3, false),
        ];
        assert_eq!(best_per_quiz_total(&attempts), 12);
        // Recomputing over the same log yields the same value.
        assert_eq!(best_per_quiz_total(&attempts), 12);
    }

    #[test]
    fn test_leaderboard_keeps_the_first_attempt() {
        let mut attempts = vec![attempt("quiz-a", 1, 5, true)];
        assert_eq!(first_attempt_total(&attempts), 5);

        // A better retry does not move the leaderboard.
        attempts.push(attempt("quiz-a", 2, 9, true));
        assert_eq!(first_attempt_total(&attempts), 5);

        attempts.push(attempt("quiz-b", 1, 3, false));
        assert_eq!(first_attempt_total(&attempts), 8);
    }

    #[test]
    fn test_success_rate() {
        assert_eq!(success_rate(&[]), 0.0);
        let attempts = vec![
            attempt("quiz-a", 1, 5, true),
            attempt("quiz-a", 2, 9, true),
            attempt("quiz-b", 1, 3, false),
        ];
        let rate = success_rate(&attempts);
        assert!((rate - 66.666_67).abs() < 0.01);
    }
}
