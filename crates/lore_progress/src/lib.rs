//! # Lore Progress
//!
//! The student progress aggregate: hearts, unlock sets, the derived
//! current story, and the two quiz score rollups.
//!
//! # Features
//!
//! - Idempotent unlocks that report "just unlocked" exactly once
//! - Deterministic latest-story resolution (numeric id, then furthest
//!   civilization, then the fallback story)
//! - Quiz attempt log with server-side-style numbering
//! - Two distinct rollups: best-per-quiz for progress, first-attempt-only
//!   for the leaderboard
//! - Re-entrancy-guarded score recalculation that never persists
//!
//! # Example
//!
//! ```ignore
//! use lore_progress::ProgressService;
//!
//! let service = ProgressService::new(session, docs, prefs, events);
//! service.initialize().await?;
//!
//! if service.unlock_civilization("Akkadian") {
//!     // fired CivilizationUnlocked and StoryUnlocked(ST002)
//! }
//! service.record_quiz_attempt(QuizId::new("quiz-ziggurat"), 8, 10, true).await?;
//! ```

pub mod aggregate;
pub mod codec;
pub mod quiz;
pub mod service;

pub use aggregate::{StudentProgress, DEFAULT_HEARTS};
pub use quiz::QuizAttempt;
pub use service::ProgressService;

use lore_remote::RemoteError;
use thiserror::Error;

/// Progress layer errors.
#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("no active student session")]
    NoActiveStudent,

    #[error("progress not initialized for the active student")]
    NotInitialized,

    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

pub type ProgressResult<T> = Result<T, ProgressError>;
