//! Lore Core - Shared Foundations
//!
//! Identifiers, content catalog, session context, and the game event
//! channel shared by the Lore Engine crates.
//!
//! # Features
//!
//! - Typed identifiers for students, stories, chapters, quizzes, slots, voices
//! - Civilization catalog with progression order and 1:1 story mapping
//! - Scene metadata table (friendly names, post-challenge progression)
//! - Session context with bounded waits for sign-in
//! - Typed game event channel for UI notification
//!
//! # Example
//!
//! ```ignore
//! use lore_core::prelude::*;
//!
//! let session = SessionContext::new();
//! session.set_active_student(StudentId::new("s-1042"));
//!
//! let civ = Civilization::from_name("Sumerian").unwrap();
//! assert_eq!(civ.story().as_str(), "ST001");
//! ```

pub mod catalog;
pub mod events;
pub mod ids;
pub mod session;

pub mod prelude {
    pub use crate::catalog::{fallback_story, Civilization, SceneMeta, SceneTable};
    pub use crate::events::{EventReceiver, EventSender, GameEvent};
    pub use crate::ids::{
        AchievementId, ArtifactId, ChapterId, OwnerId, QuizId, SceneId, SlotNumber, StoryId,
        StudentId, VoiceId,
    };
    pub use crate::session::{AccessMode, SessionContext};
}

pub use prelude::*;
