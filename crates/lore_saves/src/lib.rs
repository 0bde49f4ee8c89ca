//! # Lore Saves
//!
//! The four-slot save system.
//!
//! The local JSON file is authoritative: saving writes it synchronously
//! and only then mirrors the slot to the remote document store,
//! fire-and-forget. Loading reads locally and pulls the save's progress
//! snapshot from the remote in the background (remote wins on explicit
//! load). Deletes are idempotent on both sides.
//!
//! # Example
//!
//! ```ignore
//! use lore_saves::SaveSlotStore;
//! use lore_core::ids::{SceneId, SlotNumber};
//!
//! let slot = SlotNumber::new(2).unwrap();
//! saves.save_game(slot, SceneId::new("AkkadianStory"), 14).await?;
//! assert!(saves.has_save_file(slot));
//! let data = saves.load_game(slot).await?;
//! ```

pub mod codec;
pub mod data;
pub mod store;

pub use codec::SaveSlotDoc;
pub use data::{SaveSlotData, SlotView};
pub use store::SaveSlotStore;

use lore_core::ids::SlotNumber;
use lore_remote::RemoteError;
use thiserror::Error;

/// Save layer errors.
#[derive(Debug, Error)]
pub enum SaveError {
    /// Saving is blocked in the current access mode ("cannot save from
    /// here").
    #[error("saving is not available in the current access mode")]
    SaveNotAllowed,

    #[error("no active student session")]
    NoActiveStudent,

    #[error("slot {0} is empty")]
    SlotEmpty(SlotNumber),

    #[error("slot {0} could not be read and was cleared")]
    SlotCorrupt(SlotNumber),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),
}

pub type SaveResult<T> = Result<T, SaveError>;
