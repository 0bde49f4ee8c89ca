//! # Lore Prefs
//!
//! Local key-value preferences, namespaced per student.
//!
//! Each student's preferences live in their own JSON file under the
//! store root, so two students on a shared device never read each
//! other's values. Reads never fail: a missing file, a missing key, or a
//! value of the wrong shape all resolve to the caller's default, and a
//! corrupt entry is cleared so it cannot poison later sessions.
//!
//! # Example
//!
//! ```ignore
//! use lore_prefs::PrefsStore;
//! use lore_core::ids::StudentId;
//!
//! let store = PrefsStore::new("/data/lore");
//! let prefs = store.student(&StudentId::new("s-1042"));
//!
//! prefs.set_u32("selectedSlot", 2)?;
//! assert_eq!(prefs.get_u32("selectedSlot", 1), 2);
//! assert_eq!(prefs.get_u32("neverSet", 1), 1);
//! ```

pub mod store;

pub use store::{keys, PrefsStore, StudentPrefs};

use thiserror::Error;

/// Preference write failures. Read paths are infallible by design.
#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

pub type PrefsResult<T> = Result<T, PrefsError>;
