//! # Lore Sync
//!
//! Reconciliation between local cache, the in-memory progress aggregate,
//! and the remote store, at two well-defined points: session start and
//! entering the save menu.
//!
//! The coordinator exists to keep background work from feeding itself.
//! Recalculating scores never saves, persisting never recalculates, and
//! the one place the two compose is [`SyncCoordinator::recalculate_and_save`].
//! Overlapping triggers are silent no-ops, and a persist inside the
//! cooldown window is dropped.
//!
//! # Example
//!
//! ```ignore
//! use lore_sync::{SyncConfig, SyncCoordinator};
//!
//! let sync = SyncCoordinator::new(session, saves, progress, prefs, events, SyncConfig::default());
//! sync.on_session_start().await?;
//!
//! // Save menu opened: pull all four slots, then render the views.
//! if let Some(views) = sync.enter_save_menu().await? {
//!     for view in &views {
//!         println!("{}", view.label(&scenes));
//!     }
//! }
//! ```

pub mod coordinator;

pub use coordinator::{SyncConfig, SyncCoordinator, SyncStats};

use lore_progress::ProgressError;
use thiserror::Error;

/// Coordinator errors. Transient remote failures never surface here;
/// they are logged and degraded per operation.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("progress error: {0}")]
    Progress(#[from] ProgressError),
}

pub type SyncResult<T> = Result<T, SyncError>;
