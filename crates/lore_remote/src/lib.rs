//! # Lore Remote
//!
//! Collaborator seams for everything that lives off-device:
//!
//! - [`DocumentStore`] - the JSON document database (progress, saves,
//!   attempt logs, leaderboards)
//! - [`BlobStore`] - binary object storage (narrated audio)
//! - [`SpeechSynthesizer`] - the text-to-speech provider
//!
//! Game code only ever sees these traits. Production wires cloud-backed
//! implementations; tests use the in-memory doubles shipped here, which
//! support fault injection (offline mode, added latency) and count the
//! operations they serve.
//!
//! ```ignore
//! use lore_remote::{DocumentStore, MemoryDocumentStore, collections};
//!
//! let store = MemoryDocumentStore::new();
//! store.put(collections::GAME_PROGRESS, "s-1", doc).await?;
//! let doc = store.get(collections::GAME_PROGRESS, "s-1").await?;
//! ```

pub mod blob;
pub mod document;
pub mod speech;

pub use blob::{audio_object_path, encode_object_url, BlobStore, MemoryBlobStore};
pub use document::{collections, DocumentStore, MemoryDocumentStore};
pub use speech::{SpeechSynthesizer, StubSynthesizer};

use thiserror::Error;

/// Errors surfaced by remote collaborators.
///
/// Callers that treat remote work as best-effort log these and move on;
/// nothing in this enum is a local-state failure.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    #[error("remote operation timed out")]
    Timeout,

    #[error("not authorized: {0}")]
    Auth(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;
