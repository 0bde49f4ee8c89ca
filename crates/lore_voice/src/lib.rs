//! # Lore Voice
//!
//! Turns a dialogue line into a playable audio file.
//!
//! Resolution prefers the local cache, falls back to downloading the
//! narrated asset from the blob store, and (authoring only) synthesizes
//! a new take via the text-to-speech collaborator. Everything hangs off
//! one deterministic sanitized filename, applied identically on write,
//! read, and remote path construction; at most one audio file exists
//! per dialogue index.
//!
//! # Example
//!
//! ```ignore
//! use lore_voice::{AudioResolver, DialogueLine};
//!
//! let mut line = DialogueLine::new("Sebastian", "Clay remembers what we forget.");
//! line.selected_voice_id = Some(VoiceId::new("amelia"));
//!
//! if let Some(audio) = resolver.resolve(&line, 3, 7).await? {
//!     player.play(&audio.path);
//! }
//! ```

pub mod filename;
pub mod line;
pub mod profile;
pub mod resolver;

pub use line::DialogueLine;
pub use profile::{VoiceCatalog, VoiceProfile};
pub use resolver::{AudioOrigin, AudioResolver, ResolvedAudio, ResolverStats};

use lore_remote::RemoteError;
use thiserror::Error;

/// Audio resolution errors.
#[derive(Debug, Error)]
pub enum VoiceError {
    /// Synthesis was requested for a line with no voice assigned.
    #[error("no voice selected for this line")]
    NoVoiceSelected,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),
}

pub type VoiceResult<T> = Result<T, VoiceError>;
