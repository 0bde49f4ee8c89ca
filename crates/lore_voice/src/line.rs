//! A dialogue line as the resolver sees it.

use lore_core::ids::VoiceId;
use std::path::PathBuf;

/// One line of story dialogue plus the audio state attached to it.
///
/// The path fields are written only by the resolver, after the files
/// they point at exist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DialogueLine {
    pub character_name: String,
    pub dialogue_text: String,
    pub selected_voice_id: Option<VoiceId>,
    /// Local cache file, once resolved or synthesized.
    pub audio_file_path: Option<PathBuf>,
    /// Remote object path, once mirrored.
    pub audio_storage_path: Option<String>,
    pub has_audio: bool,
}

impl DialogueLine {
    pub fn new(character: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            character_name: character.into(),
            dialogue_text: text.into(),
            ..Self::default()
        }
    }

    /// The assigned voice, with the no-voice sentinel filtered out.
    pub fn voice(&self) -> Option<&VoiceId> {
        self.selected_voice_id
            .as_ref()
            .filter(|voice| !voice.is_no_voice())
    }
}
