//! Narration voice catalog.

use lore_core::ids::VoiceId;

/// A voice as offered to the authoring UI. Immutable display data; the
/// id is what reaches the synthesis provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceProfile {
    pub voice_name: String,
    pub voice_id: VoiceId,
    pub description: String,
    pub gender: String,
    pub accent: String,
}

/// The fixed set of voices lines can be assigned.
#[derive(Debug, Clone, Default)]
pub struct VoiceCatalog {
    voices: Vec<VoiceProfile>,
}

impl VoiceCatalog {
    /// The shipped catalog. The first entry is the no-voice sentinel so
    /// "narration off" is an ordinary selection.
    pub fn builtin() -> Self {
        let mut catalog = Self::default();
        catalog.insert("No Voice", VoiceId::no_voice(), "Plays the line silently", "", "");
        catalog.insert(
            "Amelia",
            VoiceId::new("amelia"),
            "Warm storyteller for narration",
            "female",
            "British",
        );
        catalog.insert(
            "Marcus",
            VoiceId::new("marcus"),
            "Deep, measured narrator",
            "male",
            "American",
        );
        catalog.insert(
            "Luna",
            VoiceId::new("luna"),
            "Bright voice for younger characters",
            "female",
            "Filipino",
        );
        catalog.insert(
            "Mateo",
            VoiceId::new("mateo"),
            "Friendly guide voice",
            "male",
            "Filipino",
        );
        catalog
    }

    fn insert(
        &mut self,
        name: &str,
        id: VoiceId,
        description: &str,
        gender: &str,
        accent: &str,
    ) {
        self.voices.push(VoiceProfile {
            voice_name: name.to_string(),
            voice_id: id,
            description: description.to_string(),
            gender: gender.to_string(),
            accent: accent.to_string(),
        });
    }

    pub fn voices(&self) -> &[VoiceProfile] {
        &self.voices
    }

    pub fn by_id(&self, id: &VoiceId) -> Option<&VoiceProfile> {
        self.voices.iter().find(|profile| &profile.voice_id == id)
    }

    pub fn by_name(&self, name: &str) -> Option<&VoiceProfile> {
        self.voices.iter().find(|profile| profile.voice_name == name)
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_includes_sentinel_first() {
        let catalog = VoiceCatalog::builtin();
        assert!(catalog.voices()[0].voice_id.is_no_voice());
        assert!(catalog.len() > 1);
    }

    #[test]
    fn test_lookup_by_id_and_name() {
        let catalog = VoiceCatalog::builtin();
        let amelia = catalog.by_id(&VoiceId::new("amelia")).unwrap();
        assert_eq!(amelia.voice_name, "Amelia");
        assert_eq!(catalog.by_name("Amelia").unwrap().voice_id, amelia.voice_id);
        assert!(catalog.by_id(&VoiceId::new("missing")).is_none());
        assert!(catalog.by_name("amelia").is_none());
    }
}
