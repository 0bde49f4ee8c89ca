//! Typed identifiers.
//!
//! Every identifier that crosses a storage or collaborator boundary is a
//! newtype over its wire form, so a quiz id can never be handed to an API
//! expecting a story id.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declares a string-backed identifier newtype.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(
    /// A signed-in student. Namespaces every per-student artifact, local
    /// and remote.
    StudentId
);

string_id!(
    /// Content owner (a teacher account) whose audio assets are served to
    /// students. Namespaces the audio cache and blob paths.
    OwnerId
);

string_id!(
    /// A loadable scene.
    SceneId
);

string_id!(
    /// A chapter of the curriculum (`CH001`, `CH002`, ...).
    ChapterId
);

string_id!(
    /// A quiz.
    QuizId
);

string_id!(
    /// An achievement. Survives "new game" resets.
    AchievementId
);

string_id!(
    /// A collectible artifact. Survives "new game" resets.
    ArtifactId
);

string_id!(
    /// A story in the canonical `ST{n}` form (`ST001`, `ST002`, ...).
    StoryId
);

impl StoryId {
    /// Numeric component of a canonical `ST{n}` id.
    ///
    /// Story ordering is numeric, never lexical: `ST10` ranks above
    /// `ST2`. Ids outside the canonical form have no number and lose
    /// every ordering comparison.
    pub fn number(&self) -> Option<u32> {
        self.0.strip_prefix("ST").and_then(|digits| digits.parse().ok())
    }
}

string_id!(
    /// A text-to-speech voice as known to the synthesis provider.
    VoiceId
);

impl VoiceId {
    /// Sentinel meaning "no voice assigned"; audio resolution skips
    /// lines carrying it.
    pub fn no_voice() -> Self {
        Self("none".to_string())
    }

    pub fn is_no_voice(&self) -> bool {
        self.0.is_empty() || self.0 == "none"
    }
}

/// One of the four save slots, validated at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotNumber(u8);

impl SlotNumber {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 4;

    /// All slots in display order.
    pub const ALL: [SlotNumber; 4] = [
        SlotNumber(1),
        SlotNumber(2),
        SlotNumber(3),
        SlotNumber(4),
    ];

    /// Accepts 1 through 4. Anything else is rejected here so no other
    /// layer has to range-check slot numbers again.
    pub fn new(n: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&n).then_some(Self(n))
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    /// Zero-based position for array storage.
    pub fn index(&self) -> usize {
        (self.0 - 1) as usize
    }
}

impl fmt::Display for SlotNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_story_number_parsing() {
        assert_eq!(StoryId::new("ST001").number(), Some(1));
        assert_eq!(StoryId::new("ST010").number(), Some(10));
        assert_eq!(StoryId::new("ST10").number(), Some(10));
        assert_eq!(StoryId::new("story_one").number(), None);
        assert_eq!(StoryId::new("ST").number(), None);
        assert_eq!(StoryId::new("STX2").number(), None);
    }

    #[test]
    fn test_story_ordering_is_numeric() {
        let a = StoryId::new("ST10");
        let b = StoryId::new("ST2");
        // Lexical order would put ST2 after ST10; the numeric accessor
        // is what ordering logic must use.
        assert!(a.number().unwrap() > b.number().unwrap());
    }

    #[test]
    fn test_slot_number_validation() {
        assert!(SlotNumber::new(0).is_none());
        assert!(SlotNumber::new(5).is_none());
        for n in 1..=4 {
            let slot = SlotNumber::new(n).unwrap();
            assert_eq!(slot.get(), n);
            assert_eq!(slot.index(), (n - 1) as usize);
        }
        assert_eq!(SlotNumber::ALL.len(), 4);
    }

    #[test]
    fn test_no_voice_sentinel() {
        assert!(VoiceId::no_voice().is_no_voice());
        assert!(VoiceId::new("").is_no_voice());
        assert!(!VoiceId::new("sebastian").is_no_voice());
    }

    #[test]
    fn test_display_matches_inner() {
        assert_eq!(StudentId::new("s-1").to_string(), "s-1");
        assert_eq!(SlotNumber::new(3).unwrap().to_string(), "3");
    }
}
