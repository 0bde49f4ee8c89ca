//! Content catalog.
//!
//! The civilization roster with its 1:1 story mapping, the default unlock
//! sets for a fresh student, and the scene metadata table. Static content
//! knowledge lives here so gameplay code never switches on raw strings.

use crate::ids::{ChapterId, SceneId, StoryId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Story every student starts with, and the deterministic fallback when
/// no unlock yields a latest story.
pub fn fallback_story() -> StoryId {
    StoryId::new("ST001")
}

/// Civilizations in curriculum progression order.
///
/// Declaration order is load-bearing: `Ord` follows it, and when no
/// unlocked story id parses numerically the latest story is derived from
/// the furthest civilization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Civilization {
    Sumerian,
    Akkadian,
    Babylonian,
    Egyptian,
    Greek,
}

impl Civilization {
    pub const ALL: [Civilization; 5] = [
        Civilization::Sumerian,
        Civilization::Akkadian,
        Civilization::Babylonian,
        Civilization::Egyptian,
        Civilization::Greek,
    ];

    /// Exact-name lookup. Unknown names are rejected, never coerced.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Sumerian" => Some(Civilization::Sumerian),
            "Akkadian" => Some(Civilization::Akkadian),
            "Babylonian" => Some(Civilization::Babylonian),
            "Egyptian" => Some(Civilization::Egyptian),
            "Greek" => Some(Civilization::Greek),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Civilization::Sumerian => "Sumerian",
            Civilization::Akkadian => "Akkadian",
            Civilization::Babylonian => "Babylonian",
            Civilization::Egyptian => "Egyptian",
            Civilization::Greek => "Greek",
        }
    }

    /// Position in the curriculum, starting at 0.
    pub fn progression_order(&self) -> usize {
        *self as usize
    }

    /// The story unlocked together with this civilization.
    pub fn story(&self) -> StoryId {
        match self {
            Civilization::Sumerian => StoryId::new("ST001"),
            Civilization::Akkadian => StoryId::new("ST002"),
            Civilization::Babylonian => StoryId::new("ST003"),
            Civilization::Egyptian => StoryId::new("ST004"),
            Civilization::Greek => StoryId::new("ST005"),
        }
    }
}

impl fmt::Display for Civilization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Chapters a fresh student starts with.
pub fn default_chapters() -> BTreeSet<ChapterId> {
    BTreeSet::from([ChapterId::new("CH001")])
}

/// Stories a fresh student starts with.
pub fn default_stories() -> BTreeSet<StoryId> {
    BTreeSet::from([fallback_story()])
}

/// Civilizations a fresh student starts with.
pub fn default_civilizations() -> BTreeSet<Civilization> {
    BTreeSet::from([Civilization::Sumerian])
}

/// Static metadata for one scene.
#[derive(Debug, Clone)]
pub struct SceneMeta {
    /// Name shown in save-slot labels.
    pub friendly_name: String,
    /// Scene the player is moved to after clearing this one's challenge.
    pub next_scene: Option<SceneId>,
}

/// Lookup table from scene id to its metadata.
///
/// Replaces the scene-name string switches scattered through earlier
/// revisions of the save flow.
#[derive(Debug, Clone, Default)]
pub struct SceneTable {
    scenes: HashMap<SceneId, SceneMeta>,
}

impl SceneTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shipped story scenes.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        table.insert("SumerianStory", "The Cradle of Writing", Some("SumerianChallenge"));
        table.insert("SumerianChallenge", "Sumerian Challenge", Some("AkkadianStory"));
        table.insert("AkkadianStory", "The First Empire", Some("AkkadianChallenge"));
        table.insert("AkkadianChallenge", "Akkadian Challenge", Some("BabylonianStory"));
        table.insert("BabylonianStory", "Laws of Babylon", Some("BabylonianChallenge"));
        table.insert("BabylonianChallenge", "Babylonian Challenge", Some("EgyptianStory"));
        table.insert("EgyptianStory", "Gifts of the Nile", Some("EgyptianChallenge"));
        table.insert("EgyptianChallenge", "Egyptian Challenge", Some("GreekStory"));
        table.insert("GreekStory", "The Aegean Dawn", Some("GreekChallenge"));
        table.insert("GreekChallenge", "Greek Challenge", None);
        table
    }

    pub fn insert(&mut self, id: &str, friendly_name: &str, next_scene: Option<&str>) {
        self.scenes.insert(
            SceneId::new(id),
            SceneMeta {
                friendly_name: friendly_name.to_string(),
                next_scene: next_scene.map(SceneId::from),
            },
        );
    }

    pub fn get(&self, scene: &SceneId) -> Option<&SceneMeta> {
        self.scenes.get(scene)
    }

    /// Display name for slot labels. Unknown scenes fall back to the raw
    /// id so a stale save still renders something.
    pub fn friendly_name(&self, scene: &SceneId) -> String {
        self.scenes
            .get(scene)
            .map(|meta| meta.friendly_name.clone())
            .unwrap_or_else(|| scene.as_str().to_string())
    }

    /// Where post-challenge progression lands from the given scene.
    pub fn next_scene(&self, scene: &SceneId) -> Option<SceneId> {
        self.scenes.get(scene).and_then(|meta| meta.next_scene.clone())
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_civilization_name_round_trip() {
        for civ in Civilization::ALL {
            assert_eq!(Civilization::from_name(civ.name()), Some(civ));
        }
        assert_eq!(Civilization::from_name("Atlantean"), None);
        assert_eq!(Civilization::from_name("sumerian"), None);
    }

    #[test]
    fn test_story_mapping_is_one_to_one() {
        let stories: BTreeSet<StoryId> =
            Civilization::ALL.iter().map(|c| c.story()).collect();
        assert_eq!(stories.len(), Civilization::ALL.len());
        assert_eq!(Civilization::Sumerian.story(), fallback_story());
    }

    #[test]
    fn test_progression_order_follows_declaration() {
        assert!(Civilization::Sumerian < Civilization::Greek);
        assert_eq!(Civilization::Sumerian.progression_order(), 0);
        assert_eq!(Civilization::Greek.progression_order(), 4);
    }

    #[test]
    fn test_fresh_student_defaults() {
        assert!(default_chapters().contains(&ChapterId::new("CH001")));
        assert!(default_stories().contains(&StoryId::new("ST001")));
        assert!(default_civilizations().contains(&Civilization::Sumerian));
        assert_eq!(default_chapters().len(), 1);
    }

    #[test]
    fn test_scene_table_lookup_and_fallback() {
        let table = SceneTable::builtin();
        let story = SceneId::new("SumerianStory");
        assert_eq!(table.friendly_name(&story), "The Cradle of Writing");
        assert_eq!(
            table.next_scene(&story),
            Some(SceneId::new("SumerianChallenge"))
        );

        let unknown = SceneId::new("DebugRoom");
        assert_eq!(table.friendly_name(&unknown), "DebugRoom");
        assert_eq!(table.next_scene(&unknown), None);
    }

    #[test]
    fn test_final_challenge_has_no_next_scene() {
        let table = SceneTable::builtin();
        assert_eq!(table.next_scene(&SceneId::new("GreekChallenge")), None);
    }
}
