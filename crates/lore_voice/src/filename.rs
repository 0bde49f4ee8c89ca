//! The canonical audio filename scheme.
//!
//! The same sanitized name is used for the local cache file, the prefix
//! search, and the remote object path. Deriving it twice from the same
//! inputs must produce byte-identical strings, or cached audio becomes
//! unreachable.

/// Replaces every character outside `[A-Za-z0-9_]` with `_`.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Canonical file name: `dialogue_{index}_{character}_{voice}.mp3`.
pub fn audio_file_name(dialogue_index: u32, character: &str, voice: &str) -> String {
    format!(
        "dialogue_{}_{}_{}.mp3",
        dialogue_index,
        sanitize(character),
        sanitize(voice)
    )
}

/// Search prefix matching every take for one dialogue index.
pub fn dialogue_prefix(dialogue_index: u32) -> String {
    format!("dialogue_{}_", dialogue_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize("Tatang Luis Gonzales"), "Tatang_Luis_Gonzales");
        assert_eq!(sanitize("a#b%c&d"), "a_b_c_d");
        assert_eq!(sanitize("up/down\\side"), "up_down_side");
        assert_eq!(sanitize("Amelia"), "Amelia");
        // Non-ASCII collapses too; the scheme is ASCII-only.
        assert_eq!(sanitize("Jos\u{e9}"), "Jos_");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let once = sanitize("Tatang Luis Gonzales #2");
        assert_eq!(sanitize(&once), once);
    }

    #[test]
    fn test_file_name_layout() {
        assert_eq!(
            audio_file_name(3, "Sebastian", "Amelia"),
            "dialogue_3_Sebastian_Amelia.mp3"
        );
        assert_eq!(
            audio_file_name(3, "Tatang Luis Gonzales", "Amelia"),
            "dialogue_3_Tatang_Luis_Gonzales_Amelia.mp3"
        );
    }

    #[test]
    fn test_file_name_rederives_byte_identical() {
        let first = audio_file_name(3, "Tatang Luis Gonzales", "Sebastian");
        let second = audio_file_name(3, "Tatang Luis Gonzales", "Sebastian");
        assert_eq!(first, second);
        assert!(first.starts_with(&dialogue_prefix(3)));
        for forbidden in [' ', '#', '%', '&', '/', '\\'] {
            assert!(!first.contains(forbidden));
        }
    }

    #[test]
    fn test_prefix_distinguishes_indices() {
        // Prefixes end with the separator so index 1 never matches
        // index 10's files.
        assert!(!audio_file_name(10, "A", "B").starts_with(&dialogue_prefix(1)));
    }
}
