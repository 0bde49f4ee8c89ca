//! Speech synthesis seam.

use crate::{RemoteError, RemoteResult};
use async_trait::async_trait;
use lore_core::ids::VoiceId;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Text-to-speech collaborator.
///
/// Used only by authoring flows; playback never synthesizes.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Renders `text` in the given voice, returning encoded audio.
    async fn synthesize(&self, voice: &VoiceId, text: &str) -> RemoteResult<Vec<u8>>;
}

/// Deterministic synthesizer for tests and offline authoring.
///
/// Output bytes are a function of (voice, text), so tests can assert
/// that the right request reached the provider.
#[derive(Default)]
pub struct StubSynthesizer {
    offline: AtomicBool,
    calls: AtomicU64,
}

impl StubSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSynthesizer for StubSynthesizer {
    async fn synthesize(&self, voice: &VoiceId, text: &str) -> RemoteResult<Vec<u8>> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable(
                "speech provider is offline".to_string(),
            ));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("tts:{}:{}", voice, text).into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_output_is_deterministic() {
        let synth = StubSynthesizer::new();
        let voice = VoiceId::new("amelia");
        let first = synth.synthesize(&voice, "Hello").await.unwrap();
        let second = synth.synthesize(&voice, "Hello").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(synth.call_count(), 2);
    }

    #[tokio::test]
    async fn test_offline_synthesis_fails() {
        let synth = StubSynthesizer::new();
        synth.set_offline(true);
        assert!(synth
            .synthesize(&VoiceId::new("amelia"), "Hello")
            .await
            .is_err());
        assert_eq!(synth.call_count(), 0);
    }
}
