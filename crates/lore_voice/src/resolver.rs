//! Audio resolution.
//!
//! Playback ladder: exact canonical file, then the lexicographically
//! last `dialogue_{index}_*` match (legacy takes), then a remote
//! download cached under the canonical name. Playback never
//! synthesizes; that is the authoring path, which also enforces the
//! one-file-per-index rule.

use crate::filename;
use crate::line::DialogueLine;
use crate::profile::VoiceCatalog;
use crate::{VoiceError, VoiceResult};
use lore_core::ids::{OwnerId, VoiceId};
use lore_remote::{audio_object_path, BlobStore, RemoteError, SpeechSynthesizer};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where a resolved audio file came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioOrigin {
    LocalExact,
    LocalPrefix,
    Downloaded,
    Synthesized,
}

/// A playable audio file.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAudio {
    pub path: PathBuf,
    pub origin: AudioOrigin,
}

/// Resolution counters.
#[derive(Debug, Clone, Default)]
pub struct ResolverStats {
    pub exact_hits: u64,
    pub prefix_hits: u64,
    pub downloads: u64,
    pub syntheses: u64,
    pub misses: u64,
}

pub struct AudioResolver {
    cache_root: PathBuf,
    owner: OwnerId,
    catalog: VoiceCatalog,
    blobs: Arc<dyn BlobStore>,
    speech: Arc<dyn SpeechSynthesizer>,
    stats: RwLock<ResolverStats>,
}

impl AudioResolver {
    pub fn new(
        cache_root: impl Into<PathBuf>,
        owner: OwnerId,
        catalog: VoiceCatalog,
        blobs: Arc<dyn BlobStore>,
        speech: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            cache_root: cache_root.into(),
            owner,
            catalog,
            blobs,
            speech,
            stats: RwLock::new(ResolverStats::default()),
        }
    }

    pub fn stats(&self) -> ResolverStats {
        self.stats.read().clone()
    }

    /// Resolves a line to playable audio, or `Ok(None)` when the line
    /// has no voice or no audio can be found. Absence is not an error;
    /// playback simply skips the line.
    pub async fn resolve(
        &self,
        line: &DialogueLine,
        story_index: u32,
        dialogue_index: u32,
    ) -> VoiceResult<Option<ResolvedAudio>> {
        let Some(voice) = line.voice() else {
            return Ok(None);
        };
        let file_name = filename::audio_file_name(
            dialogue_index,
            &line.character_name,
            self.voice_label(voice),
        );
        let dir = self.audio_dir(story_index);
        let canonical = dir.join(&file_name);

        if canonical.is_file() {
            self.stats.write().exact_hits += 1;
            return Ok(Some(ResolvedAudio {
                path: canonical,
                origin: AudioOrigin::LocalExact,
            }));
        }
        if let Some(path) = self.last_prefix_match(&dir, dialogue_index)? {
            self.stats.write().prefix_hits += 1;
            return Ok(Some(ResolvedAudio {
                path,
                origin: AudioOrigin::LocalPrefix,
            }));
        }

        // Remote: the line's recorded object path if it has one, else
        // the canonical path for these inputs.
        let object_path = line
            .audio_storage_path
            .clone()
            .unwrap_or_else(|| audio_object_path(&self.owner, story_index, &file_name));
        match self.blobs.download(&object_path).await {
            Ok(bytes) => {
                std::fs::create_dir_all(&dir)?;
                std::fs::write(&canonical, &bytes)?;
                self.stats.write().downloads += 1;
                Ok(Some(ResolvedAudio {
                    path: canonical,
                    origin: AudioOrigin::Downloaded,
                }))
            }
            Err(RemoteError::NotFound(_)) => {
                self.stats.write().misses += 1;
                log::debug!("No audio anywhere for {}; playback skips", file_name);
                Ok(None)
            }
            Err(err) => {
                self.stats.write().misses += 1;
                log::warn!(
                    "Audio download failed for {}: {} (playback skips)",
                    object_path,
                    err
                );
                Ok(None)
            }
        }
    }

    /// Authoring path: renders a fresh take, replaces every prior take
    /// for this index (local files and superseded mirror objects),
    /// uploads the new one, and only then updates the line's audio
    /// fields.
    ///
    /// Synthesis happens before anything is deleted, so a provider
    /// failure leaves existing audio untouched.
    pub async fn synthesize(
        &self,
        line: &mut DialogueLine,
        story_index: u32,
        dialogue_index: u32,
    ) -> VoiceResult<ResolvedAudio> {
        let Some(voice) = line.voice().cloned() else {
            return Err(VoiceError::NoVoiceSelected);
        };
        let file_name = filename::audio_file_name(
            dialogue_index,
            &line.character_name,
            self.voice_label(&voice),
        );
        let bytes = self.speech.synthesize(&voice, &line.dialogue_text).await?;

        // At most one audio file per dialogue index.
        let dir = self.audio_dir(story_index);
        self.clear_index(&dir, dialogue_index)?;
        std::fs::create_dir_all(&dir)?;
        let local = dir.join(&file_name);
        std::fs::write(&local, &bytes)?;

        // The mirror obeys the same rule: takes uploaded under old
        // character or voice names would shadow the fresh one on
        // devices still holding their storage paths.
        let object_path = audio_object_path(&self.owner, story_index, &file_name);
        self.clear_remote_index(story_index, dialogue_index, &object_path)
            .await;
        if let Err(err) = self.blobs.upload(&object_path, &bytes).await {
            log::warn!(
                "Audio upload failed for {}: {} (local copy kept)",
                object_path,
                err
            );
        }

        line.audio_file_path = Some(local.clone());
        line.audio_storage_path = Some(object_path);
        line.has_audio = true;
        self.stats.write().syntheses += 1;
        Ok(ResolvedAudio {
            path: local,
            origin: AudioOrigin::Synthesized,
        })
    }

    // Catalog name for the filename scheme; unknown ids fall back to
    // their raw string so resolution still works for retired voices.
    fn voice_label<'a>(&'a self, voice: &'a VoiceId) -> &'a str {
        self.catalog
            .by_id(voice)
            .map(|profile| profile.voice_name.as_str())
            .unwrap_or_else(|| voice.as_str())
    }

    fn audio_dir(&self, story_index: u32) -> PathBuf {
        self.cache_root
            .join(self.owner.as_str())
            .join(format!("story_{}", story_index))
            .join("audio")
    }

    fn last_prefix_match(&self, dir: &Path, dialogue_index: u32) -> VoiceResult<Option<PathBuf>> {
        if !dir.is_dir() {
            return Ok(None);
        }
        let prefix = filename::dialogue_prefix(dialogue_index);
        let mut matches: Vec<String> = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with(&prefix) {
                    matches.push(name.to_string());
                }
            }
        }
        matches.sort();
        Ok(matches.pop().map(|name| dir.join(name)))
    }

    fn clear_index(&self, dir: &Path, dialogue_index: u32) -> VoiceResult<()> {
        if !dir.is_dir() {
            return Ok(());
        }
        let prefix = filename::dialogue_prefix(dialogue_index);
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with(&prefix) {
                    std::fs::remove_file(entry.path())?;
                }
            }
        }
        Ok(())
    }

    // Best-effort: a failure here leaves stale mirror objects behind,
    // which resolution tolerates.
    async fn clear_remote_index(&self, story_index: u32, dialogue_index: u32, keep: &str) {
        let prefix = audio_object_path(
            &self.owner,
            story_index,
            &filename::dialogue_prefix(dialogue_index),
        );
        let stale = match self.blobs.list(&prefix).await {
            Ok(paths) => paths,
            Err(err) => {
                log::warn!("Could not list superseded audio under {}: {}", prefix, err);
                return;
            }
        };
        for path in stale.into_iter().filter(|path| path != keep) {
            if let Err(err) = self.blobs.delete(&path).await {
                log::warn!("Could not delete superseded audio {}: {}", path, err);
            }
        }
    }
}
