//! Blob store seam and object path rules.
//!
//! Narrated audio lives in object storage under
//! `{owner}/story_{index}/audio/{fileName}`. The path is built here and
//! only here, as is the URL encoding rule for download endpoints.

use crate::{RemoteError, RemoteResult};
use async_trait::async_trait;
use lore_core::ids::OwnerId;
use parking_lot::RwLock;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Canonical audio object path: `{owner}/story_{index}/audio/{file}`.
pub fn audio_object_path(owner: &OwnerId, story_index: u32, file_name: &str) -> String {
    format!("{}/story_{}/audio/{}", owner, story_index, file_name)
}

/// Bytes escaped when an object path is embedded in a download URL.
///
/// Everything outside the unreserved set is escaped except `/` and `:`,
/// which the storage endpoint expects literally.
const OBJECT_URL_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b':')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encodes an object path for a download URL.
pub fn encode_object_url(path: &str) -> String {
    utf8_percent_encode(path, OBJECT_URL_SET).to_string()
}

/// Remote binary object storage.
///
/// `download` of an absent object is [`RemoteError::NotFound`]; callers
/// on best-effort paths treat that as a cache miss, not a failure.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn download(&self, path: &str) -> RemoteResult<Vec<u8>>;
    async fn upload(&self, path: &str, bytes: &[u8]) -> RemoteResult<()>;
    /// Idempotent; deleting an absent object succeeds.
    async fn delete(&self, path: &str) -> RemoteResult<()>;
    async fn exists(&self, path: &str) -> RemoteResult<bool>;
    /// Paths under the prefix, sorted.
    async fn list(&self, prefix: &str) -> RemoteResult<Vec<String>>;
}

/// In-memory blob store for tests and offline development.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
    offline: AtomicBool,
    downloads: AtomicU64,
    uploads: AtomicU64,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn download_count(&self) -> u64 {
        self.downloads.load(Ordering::SeqCst)
    }

    pub fn upload_count(&self) -> u64 {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    fn gate(&self) -> RemoteResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("blob store is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn download(&self, path: &str) -> RemoteResult<Vec<u8>> {
        self.gate()?;
        self.downloads.fetch_add(1, Ordering::SeqCst);
        self.objects
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(path.to_string()))
    }

    async fn upload(&self, path: &str, bytes: &[u8]) -> RemoteResult<()> {
        self.gate()?;
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.objects
            .write()
            .insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn delete(&self, path: &str) -> RemoteResult<()> {
        self.gate()?;
        self.objects.write().remove(path);
        Ok(())
    }

    async fn exists(&self, path: &str) -> RemoteResult<bool> {
        self.gate()?;
        Ok(self.objects.read().contains_key(path))
    }

    async fn list(&self, prefix: &str) -> RemoteResult<Vec<String>> {
        self.gate()?;
        Ok(self
            .objects
            .read()
            .keys()
            .filter(|path| path.starts_with(prefix))
            .cloned()
            .collect())
    }
}
