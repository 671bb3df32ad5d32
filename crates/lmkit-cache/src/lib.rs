//! Content-addressed, file-backed cache of completed chat outputs
//!
//! Entries are keyed by a SHA-256 digest of the model identity, the
//! conversation, the effective parameters and [`CACHE_VERSION`]. Each entry
//! is one JSON file, written once; writing the same key again replaces the
//! file atomically.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use lmkit_llm::{ChatOutput, ChatParameters, Message};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Output format version; bumping it orphans every existing entry
pub const CACHE_VERSION: u32 = 2;

/// Cache errors
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem failure
    #[error("cache io on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Entry could not be encoded or decoded
    #[error("serialization: {0}")]
    Serialization(String),
    /// Cache root exists but is a file
    #[error("cache root {0} is not a directory")]
    NotADirectory(PathBuf),
}

impl CacheError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Compute the cache key for a request at the current [`CACHE_VERSION`]
pub fn compute_cache_key(model_id: &str, messages: &[Message], parameters: &ChatParameters) -> String {
    compute_cache_key_with_version(model_id, messages, parameters, CACHE_VERSION)
}

/// Compute the cache key for a request at an explicit format version
///
/// Hashes one JSON document holding the conversation as `[role, name,
/// content]` triples, the model identity, the set parameters as a sorted
/// `name -> value` map and the version tag. JSON string escaping keeps turn
/// and field boundaries unambiguous whatever the message text contains.
pub fn compute_cache_key_with_version(
    model_id: &str,
    messages: &[Message],
    parameters: &ChatParameters,
    version: u32,
) -> String {
    let conversation: Vec<Value> = messages
        .iter()
        .map(|message| json!([message.role().to_string(), message.name(), message.canonical_content()]))
        .collect();

    let document = json!({
        "messages": conversation,
        "model_id": model_id,
        "parameters": parameters.canonical_pairs(),
        "cache_version": version,
    });

    let hash = Sha256::digest(document.to_string().as_bytes());
    format!("{hash:x}")
}

/// File-system result cache
///
/// Safe to share between concurrent tasks: reads never observe a partially
/// written entry, and concurrent writes of one key leave one complete file.
#[derive(Debug, Clone)]
pub struct ResultCache {
    root: PathBuf,
}

impl ResultCache {
    /// Open (creating if needed) a cache rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        if root.exists() && !root.is_dir() {
            return Err(CacheError::NotADirectory(root));
        }
        std::fs::create_dir_all(&root).map_err(|e| CacheError::io(&root, e))?;

        tracing::debug!(root = %root.display(), "opened result cache");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Look up an entry; hits come back flagged `is_cache`
    pub async fn get(&self, cache_key: &str) -> Result<Option<ChatOutput>, CacheError> {
        let path = self.entry_path(cache_key);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(cache_key, "cache miss");
                return Ok(None);
            }
            Err(e) => return Err(CacheError::io(&path, e)),
        };

        let output: ChatOutput = serde_json::from_slice(&bytes)
            .map_err(|e| CacheError::Serialization(format!("deserialize {}: {e}", path.display())))?;

        tracing::debug!(cache_key, "cache hit");
        Ok(Some(output.into_replayed()))
    }

    /// Store an entry, replacing any previous file for the key
    pub async fn set(&self, cache_key: &str, output: &ChatOutput) -> Result<(), CacheError> {
        let path = self.entry_path(cache_key);
        let Some(shard) = path.parent() else {
            return Err(CacheError::NotADirectory(path));
        };
        tokio::fs::create_dir_all(shard)
            .await
            .map_err(|e| CacheError::io(shard, e))?;

        let stored = ChatOutput {
            is_cache: false,
            ..output.clone()
        };
        let data =
            serde_json::to_vec(&stored).map_err(|e| CacheError::Serialization(format!("serialize: {e}")))?;

        let tmp = shard.join(format!("{cache_key}.{}.tmp", uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, &data).await.map_err(|e| CacheError::io(&tmp, e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(CacheError::io(&path, e));
        }

        tracing::debug!(cache_key, bytes = data.len(), "cached output");
        Ok(())
    }

    /// `<root>/<first two key chars>/<key>.json`
    fn entry_path(&self, cache_key: &str) -> PathBuf {
        let shard = cache_key.get(..2).unwrap_or("__");
        self.root.join(shard).join(format!("{cache_key}.json"))
    }
}
