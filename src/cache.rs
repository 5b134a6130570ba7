/*!
 * Content-addressed cache of recognized word timings.
 *
 * Recognition is the slowest step of a job, so its output is stored on disk
 * keyed by a SHA-256 fingerprint of the source file(s). One JSON file per
 * key; writes go through a temporary file in the same directory followed by
 * an atomic rename, so concurrent readers see either the old entry or the
 * new one, never a partial file.
 */

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use log::{debug, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::app_config::CacheConfig;
use crate::errors::CacheError;
use crate::words::WordStore;

/// Block size used when streaming files through the hasher
const HASH_BLOCK_SIZE: usize = 8192;

/// How a cache key is derived when a subtitle file accompanies the media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPolicy {
    /// Word timings depend only on the audio
    #[default]
    MediaOnly,
    /// Result also depends on the identity of the existing subtitles
    MediaAndSubtitle,
}

/// A stored recognition result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Hex digest key
    pub key: String,
    /// Recognized words
    pub words: WordStore,
    /// Detected language code
    pub language: String,
    /// RFC 3339 creation time
    pub created_at: String,
}

/// A cache file found on disk
#[derive(Debug, Clone)]
pub struct CacheFileInfo {
    pub key: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: Option<SystemTime>,
}

/// Stream `reader` through SHA-256 and return the lowercase hex digest
pub fn fingerprint_reader<R: Read>(mut reader: R) -> Result<String, CacheError> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; HASH_BLOCK_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Fingerprint a file on a blocking worker
pub async fn fingerprint_file(path: &Path) -> Result<String, CacheError> {
    let path = path.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let file = fs::File::open(&path)
            .map_err(|e| CacheError::Hashing(format!("Failed to open {}: {}", path.display(), e)))?;
        fingerprint_reader(file)
    })
    .await
    .map_err(|e| CacheError::Hashing(format!("File hashing task panicked: {}", e)))?
}

/// Combine one or two digests into a cache key
pub fn cache_key(primary: &str, secondary: Option<&str>) -> String {
    match secondary {
        Some(secondary) => format!("{}_{}", primary, secondary),
        None => primary.to_string(),
    }
}

/// Derive the cache key for a media file and optional subtitle file
pub async fn key_for_files(media: &Path, subtitle: Option<&Path>, policy: KeyPolicy) -> Result<String, CacheError> {
    let media_hash = fingerprint_file(media).await?;
    match (policy, subtitle) {
        (KeyPolicy::MediaAndSubtitle, Some(subtitle)) => {
            let subtitle_hash = fingerprint_file(subtitle).await?;
            Ok(cache_key(&media_hash, Some(&subtitle_hash)))
        }
        _ => Ok(cache_key(&media_hash, None)),
    }
}

/// File-backed word timing cache, cheap to clone and share between jobs
#[derive(Clone)]
pub struct ContentCache {
    directory: PathBuf,
    enabled: bool,
    write_lock: Arc<Mutex<()>>,
    hits: Arc<AtomicUsize>,
    misses: Arc<AtomicUsize>,
}

impl ContentCache {
    pub fn new(directory: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            directory: directory.into(),
            enabled,
            write_lock: Arc::new(Mutex::new(())),
            hits: Arc::new(AtomicUsize::new(0)),
            misses: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.resolve_directory(), config.enabled)
    }

    /// A cache that never stores anything
    pub fn disabled() -> Self {
        Self::new(std::env::temp_dir(), false)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Create the cache directory and check that it accepts writes
    pub fn ensure_directory(&self) -> Result<(), CacheError> {
        fs::create_dir_all(&self.directory).map_err(|e| {
            CacheError::Unavailable(format!("{}: {}", self.directory.display(), e))
        })?;
        NamedTempFile::new_in(&self.directory).map_err(|e| {
            CacheError::Unavailable(format!("{} is not writable: {}", self.directory.display(), e))
        })?;
        Ok(())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let file_stem: String = key.chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.directory.join(format!("{}.json", file_stem))
    }

    /// Look up an entry; any failure is logged and reported as a miss
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        match self.try_get(key) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Cache read failed for {}, treating as miss: {}", truncate_key(key), e);
                None
            }
        }
    }

    /// Look up an entry, surfacing read and decode errors
    pub fn try_get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        if !self.enabled {
            return Ok(None);
        }

        let path = self.entry_path(key);
        if !path.is_file() {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!("Cache miss for {}", truncate_key(key));
            return Ok(None);
        }

        let result = fs::read(&path)
            .map_err(CacheError::from)
            .and_then(|bytes| serde_json::from_slice::<CacheEntry>(&bytes).map_err(CacheError::from));

        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };

        if entry.key != key {
            warn!("Cache file {} holds key {}, ignoring", path.display(), truncate_key(&entry.key));
            self.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        debug!("Cache hit for {} ({} words)", truncate_key(key), entry.words.len());
        Ok(Some(entry))
    }

    /// Store an entry, replacing any previous one for `key`
    pub fn put(&self, key: &str, words: &WordStore, language: &str) -> Result<CacheEntry, CacheError> {
        let entry = CacheEntry {
            key: key.to_string(),
            words: words.clone(),
            language: language.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        if !self.enabled {
            return Ok(entry);
        }

        let payload = serde_json::to_vec(&entry)?;
        let path = self.entry_path(key);

        {
            let _guard = self.write_lock.lock();
            fs::create_dir_all(&self.directory)?;

            let mut temp = NamedTempFile::new_in(&self.directory)?;
            temp.write_all(&payload)?;
            temp.as_file().sync_all()?;
            temp.persist(&path).map_err(|e| CacheError::Io(e.error))?;
        }

        debug!("Cached {} words for {}", words.len(), truncate_key(key));
        Ok(entry)
    }

    /// `put` on a blocking worker
    pub async fn store(&self, key: &str, words: &WordStore, language: &str) -> Result<CacheEntry, CacheError> {
        let cache = self.clone();
        let key = key.to_string();
        let words = words.clone();
        let language = language.to_string();

        tokio::task::spawn_blocking(move || cache.put(&key, &words, &language))
            .await
            .map_err(|e| CacheError::Unavailable(format!("Cache write task panicked: {}", e)))?
    }

    /// Delete the entry for `key`, returning whether a file was removed
    pub fn remove(&self, key: &str) -> Result<bool, CacheError> {
        let path = self.entry_path(key);
        let _guard = self.write_lock.lock();
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// List cache files on disk
    pub fn entries(&self) -> Result<Vec<CacheFileInfo>, CacheError> {
        if !self.directory.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.directory).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| CacheError::Io(std::io::Error::other(e.to_string())))?;
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let metadata = entry.metadata()
                .map_err(|e| CacheError::Io(std::io::Error::other(e.to_string())))?;
            let key = path.file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            files.push(CacheFileInfo {
                key,
                path: path.to_path_buf(),
                size_bytes: metadata.len(),
                modified: metadata.modified().ok(),
            });
        }

        files.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(files)
    }

    /// Remove entries whose file is older than `max_age`
    pub fn prune_older_than(&self, max_age: Duration) -> Result<usize, CacheError> {
        let now = SystemTime::now();
        let mut removed = 0;

        for file in self.entries()? {
            let expired = file.modified
                .and_then(|modified| now.duration_since(modified).ok())
                .is_some_and(|age| age >= max_age);
            if expired && self.remove(&file.key)? {
                removed += 1;
            }
        }

        if removed > 0 {
            debug!("Pruned {} cache entries from {}", removed, self.directory.display());
        }
        Ok(removed)
    }

    /// Get cache statistics: hits, misses, hit rate
    pub fn stats(&self) -> (usize, usize, f64) {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        (hits, misses, hit_rate)
    }
}

impl std::fmt::Debug for ContentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentCache")
            .field("directory", &self.directory)
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Shorten long digests for log lines
fn truncate_key(key: &str) -> String {
    if key.chars().count() <= 16 {
        key.to_string()
    } else {
        format!("{}...", key.chars().take(16).collect::<String>())
    }
}
