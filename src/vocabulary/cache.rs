use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::loader::{LoadError, Vocabulary, load};

/// Caller-owned cache of parsed vocabularies, keyed by source path.
///
/// Sources are assumed static for the lifetime of the cache; nothing watches
/// them for changes. Failed loads are never cached, so a missing file is
/// retried on the next lookup.
///
/// # Examples
///
/// ```no_run
/// use taxo::vocabulary::VocabularyCache;
///
/// # fn main() -> Result<(), taxo::vocabulary::LoadError> {
/// let mut cache = VocabularyCache::new();
/// let first = cache.get_or_load("vocabulary.txt")?;
/// let second = cache.get_or_load("vocabulary.txt")?;
/// assert!(std::sync::Arc::ptr_eq(&first, &second));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct VocabularyCache {
    entries: HashMap<PathBuf, Arc<Vocabulary>>,
}

impl VocabularyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the vocabulary for `path`, parsing the file on first use.
    ///
    /// # Errors
    ///
    /// Propagates the [`LoadError`] of a failed load.
    pub fn get_or_load(&mut self, path: impl AsRef<Path>) -> Result<Arc<Vocabulary>, LoadError> {
        let path = path.as_ref();
        let key = cache_key(path);

        if let Some(vocabulary) = self.entries.get(&key) {
            debug!(path = %key.display(), "vocabulary cache hit");
            return Ok(Arc::clone(vocabulary));
        }

        let vocabulary = Arc::new(load(path)?);
        self.entries.insert(key, Arc::clone(&vocabulary));
        Ok(vocabulary)
    }

    /// Drops the cached vocabulary for `path`, returning whether one was present.
    pub fn invalidate(&mut self, path: impl AsRef<Path>) -> bool {
        self.entries.remove(&cache_key(path.as_ref())).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.entries.contains_key(&cache_key(path.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves `path` to the identity used as cache key.
///
/// Different spellings of the same file share an entry when the path can be
/// canonicalized; otherwise the path is used verbatim.
fn cache_key(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
