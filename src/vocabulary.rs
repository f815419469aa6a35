//! Controlled vocabulary loading.
//!
//! A vocabulary source is a UTF-8 text file where every data line is a chain
//! of terms joined by `>`, most general first. Loading produces the flat list
//! of terms (the most specific segment of each line) together with a
//! parent to children [`HierarchyMap`] holding one edge per line.
//!
//! # Examples
//!
//! ```no_run
//! use taxo::vocabulary::{VocabularyCache, load_with_fallback};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // One-off load that never fails outright
//! let (vocabulary, error) = load_with_fallback("vocabulary.txt");
//! if let Some(error) = error {
//!     eprintln!("{error}");
//! }
//! println!("{} terms", vocabulary.terms().len());
//!
//! // Parse once, reuse for every request
//! let mut cache = VocabularyCache::new();
//! let vocabulary = cache.get_or_load("vocabulary.txt")?;
//! println!("{} parents", vocabulary.hierarchy().len());
//! # Ok(())
//! # }
//! ```

mod cache;
mod loader;

pub use cache::VocabularyCache;
pub use loader::{
    HierarchyMap, LoadError, SEPARATOR, Vocabulary, load, load_with_fallback, parse_source,
};
