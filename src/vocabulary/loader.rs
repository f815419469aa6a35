//! Parser for flat-text hierarchy sources.
//!
//! A source is a sequence of lines, each encoding a chain of terms from the
//! most general to the most specific, separated by `>`:
//!
//! ```text
//! # comment lines start with '#'
//! Saúde
//! Saúde > Doença
//! Saúde > Doença > Diabetes
//! ```

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::ser::SerializeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Separator between the segments of a hierarchy chain.
pub const SEPARATOR: char = '>';

/// Errors that can occur when loading a vocabulary source.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The source does not exist.
    #[error("Vocabulary file not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    /// The source exists but could not be read or decoded as UTF-8.
    #[error("Failed to read vocabulary file {}: {source}", path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LoadError {
    /// Returns the path of the source that failed to load.
    pub fn path(&self) -> &Path {
        match self {
            LoadError::SourceNotFound { path } | LoadError::SourceRead { path, .. } => {
                path.as_path()
            }
        }
    }

    fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            LoadError::SourceNotFound {
                path: path.to_path_buf(),
            }
        } else {
            LoadError::SourceRead {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Parent to children adjacency built from a hierarchy source.
///
/// Parents are kept in the order they were first seen, and each parent's
/// children in the order their lines appear. A term may be listed under
/// several parents, and cycles are stored as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchyMap {
    entries: Vec<(String, Vec<String>)>,
    index: HashMap<String, usize>,
}

impl HierarchyMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `child` to the children of `parent`, creating the entry if absent.
    pub fn add_edge(&mut self, parent: impl Into<String>, child: impl Into<String>) {
        let parent = parent.into();
        let child = child.into();
        match self.index.get(&parent) {
            Some(&slot) => self.entries[slot].1.push(child),
            None => {
                self.index.insert(parent.clone(), self.entries.len());
                self.entries.push((parent, vec![child]));
            }
        }
    }

    /// Returns the direct children recorded for `parent`.
    pub fn children(&self, parent: &str) -> Option<&[String]> {
        self.index
            .get(parent)
            .map(|&slot| self.entries[slot].1.as_slice())
    }

    pub fn contains_parent(&self, parent: &str) -> bool {
        self.index.contains_key(parent)
    }

    /// Iterates over `(parent, children)` pairs in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(parent, children)| (parent.as_str(), children.as_slice()))
    }

    /// Number of distinct parents.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of recorded parent/child edges.
    pub fn edge_count(&self) -> usize {
        self.entries.iter().map(|(_, children)| children.len()).sum()
    }
}

impl<P, C> FromIterator<(P, C)> for HierarchyMap
where
    P: Into<String>,
    C: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (P, C)>>(edges: I) -> Self {
        let mut map = HierarchyMap::new();
        for (parent, child) in edges {
            map.add_edge(parent, child);
        }
        map
    }
}

impl Serialize for HierarchyMap {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (parent, children) in &self.entries {
            map.serialize_entry(parent, children)?;
        }
        map.end()
    }
}

/// A loaded controlled vocabulary: the flat term list and its hierarchy.
///
/// # Examples
///
/// ```
/// use taxo::vocabulary::parse_source;
///
/// let vocabulary = parse_source("Saúde > Doença\nSaúde > Doença > Diabetes\n");
/// assert_eq!(vocabulary.terms(), &["Doença", "Diabetes"]);
/// assert_eq!(vocabulary.hierarchy().children("Saúde"), Some(&["Doença".to_string()][..]));
/// assert_eq!(vocabulary.hierarchy().children("Doença"), Some(&["Diabetes".to_string()][..]));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Vocabulary {
    terms: Vec<String>,
    hierarchy: HierarchyMap,
}

impl Vocabulary {
    /// Returns every line's most specific term in file order, duplicates included.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn hierarchy(&self) -> &HierarchyMap {
        &self.hierarchy
    }

    /// Returns the terms with duplicates removed, keeping first occurrences.
    pub fn distinct_terms(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.terms
            .iter()
            .filter(|term| seen.insert(term.as_str()))
            .cloned()
            .collect()
    }

    /// Returns true when no data line contributed a term.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.hierarchy.is_empty()
    }
}

/// Parses hierarchy source text into a [`Vocabulary`].
///
/// Blank lines and `#` comments are skipped. Each remaining line is split on
/// `>`, segments are trimmed and empty ones dropped. The last segment is the
/// line's term; when a second-to-last segment exists it becomes the term's
/// parent. Only that final edge is recorded, even for longer chains. Tab
/// characters inside the term and parent segments are removed.
pub fn parse_source(text: &str) -> Vocabulary {
    let mut vocabulary = Vocabulary::default();

    for line in text.split(['\n', '\r']) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let segments: Vec<&str> = line
            .split(SEPARATOR)
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .collect();

        let Some((last, ancestors)) = segments.split_last() else {
            continue;
        };

        let term = strip_tabs(last);
        if term.is_empty() {
            continue;
        }
        vocabulary.terms.push(term.clone());

        if let Some(parent) = ancestors.last() {
            vocabulary.hierarchy.add_edge(strip_tabs(parent), term);
        }
    }

    debug!(
        terms = vocabulary.terms.len(),
        parents = vocabulary.hierarchy.len(),
        edges = vocabulary.hierarchy.edge_count(),
        "parsed vocabulary source"
    );

    vocabulary
}

fn strip_tabs(segment: &str) -> String {
    segment.replace('\t', "")
}

/// Loads and parses the vocabulary source at `path`.
///
/// # Errors
///
/// Returns [`LoadError::SourceNotFound`] when the file does not exist and
/// [`LoadError::SourceRead`] for any other I/O or UTF-8 decoding failure.
pub fn load(path: impl AsRef<Path>) -> Result<Vocabulary, LoadError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| LoadError::from_io(path, e))?;
    let vocabulary = parse_source(&text);

    info!(
        path = %path.display(),
        terms = vocabulary.terms().len(),
        "loaded vocabulary"
    );

    Ok(vocabulary)
}

/// Loads the vocabulary at `path`, substituting an empty one on failure.
///
/// The error is returned alongside the empty vocabulary so callers can tell a
/// failed load apart from a source that legitimately holds no terms.
pub fn load_with_fallback(path: impl AsRef<Path>) -> (Vocabulary, Option<LoadError>) {
    match load(path) {
        Ok(vocabulary) => (vocabulary, None),
        Err(e) => {
            warn!(error = %e, "vocabulary failed to load, using empty vocabulary");
            (Vocabulary::default(), Some(e))
        }
    }
}
