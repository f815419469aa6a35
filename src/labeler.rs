//! One labeling action: ask the oracle for terms, then drop implied parents.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::oracle::{OracleError, TermOracle};
use crate::reducer::{InverseIndex, SuggestionSet};
use crate::vocabulary::{LoadError, Vocabulary, VocabularyCache};

/// Errors that stop a labeling action before labels are produced.
#[derive(Debug, Error)]
pub enum LabelError {
    /// The vocabulary source could not be loaded.
    #[error(transparent)]
    Vocabulary(#[from] LoadError),

    /// The vocabulary loaded but holds no terms to choose from.
    #[error("Vocabulary file contains no terms: {}", path.display())]
    EmptyVocabulary { path: std::path::PathBuf },

    /// The oracle failed; no reduction was attempted.
    #[error(transparent)]
    Oracle(#[from] OracleError),
}

/// Result of a successful labeling action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelOutcome {
    /// Terms as returned by the oracle, in its order.
    pub suggested: Vec<String>,
    /// Suggested terms with implied parents removed.
    pub labels: SuggestionSet,
}

impl LabelOutcome {
    /// Returns `false` when the oracle found no applicable term.
    ///
    /// This is a valid outcome, distinct from a failed oracle call.
    pub fn has_labels(&self) -> bool {
        !self.labels.is_empty()
    }

    /// Terms that were suggested but removed as implied by a child.
    pub fn collapsed(&self) -> SuggestionSet {
        self.suggested
            .iter()
            .filter(|term| !self.labels.contains(term.as_str()))
            .cloned()
            .collect()
    }
}

/// Turns texts into minimal label sets using an injected oracle.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use taxo::labeler::Labeler;
/// use taxo::llm::OllamaClientBuilder;
/// use taxo::oracle::LlmTermOracle;
/// use taxo::vocabulary::VocabularyCache;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = OllamaClientBuilder::new().build()?;
/// let labeler = Labeler::new(Arc::new(LlmTermOracle::new(Arc::new(client))));
///
/// let mut cache = VocabularyCache::new();
/// let outcome = labeler.label_source(
///     &mut cache,
///     "vocabulary.txt",
///     "Esta lei trata do tratamento do diabetes.",
///     5,
/// )?;
/// println!("{:?}", outcome.labels);
/// # Ok(())
/// # }
/// ```
pub struct Labeler {
    oracle: Arc<dyn TermOracle>,
}

impl Labeler {
    pub fn new(oracle: Arc<dyn TermOracle>) -> Self {
        Self { oracle }
    }

    /// Labels `text` against an already loaded vocabulary.
    ///
    /// The oracle sees the vocabulary's distinct terms in file order. Its
    /// answer is reduced against the vocabulary's hierarchy.
    ///
    /// # Errors
    ///
    /// Returns the oracle's error unchanged; the reducer never sees a failed
    /// result.
    pub fn label(
        &self,
        text: &str,
        vocabulary: &Vocabulary,
        max_terms: usize,
    ) -> Result<LabelOutcome, OracleError> {
        let suggested = self
            .oracle
            .suggest(text, &vocabulary.distinct_terms(), max_terms)?;

        let index = InverseIndex::from(vocabulary.hierarchy());
        let labels = index.reduce(&suggested.iter().cloned().collect());

        info!(
            suggested = suggested.len(),
            labels = labels.len(),
            "labeled text"
        );
        if labels.is_empty() {
            warn!("oracle found no applicable terms");
        }

        Ok(LabelOutcome { suggested, labels })
    }

    /// Loads the vocabulary at `path` through `cache`, then labels `text`.
    ///
    /// # Errors
    ///
    /// - [`LabelError::Vocabulary`] if the source fails to load
    /// - [`LabelError::EmptyVocabulary`] if it holds no terms; the oracle is not called
    /// - [`LabelError::Oracle`] if the oracle fails
    pub fn label_source(
        &self,
        cache: &mut VocabularyCache,
        path: impl AsRef<Path>,
        text: &str,
        max_terms: usize,
    ) -> Result<LabelOutcome, LabelError> {
        let path = path.as_ref();
        let vocabulary = cache.get_or_load(path)?;

        if vocabulary.terms().is_empty() {
            return Err(LabelError::EmptyVocabulary {
                path: path.to_path_buf(),
            });
        }

        Ok(self.label(text, &vocabulary, max_terms)?)
    }
}
