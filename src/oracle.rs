//! Term suggestion oracles.
//!
//! An oracle reads a text and proposes terms from a controlled vocabulary.
//! The [`TermOracle`] trait is the only thing the labeling pipeline depends
//! on, so any classifier (a prompted LLM, a keyword matcher, a test double)
//! can be plugged in.
//!
//! # Examples
//!
//! ```
//! use taxo::oracle::{OracleError, TermOracle};
//!
//! /// Suggests every vocabulary term mentioned verbatim in the text.
//! struct Substring;
//!
//! impl TermOracle for Substring {
//!     fn suggest(
//!         &self,
//!         text: &str,
//!         vocabulary: &[String],
//!         max_terms: usize,
//!     ) -> Result<Vec<String>, OracleError> {
//!         Ok(vocabulary
//!             .iter()
//!             .filter(|term| text.contains(term.as_str()))
//!             .take(max_terms)
//!             .cloned()
//!             .collect())
//!     }
//! }
//!
//! let vocabulary = vec!["Saúde".to_string(), "Educação".to_string()];
//! let terms = Substring.suggest("Política de Saúde", &vocabulary, 5).unwrap();
//! assert_eq!(terms, vec!["Saúde"]);
//! ```

mod prompted;

use thiserror::Error;

use crate::llm::LlmError;

pub use prompted::{LlmTermOracle, LlmTermOracleBuilder};

/// Errors an oracle reports instead of a term list.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The model endpoint could not be reached or rejected the request.
    #[error("Oracle request failed: {0}")]
    Transport(#[from] LlmError),

    /// The oracle answered, but no term list could be extracted.
    #[error("Oracle returned an unusable response: {reason}")]
    MalformedResponse { reason: String },

    /// The request could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),
}

/// Proposes vocabulary terms describing a text.
///
/// Implementations must only return terms drawn from `vocabulary`, at most
/// `max_terms` of them, and must report any transport or parse failure as an
/// [`OracleError`] rather than a partial list. An empty list is a valid
/// answer meaning no term applies.
pub trait TermOracle: Send + Sync {
    fn suggest(
        &self,
        text: &str,
        vocabulary: &[String],
        max_terms: usize,
    ) -> Result<Vec<String>, OracleError>;
}
