pub mod config;
pub mod labeler;
pub mod llm;
pub mod logging;
pub mod oracle;
pub mod reducer;
pub mod vocabulary;

pub use config::Config;
pub use labeler::{LabelError, LabelOutcome, Labeler};
pub use llm::{LlmClient, LlmError, OllamaClient, OllamaClientBuilder};
pub use oracle::{LlmTermOracle, OracleError, TermOracle};
pub use reducer::{InverseIndex, SuggestionSet, reduce};
pub use vocabulary::{HierarchyMap, LoadError, Vocabulary, VocabularyCache, load};
