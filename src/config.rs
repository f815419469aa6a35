//! Runtime configuration resolved from the environment.
//!
//! Load order: `.env` in the working directory (if any) → process
//! environment → defaults. Command-line flags override the result.

use std::path::PathBuf;

use thiserror::Error;

/// Environment variable naming the vocabulary source.
pub const VOCABULARY_ENV: &str = "TAXO_VOCABULARY";
/// Environment variable for the default number of terms to request.
pub const MAX_TERMS_ENV: &str = "TAXO_MAX_TERMS";

pub const DEFAULT_MAX_TERMS: usize = 5;
/// Inclusive bounds accepted for the number of requested terms.
pub const MAX_TERMS_RANGE: std::ops::RangeInclusive<usize> = 1..=10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("TAXO_MAX_TERMS must be a whole number between 1 and 10, got {value:?}")]
    InvalidMaxTerms { value: String },
}

/// Settings shared by every command.
///
/// `TAXO_MAX_TERMS` is kept as given and only validated by
/// [`Config::max_terms`], so commands that never ask for it are not blocked
/// by a bad value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub vocabulary_path: PathBuf,
    max_terms: Option<String>,
}

impl Config {
    /// Reads configuration from `.env` and the process environment.
    ///
    /// Model endpoint settings (`OLLAMA_HOST`, `OLLAMA_MODEL`) are resolved
    /// by [`crate::llm::OllamaClientBuilder`] and are not part of this struct.
    pub fn from_env() -> Self {
        // A missing .env file is the common case.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let vocabulary_path = lookup(VOCABULARY_ENV)
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_vocabulary_path);

        Self {
            vocabulary_path,
            max_terms: lookup(MAX_TERMS_ENV),
        }
    }

    /// Overrides the vocabulary source, as the `--vocabulary` flag does.
    pub fn with_vocabulary_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.vocabulary_path = path.into();
        self
    }

    /// Number of terms to request when the command line does not say.
    pub fn max_terms(&self) -> Result<usize, ConfigError> {
        match &self.max_terms {
            Some(value) => parse_max_terms(value),
            None => Ok(DEFAULT_MAX_TERMS),
        }
    }
}

/// Parses a requested term count, enforcing [`MAX_TERMS_RANGE`].
pub fn parse_max_terms(value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|n| MAX_TERMS_RANGE.contains(n))
        .ok_or_else(|| ConfigError::InvalidMaxTerms {
            value: value.to_string(),
        })
}

/// Gets the default vocabulary location.
///
/// Returns `{data_dir}/taxo/vocabulary.txt` where `data_dir` is:
/// - Linux: `~/.local/share`
/// - macOS: `~/Library/Application Support`
/// - Windows: `C:\Users\<user>\AppData\Roaming`
///
/// Falls back to `vocabulary.txt` in the working directory when the platform
/// has no data directory.
pub fn default_vocabulary_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("taxo").join("vocabulary.txt"))
        .unwrap_or_else(|| PathBuf::from("vocabulary.txt"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = Config::from_lookup(lookup_from(&[]));
        assert_eq!(config.max_terms(), Ok(DEFAULT_MAX_TERMS));
        assert_eq!(config.vocabulary_path, default_vocabulary_path());
    }

    #[test]
    fn default_vocabulary_path_ends_with_file_name() {
        let path = default_vocabulary_path();
        assert!(path.ends_with("vocabulary.txt"));
    }

    #[test]
    fn environment_values_are_used() {
        let config = Config::from_lookup(lookup_from(&[
            (VOCABULARY_ENV, "/srv/dicionario_termos.txt"),
            (MAX_TERMS_ENV, " 8 "),
        ]));
        assert_eq!(
            config.vocabulary_path,
            PathBuf::from("/srv/dicionario_termos.txt")
        );
        assert_eq!(config.max_terms(), Ok(8));
    }

    #[test]
    fn blank_vocabulary_variable_falls_back_to_default() {
        let config = Config::from_lookup(lookup_from(&[(VOCABULARY_ENV, "  ")]));
        assert_eq!(config.vocabulary_path, default_vocabulary_path());
    }

    #[test]
    fn vocabulary_override_replaces_environment_value() {
        let config = Config::from_lookup(lookup_from(&[(VOCABULARY_ENV, "/srv/a.txt")]))
            .with_vocabulary_path("/tmp/b.txt");
        assert_eq!(config.vocabulary_path, PathBuf::from("/tmp/b.txt"));
    }

    #[test]
    fn max_terms_outside_range_is_rejected() {
        for value in ["0", "11", "-1", "five", ""] {
            let config = Config::from_lookup(lookup_from(&[(MAX_TERMS_ENV, value)]));
            assert_eq!(
                config.max_terms(),
                Err(ConfigError::InvalidMaxTerms {
                    value: value.to_string()
                })
            );
        }
    }

    #[test]
    fn invalid_max_terms_does_not_block_vocabulary_resolution() {
        let config = Config::from_lookup(lookup_from(&[
            (VOCABULARY_ENV, "/srv/dicionario_termos.txt"),
            (MAX_TERMS_ENV, "abc"),
        ]));
        assert_eq!(
            config.vocabulary_path,
            PathBuf::from("/srv/dicionario_termos.txt")
        );
        assert!(config.max_terms().is_err());
    }

    #[test]
    fn max_terms_bounds_are_inclusive() {
        assert_eq!(parse_max_terms("1"), Ok(1));
        assert_eq!(parse_max_terms("10"), Ok(10));
    }
}
