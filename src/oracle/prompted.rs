//! Term oracle backed by a prompted language model.
//!
//! The model is shown the text and the controlled vocabulary and asked for a
//! JSON array of terms. Whatever it answers is then constrained back to the
//! vocabulary before being handed to the caller.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::llm::LlmClient;

use super::{OracleError, TermOracle};

/// Prompt template for vocabulary-constrained term selection.
///
/// Placeholders: `{max_terms}`, `{vocabulary}` (JSON array), `{text}`.
const PROMPT_TEMPLATE: &str = r#"You are an indexing assistant for a controlled vocabulary. Select the terms that best describe the subject of the text below. Return ONLY a JSON array of strings. Do not include any explanatory text.

INSTRUCTIONS:
1. Choose at most {max_terms} terms
2. Copy every term exactly as written in the vocabulary, including accents and capitalization
3. Never invent terms that are not in the vocabulary
4. Prefer the most specific terms that apply; focus on what the text is ABOUT, not things merely mentioned in passing
5. If no term applies, return []

EXAMPLE:

Vocabulary: ["Saúde", "Doença", "Diabetes", "Recursos Hídricos"]
Text: "Esta lei trata do tratamento de doenças crônicas, como o diabetes."
Output: ["Diabetes", "Doença"]

VOCABULARY:
{vocabulary}

TEXT:
{text}

JSON OUTPUT:"#;

/// Builder for constructing `LlmTermOracle` instances.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use taxo::llm::OllamaClientBuilder;
/// use taxo::oracle::{LlmTermOracleBuilder, TermOracle};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = OllamaClientBuilder::new().build()?;
/// let oracle = LlmTermOracleBuilder::new(Arc::new(client))
///     .model("gemma3:4b")
///     .build();
///
/// let vocabulary = vec!["Saúde".to_string(), "Diabetes".to_string()];
/// let terms = oracle.suggest("Tratamento do diabetes", &vocabulary, 5)?;
/// println!("{terms:?}");
/// # Ok(())
/// # }
/// ```
pub struct LlmTermOracleBuilder {
    client: Arc<dyn LlmClient>,
    model: String,
}

impl LlmTermOracleBuilder {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            model: String::new(),
        }
    }

    /// Sets the model to prompt. When unset, the client's default model is used.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn build(self) -> LlmTermOracle {
        LlmTermOracle {
            client: self.client,
            model: self.model,
        }
    }
}

/// Suggests vocabulary terms for a text by prompting a language model.
pub struct LlmTermOracle {
    client: Arc<dyn LlmClient>,
    model: String,
}

impl LlmTermOracle {
    /// Creates an oracle that prompts the client's default model.
    #[must_use]
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        LlmTermOracleBuilder::new(client).build()
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl TermOracle for LlmTermOracle {
    fn suggest(
        &self,
        text: &str,
        vocabulary: &[String],
        max_terms: usize,
    ) -> Result<Vec<String>, OracleError> {
        if max_terms == 0 {
            return Ok(Vec::new());
        }

        let prompt = build_prompt(text, vocabulary, max_terms)?;
        let response = self.client.generate(&self.model, &prompt)?;
        debug!(response_len = response.len(), "model responded");

        let candidates = parse_term_list(&response)?;
        let terms = constrain_to_vocabulary(candidates, vocabulary, max_terms);

        info!(suggested = terms.len(), "oracle suggested terms");
        Ok(terms)
    }
}

fn build_prompt(text: &str, vocabulary: &[String], max_terms: usize) -> Result<String, OracleError> {
    let vocabulary_json = serde_json::to_string(vocabulary).map_err(OracleError::Serialization)?;
    let max_terms = max_terms.to_string();

    Ok(fill_template(
        PROMPT_TEMPLATE,
        &[
            ("max_terms", max_terms.as_str()),
            ("vocabulary", vocabulary_json.as_str()),
            ("text", text),
        ],
    ))
}

/// Replaces `{name}` placeholders in one left-to-right pass. Substituted
/// values are copied verbatim and never scanned for placeholders.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut filled = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        filled.push_str(&rest[..start]);
        rest = &rest[start..];

        let placeholder = values.iter().find(|(name, _)| {
            rest[1..]
                .strip_prefix(name)
                .is_some_and(|after| after.starts_with('}'))
        });
        match placeholder {
            Some((name, value)) => {
                filled.push_str(value);
                rest = &rest[name.len() + 2..];
            }
            None => {
                filled.push('{');
                rest = &rest[1..];
            }
        }
    }

    filled.push_str(rest);
    filled
}

/// Extracts the JSON array from a model response, tolerating code fences and
/// surrounding chatter.
fn extract_json_list(response: &str) -> Option<&str> {
    let trimmed = response.trim();

    let start = trimmed.find('[')?;
    let end = trimmed.rfind(']')?;

    (start <= end).then(|| &trimmed[start..=end])
}

/// Parses a model response into the raw list of strings it proposes.
///
/// Non-string array items are skipped.
fn parse_term_list(response: &str) -> Result<Vec<String>, OracleError> {
    let Some(json_str) = extract_json_list(response) else {
        return Err(OracleError::MalformedResponse {
            reason: "no JSON array found".to_string(),
        });
    };

    let value: serde_json::Value =
        serde_json::from_str(json_str).map_err(|e| OracleError::MalformedResponse {
            reason: e.to_string(),
        })?;

    let Some(items) = value.as_array() else {
        return Err(OracleError::MalformedResponse {
            reason: "expected a JSON array".to_string(),
        });
    };

    Ok(items
        .iter()
        .filter_map(|item| item.as_str())
        .map(|s| s.trim().to_string())
        .collect())
}

/// Keeps the candidates that are exact vocabulary members, first occurrence
/// only, up to `max_terms`.
fn constrain_to_vocabulary(
    candidates: Vec<String>,
    vocabulary: &[String],
    max_terms: usize,
) -> Vec<String> {
    let allowed: HashSet<&str> = vocabulary.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    let mut terms = Vec::new();

    for candidate in candidates {
        if !allowed.contains(candidate.as_str()) {
            warn!(term = %candidate, "discarding suggestion outside the vocabulary");
            continue;
        }
        if !seen.insert(candidate.clone()) {
            continue;
        }
        terms.push(candidate);
        if terms.len() == max_terms {
            break;
        }
    }

    terms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use std::sync::Mutex;

    struct MockClient {
        response: Result<String, u16>,
        prompts: Mutex<Vec<(String, String)>>,
    }

    impl MockClient {
        fn answering(response: &str) -> Self {
            Self {
                response: Ok(response.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                response: Err(status),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl LlmClient for MockClient {
        fn generate(&self, model: &str, prompt: &str) -> Result<String, LlmError> {
            self.prompts
                .lock()
                .unwrap()
                .push((model.to_string(), prompt.to_string()));
            self.response
                .clone()
                .map_err(|status| LlmError::Http { status })
        }
    }

    fn vocabulary() -> Vec<String> {
        ["Saúde", "Doença", "Diabetes", "Recursos Hídricos"]
            .map(String::from)
            .to_vec()
    }

    #[test]
    fn prompt_includes_text_vocabulary_and_limit() {
        let prompt = build_prompt("Tratamento do diabetes", &vocabulary(), 3).unwrap();
        assert!(prompt.contains("Tratamento do diabetes"));
        assert!(prompt.contains(r#"["Saúde","Doença","Diabetes","Recursos Hídricos"]"#));
        assert!(prompt.contains("at most 3 terms"));
        assert!(!prompt.contains("{text}"));
    }

    #[test]
    fn text_containing_placeholders_is_not_expanded() {
        let prompt = build_prompt("literal {vocabulary}", &vocabulary(), 3).unwrap();
        assert!(prompt.contains("literal {vocabulary}"));
    }

    #[test]
    fn vocabulary_terms_spelled_like_placeholders_stay_literal() {
        let vocabulary = vec!["{text}".to_string(), "Saúde".to_string()];
        let prompt = build_prompt("SECRET USER TEXT", &vocabulary, 3).unwrap();

        assert_eq!(prompt.matches("SECRET USER TEXT").count(), 1);
        assert!(prompt.contains(r#"["{text}","Saúde"]"#));
    }

    #[test]
    fn unknown_braces_in_template_are_kept() {
        let filled = fill_template("{a} {b} {", &[("a", "1")]);
        assert_eq!(filled, "1 {b} {");
    }

    #[test]
    fn extracts_clean_array() {
        assert_eq!(extract_json_list(r#"["Saúde"]"#), Some(r#"["Saúde"]"#));
    }

    #[test]
    fn extracts_array_from_code_fence_and_chatter() {
        let response = "Here are the terms:\n```json\n[\"Saúde\", \"Diabetes\"]\n```\nHope it helps!";
        assert_eq!(
            extract_json_list(response),
            Some(r#"["Saúde", "Diabetes"]"#)
        );
    }

    #[test]
    fn extraction_fails_without_brackets() {
        assert_eq!(extract_json_list("Saúde, Diabetes"), None);
        assert_eq!(extract_json_list("] backwards ["), None);
    }

    #[test]
    fn parse_rejects_malformed_json() {
        let err = parse_term_list(r#"["Saúde", ]"#).unwrap_err();
        assert!(matches!(err, OracleError::MalformedResponse { .. }));
    }

    #[test]
    fn parse_skips_non_string_items_and_trims() {
        let terms = parse_term_list(r#"[" Saúde ", 3, null, "Diabetes"]"#).unwrap();
        assert_eq!(terms, vec!["Saúde", "Diabetes"]);
    }

    #[test]
    fn constrain_drops_unknown_and_duplicate_terms() {
        let candidates = ["Diabetes", "Cardiologia", "Diabetes", "saúde", "Saúde"]
            .map(String::from)
            .to_vec();
        let terms = constrain_to_vocabulary(candidates, &vocabulary(), 5);
        assert_eq!(terms, vec!["Diabetes", "Saúde"]);
    }

    #[test]
    fn constrain_truncates_to_limit() {
        let candidates = vocabulary();
        let terms = constrain_to_vocabulary(candidates, &vocabulary(), 2);
        assert_eq!(terms, vec!["Saúde", "Doença"]);
    }

    #[test]
    fn suggest_returns_constrained_terms() {
        let client = Arc::new(MockClient::answering(
            "```json\n[\"Saúde\", \"Doença\", \"Diabetes\", \"Obesidade\"]\n```",
        ));
        let oracle = LlmTermOracleBuilder::new(client.clone())
            .model("test-model")
            .build();

        let terms = oracle.suggest("diabetes", &vocabulary(), 5).unwrap();
        assert_eq!(terms, vec!["Saúde", "Doença", "Diabetes"]);

        let prompts = client.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].0, "test-model");
    }

    #[test]
    fn empty_array_is_a_valid_empty_answer() {
        let oracle = LlmTermOracle::new(Arc::new(MockClient::answering("[]")));
        assert!(oracle.suggest("nada", &vocabulary(), 5).unwrap().is_empty());
    }

    #[test]
    fn zero_limit_skips_the_model() {
        let client = Arc::new(MockClient::answering(r#"["Saúde"]"#));
        let oracle = LlmTermOracle::new(client.clone());

        assert!(oracle.suggest("saúde", &vocabulary(), 0).unwrap().is_empty());
        assert!(client.prompts.lock().unwrap().is_empty());
    }

    #[test]
    fn unparseable_answer_is_a_failure() {
        let oracle = LlmTermOracle::new(Arc::new(MockClient::answering("I cannot help.")));
        let err = oracle.suggest("texto", &vocabulary(), 5).unwrap_err();
        assert!(matches!(err, OracleError::MalformedResponse { .. }));
    }

    #[test]
    fn transport_failure_is_propagated() {
        let oracle = LlmTermOracle::new(Arc::new(MockClient::failing(401)));
        let err = oracle.suggest("texto", &vocabulary(), 5).unwrap_err();
        assert!(matches!(
            err,
            OracleError::Transport(LlmError::Http { status: 401 })
        ));
    }
}
