use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use taxo::config::{self, Config};
use taxo::labeler::{LabelError, LabelOutcome, Labeler};
use taxo::llm::OllamaClientBuilder;
use taxo::oracle::LlmTermOracleBuilder;
use taxo::reducer::{SuggestionSet, reduce};
use taxo::vocabulary::{self, LoadError, Vocabulary, VocabularyCache};

/// taxo - label texts with a controlled vocabulary
#[derive(Parser)]
#[command(name = "taxo")]
#[command(about = "Label texts with terms from a hierarchical controlled vocabulary")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Vocabulary file (defaults to $TAXO_VOCABULARY or the data directory)
    #[arg(long, global = true, value_name = "PATH")]
    vocabulary: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Show the loaded terms and hierarchy
    Terms,
    /// Drop parents implied by their children from a list of terms
    Reduce(ReduceCommand),
    /// Ask the language model for terms describing a text, then reduce them
    Suggest(SuggestCommand),
}

#[derive(Parser)]
struct ReduceCommand {
    /// Terms to reduce, one per argument (terms may contain commas)
    #[arg(value_name = "TERM", num_args = 1.., required = true)]
    terms: Vec<String>,
}

#[derive(Parser)]
struct SuggestCommand {
    /// The text to label
    #[arg(value_name = "TEXT")]
    text: String,

    /// Maximum number of terms to request (1-10)
    #[arg(short = 'n', long, value_parser = parse_max_terms_arg)]
    max_terms: Option<usize>,

    /// Model name (defaults to $OLLAMA_MODEL)
    #[arg(short, long)]
    model: Option<String>,
}

/// Invalid command-line input that clap cannot catch on its own.
#[derive(Debug, thiserror::Error)]
enum InputError {
    #[error("Text cannot be empty")]
    EmptyText,
    #[error("Term list cannot be empty")]
    EmptyTerms,
}

fn main() {
    let cli = Cli::parse();
    taxo::logging::init_cli_logger(cli.verbose);

    let result = run(&cli);

    if let Err(e) = result {
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = Config::from_env();
    if let Some(path) = &cli.vocabulary {
        config = config.with_vocabulary_path(path);
    }

    match &cli.command {
        Commands::Terms => handle_terms(&config.vocabulary_path, cli.json),
        Commands::Reduce(cmd) => handle_reduce(cmd, &config.vocabulary_path, cli.json),
        Commands::Suggest(cmd) => handle_suggest(cmd, &config, cli.json),
    }
}

/// Determines if an error is a user error (vs internal error).
///
/// User errors are invalid input or configuration and vocabulary problems.
/// Internal errors include model transport failures.
fn is_user_error(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        cause.is::<InputError>()
            || cause.is::<LoadError>()
            || cause.is::<config::ConfigError>()
            || matches!(
                cause.downcast_ref::<LabelError>(),
                Some(LabelError::Vocabulary(_) | LabelError::EmptyVocabulary { .. })
            )
    })
}

fn parse_max_terms_arg(value: &str) -> Result<usize, String> {
    config::parse_max_terms(value).map_err(|_| "must be a whole number between 1 and 10".to_string())
}

fn load_vocabulary(path: &Path) -> Result<Vocabulary> {
    let vocabulary = vocabulary::load(path)?;
    if vocabulary.terms().is_empty() {
        tracing::warn!(path = %path.display(), "vocabulary contains no terms");
    }
    Ok(vocabulary)
}

#[derive(Serialize)]
struct TermsReport<'a> {
    count: usize,
    #[serde(flatten)]
    vocabulary: &'a Vocabulary,
}

/// Prints the vocabulary: term count, the term list and the hierarchy map.
fn handle_terms(path: &Path, json: bool) -> Result<()> {
    let vocabulary = load_vocabulary(path)?;

    if json {
        let report = TermsReport {
            count: vocabulary.terms().len(),
            vocabulary: &vocabulary,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Vocabulary loaded with {} terms.", vocabulary.terms().len());
    println!();
    println!("Terms:");
    for term in vocabulary.terms() {
        println!("  {term}");
    }
    println!();
    println!("Hierarchy:");
    for (parent, children) in vocabulary.hierarchy().iter() {
        println!("  {parent} > {}", children.join(", "));
    }

    Ok(())
}

fn handle_reduce(cmd: &ReduceCommand, path: &Path, json: bool) -> Result<()> {
    let suggested = collect_terms(&cmd.terms);
    if suggested.is_empty() {
        return Err(InputError::EmptyTerms.into());
    }

    let vocabulary = load_vocabulary(path)?;
    let labels = reduce(&suggested, vocabulary.hierarchy());

    if json {
        println!("{}", serde_json::to_string_pretty(&labels)?);
    } else {
        print_terms(&labels);
    }
    Ok(())
}

fn handle_suggest(cmd: &SuggestCommand, config: &Config, json: bool) -> Result<()> {
    if cmd.text.trim().is_empty() {
        return Err(InputError::EmptyText.into());
    }

    let max_terms = match cmd.max_terms {
        Some(max_terms) => max_terms,
        None => config.max_terms().context("Invalid configuration")?,
    };
    let client = OllamaClientBuilder::new()
        .build()
        .context("Failed to create model client")?;
    let model = cmd
        .model
        .clone()
        .unwrap_or_else(|| client.model().to_string());

    let oracle = LlmTermOracleBuilder::new(Arc::new(client)).model(model).build();
    let labeler = Labeler::new(Arc::new(oracle));

    let mut cache = VocabularyCache::new();
    let outcome =
        labeler.label_source(&mut cache, &config.vocabulary_path, &cmd.text, max_terms)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }
    Ok(())
}

fn print_outcome(outcome: &LabelOutcome) {
    println!("Suggested terms: {}", outcome.suggested.join(", "));
    if outcome.has_labels() {
        println!("Final terms:");
        print_terms(&outcome.labels);
    } else {
        println!("No applicable terms found.");
    }
}

fn print_terms(terms: &SuggestionSet) {
    for term in terms {
        println!("  {term}");
    }
}

/// Collects term arguments, trimming whitespace and skipping blank ones.
/// Case, accents and commas are preserved.
fn collect_terms(terms: &[String]) -> SuggestionSet {
    terms
        .iter()
        .map(|term| term.trim())
        .filter(|term| !term.is_empty())
        .map(String::from)
        .collect()
}
