use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use citeqa::{CitationQaPipeline, LlmError, PipelineConfig, QaError, RetrievedDocument};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// citeqa - answer questions from retrieved documents with an LLM
#[derive(Parser)]
#[command(name = "citeqa")]
#[command(about = "Answer a question from retrieved documents, optionally with citations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Answer a question using a JSON file of retrieved documents
    Ask(AskCommand),
}

/// Answer a question
#[derive(Parser)]
struct AskCommand {
    /// The question to answer
    #[arg(short, long, value_name = "QUESTION")]
    question: String,

    /// JSON array of documents (`{"text": ..., "metadata": {...}}`), or `-` for stdin
    #[arg(short, long, value_name = "FILE")]
    documents: PathBuf,

    /// Also extract a citation supporting the answer
    #[arg(long)]
    citation: bool,

    /// TOML config file; the environment is used when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Ask(cmd) => handle_ask(cmd),
    };

    if let Err(e) = result {
        let exit_code = if is_upstream_error(&e) { 2 } else { 1 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Returns true when the failure came from the model backend rather than from
/// the user's input or configuration.
fn is_upstream_error(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<QaError>(),
        Some(QaError::Llm(llm)) if !matches!(llm, LlmError::InvalidUrl(_) | LlmError::Config(_))
    )
}

/// Handles the ask command and prints the answer as JSON.
fn handle_ask(cmd: &AskCommand) -> Result<()> {
    let config = load_config(cmd.config.as_deref())?;
    let documents = read_documents(&cmd.documents)?;

    let pipeline =
        CitationQaPipeline::from_config(&config).context("Failed to create answering pipeline")?;

    let answer = pipeline
        .answer(&cmd.question, &documents, cmd.citation)
        .context("Failed to answer question")?;

    println!("{}", serde_json::to_string_pretty(&answer)?);
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display())),
        None => PipelineConfig::from_env().context("Failed to read configuration from environment"),
    }
}

fn read_documents(path: &Path) -> Result<Vec<RetrievedDocument>> {
    let contents = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read documents from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read documents file: {}", path.display()))?
    };
    parse_documents(&contents)
}

fn parse_documents(contents: &str) -> Result<Vec<RetrievedDocument>> {
    serde_json::from_str(contents)
        .context("Documents must be a JSON array of objects with a \"text\" field")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_documents_keeps_order_and_metadata() {
        let docs = parse_documents(
            r#"[
                {"text": "first", "metadata": {"source": "a"}},
                {"text": "second", "score": 0.4}
            ]"#,
        )
        .unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].text, "first");
        assert_eq!(docs[0].metadata["source"], "a");
        assert_eq!(docs[1].score, 0.4);
    }

    #[test]
    fn parse_documents_accepts_empty_array() {
        assert!(parse_documents("[]").unwrap().is_empty());
    }

    #[test]
    fn parse_documents_rejects_missing_text() {
        let err = parse_documents(r#"[{"metadata": {}}]"#).unwrap_err();
        assert!(err.to_string().contains("JSON array"));
    }

    #[test]
    fn read_documents_reports_missing_file() {
        let err = read_documents(Path::new("/nonexistent/docs.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read documents file"));
    }

    #[test]
    fn load_config_reads_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[llm]\nendpoint = \"https://res.openai.azure.com/\"\ndeployment = \"gpt\""
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.llm.deployment, "gpt");
    }

    #[test]
    fn upstream_errors_are_classified() {
        let upstream = anyhow::Error::new(QaError::Llm(LlmError::Http {
            status: 503,
            message: "unavailable".to_string(),
        }))
        .context("Failed to answer question");
        assert!(is_upstream_error(&upstream));

        let config = anyhow::Error::new(QaError::Llm(LlmError::InvalidUrl("x".to_string())));
        assert!(!is_upstream_error(&config));

        let input = anyhow::anyhow!("Failed to read documents file");
        assert!(!is_upstream_error(&input));
    }
}
