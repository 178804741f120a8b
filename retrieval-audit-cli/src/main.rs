//! retrieval-audit: audit what a retriever hands to a RAG generator.
//!
//! Indexes a document with the offline embedder, or replays a request that
//! carries precomputed embeddings, and prints the coverage, noise and
//! integrity score of the retrieved chunks.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Retrieval integrity auditor for RAG pipelines
#[derive(Parser, Debug)]
#[command(name = "retrieval-audit", version, about, long_about = None)]
struct Cli {
    /// Workspace directory
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Index a document and audit one query against it
    Audit {
        /// Plain-text document to index
        #[arg(short, long)]
        document: PathBuf,
        /// Query whose retrieval is audited
        #[arg(long)]
        query: String,
        /// Information aspect the query needs (repeatable). Parsed from the
        /// query's lines when omitted.
        #[arg(short, long = "aspect")]
        aspects: Vec<String>,
        /// Number of chunks to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Audit a JSON request carrying precomputed embeddings
    Replay {
        /// Path to the request file
        request: PathBuf,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create a default configuration file in the workspace
    Init,
    /// Show the effective configuration
    Show,
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "retrieval-audit", "retrieval-audit")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "retrieval-audit.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let mut out = std::io::stdout().lock();
    commands::handle_command(cli.command, &workspace, cli.config.as_deref(), &mut out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_audit_with_aspects() {
        let cli = Cli::try_parse_from([
            "retrieval-audit",
            "audit",
            "--document",
            "notes.txt",
            "--query",
            "What is beta?",
            "-a",
            "beta definition",
            "--aspect",
            "beta estimation",
            "-k",
            "8",
            "--json",
        ])
        .unwrap();

        match cli.command {
            Commands::Audit {
                document,
                query,
                aspects,
                top_k,
                json,
            } => {
                assert_eq!(document, PathBuf::from("notes.txt"));
                assert_eq!(query, "What is beta?");
                assert_eq!(aspects, vec!["beta definition", "beta estimation"]);
                assert_eq!(top_k, Some(8));
                assert!(json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "retrieval-audit",
            "replay",
            "request.json",
            "-vv",
            "--config",
            "custom.toml",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(cli.command, Commands::Replay { json: false, .. }));
    }

    #[test]
    fn test_config_show_parses() {
        let cli = Cli::try_parse_from(["retrieval-audit", "config", "show"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Show
            }
        ));
        assert_eq!(cli.workspace, PathBuf::from("."));
    }

    #[test]
    fn test_audit_requires_document() {
        assert!(Cli::try_parse_from(["retrieval-audit", "audit", "--query", "q"]).is_err());
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["retrieval-audit"]).is_err());
    }
}
