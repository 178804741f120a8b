//! CLI subcommand handlers.

use anyhow::{Context, bail};
use retrieval_audit_core::{
    Aspect, AspectExtractor, AuditConfig, AuditReport, AuditRequest, AuditSession,
    LineAspectExtractor, LocalEmbedder, load_config, parse_aspects,
};
use std::io::Write;
use std::path::Path;

use crate::Commands;
use crate::ConfigAction;

/// Characters of chunk text shown per line in the text report.
const PREVIEW_CHARS: usize = 72;

/// Handle a CLI subcommand, writing its output to `out`.
pub fn handle_command(
    command: Commands,
    workspace: &Path,
    explicit_config: Option<&Path>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match command {
        Commands::Audit {
            document,
            query,
            aspects,
            top_k,
            json,
        } => {
            let mut config = resolve_config(workspace, explicit_config)?;
            if let Some(top_k) = top_k {
                config.retrieval.top_k = top_k;
            }
            let report = handle_audit(&document, &query, &aspects, config)?;
            render(&report, json, out)
        }
        Commands::Replay { request, json } => {
            let config = resolve_config(workspace, explicit_config)?;
            let request = AuditRequest::from_path(&request)
                .with_context(|| format!("Failed to read request {}", request.display()))?;
            let report = request.run(&config)?;
            render(&report, json, out)
        }
        Commands::Config { action } => handle_config(action, workspace, explicit_config, out),
    }
}

fn resolve_config(workspace: &Path, explicit: Option<&Path>) -> anyhow::Result<AuditConfig> {
    load_config(Some(workspace), explicit)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))
}

fn handle_audit(
    document: &Path,
    query: &str,
    aspect_flags: &[String],
    config: AuditConfig,
) -> anyhow::Result<AuditReport> {
    let text = std::fs::read_to_string(document)
        .with_context(|| format!("Failed to read document {}", document.display()))?;

    let aspects: Vec<Aspect> = if aspect_flags.is_empty() {
        let extractor = LineAspectExtractor::new(config.aspects.clone());
        tracing::debug!(extractor = extractor.name(), "Extracting aspects from query");
        extractor.extract(query)?
    } else {
        parse_aspects(&aspect_flags.join("\n"), &config.aspects)
    };
    if aspects.is_empty() {
        bail!(
            "No usable aspects: give --aspect values of at least {} characters",
            config.aspects.min_aspect_chars
        );
    }

    let embedder = LocalEmbedder::new(config.embedding.dimensions);
    let mut session = AuditSession::new(config)?;
    let outcome = session.index_document(&text, &embedder)?;
    tracing::info!(document = %document.display(), ?outcome, "Document ready");

    Ok(session.audit_with_embedder(query, &aspects, &embedder)?)
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    explicit: Option<&Path>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_dir = workspace.join(".retrieval-audit");
            std::fs::create_dir_all(&config_dir)?;

            let config_path = config_dir.join("config.toml");
            if config_path.exists() {
                writeln!(
                    out,
                    "Configuration file already exists at: {}",
                    config_path.display()
                )?;
                return Ok(());
            }

            let toml_str = toml::to_string_pretty(&AuditConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            writeln!(
                out,
                "Created default configuration at: {}",
                config_path.display()
            )?;
            Ok(())
        }
        ConfigAction::Show => {
            let config = resolve_config(workspace, explicit)?;
            config.validate()?;
            let toml_str = toml::to_string_pretty(&config)?;
            writeln!(out, "{}", toml_str)?;
            Ok(())
        }
    }
}

fn render(report: &AuditReport, json: bool, out: &mut impl Write) -> anyhow::Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, report)?;
        writeln!(out)?;
        return Ok(());
    }
    render_text(report, out)
}

fn render_text(report: &AuditReport, out: &mut impl Write) -> anyhow::Result<()> {
    let score = &report.score;
    writeln!(out, "Query: {}", report.query)?;
    writeln!(out, "Integrity score: {:.1} / 100", score.score)?;
    writeln!(
        out,
        "  coverage {:.2}   noise penalty -{:.1}   missing penalty -{:.1}",
        score.coverage_score_display(),
        score.noise_penalty,
        score.missing_penalty
    )?;

    writeln!(out, "\nAspect coverage")?;
    for result in &report.coverage {
        writeln!(
            out,
            "  {:<4} {:<10} {:.3}  {}",
            result.aspect_id, result.coverage, result.best_similarity, result.aspect_text
        )?;
    }

    writeln!(out, "\nRetrieved chunks")?;
    for (hit, noise) in report.retrieved.iter().zip(&report.noise) {
        writeln!(
            out,
            "  {:<10} {:<10} {:.3}  {}",
            hit.chunk_id,
            noise.classification,
            noise.max_similarity,
            preview(&hit.text)
        )?;
    }

    writeln!(out, "\nExplanations")?;
    for line in &report.explanations {
        writeln!(out, "  - {}", line)?;
    }
    writeln!(out, "\nRecommendations")?;
    for line in &report.recommendations {
        writeln!(out, "  - {}", line)?;
    }
    Ok(())
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
    format!("{cut}...")
}
