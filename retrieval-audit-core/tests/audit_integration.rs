//! End-to-end audit tests: session lifecycle, request replay, configuration.

use pretty_assertions::assert_eq;
use retrieval_audit_core::{
    Aspect, AuditConfig, AuditError, AuditRequest, AuditSession, ChunkRole, Coverage,
    CoverageAnalyzer, IndexOutcome, IntegrityScorer, LocalEmbedder, NoiseClassifier,
    SimilarityMatrix, VectorIndex, detect_missing, load_config,
};
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

const FINANCE_DOC: &str = "\
Beta refers to the sensitivity of a stock's returns to movements of the overall market. \
A beta above one indicates a stock that amplifies market swings, while a beta below one dampens them. \
The efficient market hypothesis is defined as the claim that asset prices fully reflect all available information. \
Under the weak form of the hypothesis, past prices cannot be used to earn excess returns. \
Dividend yield measures the annual dividend paid by a company relative to its share price. \
Companies with stable cash flows often maintain a consistent dividend policy across business cycles.";

#[test]
fn test_session_audit_with_local_embedder() {
    let embedder = LocalEmbedder::new(1024);
    let mut session = AuditSession::new(AuditConfig::default()).unwrap();
    let outcome = session.index_document(FINANCE_DOC, &embedder).unwrap();
    let IndexOutcome::Rebuilt { chunk_count } = outcome else {
        panic!("expected a fresh index, got {outcome:?}");
    };
    assert!(chunk_count >= 3);

    let aspects = vec![
        Aspect::new("A1", "market beta sensitivity of stock returns"),
        Aspect::new("A2", "photosynthesis chlorophyll"),
    ];
    let report = session
        .audit_with_embedder("What is beta and how does photosynthesis work?", &aspects, &embedder)
        .unwrap();

    assert!(!report.retrieved.is_empty());
    assert!(report.retrieved.len() <= 5);
    assert_eq!(report.similarity.shape(), (2, report.retrieved.len()));
    assert_eq!(report.coverage.len(), 2);
    assert_eq!(report.noise.len(), report.retrieved.len());
    assert_eq!(report.coverage[1].coverage, Coverage::Missing);
    assert_eq!(report.missing.len(), detect_missing(&report.coverage).len());
    assert!(report.missing.iter().any(|m| m.aspect_id == "A2"));
    assert!(
        report
            .recommendations
            .iter()
            .any(|r| r.contains("Increase retrieval depth"))
    );
    assert!((0.0..=100.0).contains(&report.score.score));
    assert!(
        report
            .retrieved
            .windows(2)
            .all(|w| w[0].similarity_score >= w[1].similarity_score)
    );
}

#[test]
fn test_report_json_contract() {
    let mut index = VectorIndex::new();
    index.add("c0", vec![1.0, 0.0], "Alpha refers to excess return.").unwrap();
    index.add("c1", vec![0.0, 1.0], "Unrelated text.").unwrap();
    let mut session = AuditSession::new(AuditConfig::default()).unwrap();
    session.replace_index("manual", index);

    let report = session
        .audit("alpha", &[1.0, 0.0], &[Aspect::new("A1", "alpha")], &[vec![1.0, 0.0]])
        .unwrap();
    let json: serde_json::Value = serde_json::to_value(&report).unwrap();

    for key in ["similarity", "coverage", "noise", "missing", "score", "retrieved"] {
        assert!(json.get(key).is_some(), "missing report key {key}");
    }
    assert_eq!(json["coverage"][0]["coverage"], "supported");
    assert_eq!(json["coverage"][0]["best_chunk_index"], 0);
    assert_eq!(json["noise"][1]["classification"], "noise");
    assert_eq!(json["noise"][1]["chunk_id"], "c1");
    assert!(json["score"].get("noise_penalty").is_some());
    assert!(json["score"].get("missing_penalty").is_some());
    assert_eq!(json["similarity"].as_array().unwrap().len(), 1);
}

#[test]
fn test_mixed_coverage_example() {
    // A1 supported, A2 partial, A3 missing; c1 supports nothing.
    let matrix = SimilarityMatrix::from_rows(vec![
        vec![0.9, 0.1],
        vec![0.45, 0.1],
        vec![0.1, 0.2],
    ])
    .unwrap();
    let aspects = vec![
        Aspect::new("A1", "one"),
        Aspect::new("A2", "two"),
        Aspect::new("A3", "three"),
    ];
    let texts = ["plain chunk", "another plain chunk"];

    let config = AuditConfig::default();
    let coverage = CoverageAnalyzer::new(config.coverage.clone())
        .unwrap()
        .analyze(&aspects, &matrix, &texts)
        .unwrap();
    let noise = NoiseClassifier::new(config.noise.clone())
        .unwrap()
        .classify(&["c0", "c1"], &matrix, &aspects)
        .unwrap();
    let missing = detect_missing(&coverage);
    let score = IntegrityScorer::new(config.scoring.clone())
        .unwrap()
        .score(&coverage, &noise, &missing);

    let levels: Vec<Coverage> = coverage.iter().map(|c| c.coverage).collect();
    assert_eq!(
        levels,
        vec![Coverage::Supported, Coverage::Partial, Coverage::Missing]
    );
    assert_eq!(noise[1].classification, ChunkRole::Noise);
    assert_eq!(score.coverage_score_display(), 50.0);
    assert_eq!(score.noise_penalty, 10.0);
    assert_eq!(score.missing_penalty, 15.0);
    assert_eq!(score.score, 25.0);
}

#[test]
fn test_all_supported_scores_100() {
    let mut index = VectorIndex::new();
    index.add("c0", vec![1.0, 0.0, 0.0], "first").unwrap();
    index.add("c1", vec![0.0, 1.0, 0.0], "second").unwrap();
    index.add("c2", vec![0.0, 0.0, 1.0], "third").unwrap();
    let mut session = AuditSession::new(AuditConfig::default()).unwrap();
    session.replace_index("manual", index);

    let aspects = vec![
        Aspect::new("A1", "first"),
        Aspect::new("A2", "second"),
        Aspect::new("A3", "third"),
    ];
    let embeddings = vec![
        vec![1.0, 0.0, 0.0],
        vec![0.0, 1.0, 0.0],
        vec![0.0, 0.0, 1.0],
    ];
    let report = session
        .audit("everything", &[1.0, 1.0, 1.0], &aspects, &embeddings)
        .unwrap();
    assert_eq!(report.score.score, 100.0);
    assert!(report.missing.is_empty());
    assert_eq!(
        report.recommendations,
        vec!["Retrieval quality is sufficient.".to_string()]
    );
}

#[test]
fn test_request_replay_from_file() {
    let request = serde_json::json!({
        "query": "beta",
        "query_embedding": [1.0, 0.0],
        "aspects": [
            {"aspect_id": "A1", "aspect_text": "beta", "embedding": [1.0, 0.0]}
        ],
        "chunks": [
            {"chunk_id": "c0", "text": "Beta is a risk measure.", "embedding": [0.9, 0.1]},
            {"chunk_id": "c1", "text": "Gardening tips.", "embedding": [0.0, 1.0]}
        ]
    });
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{request}").unwrap();

    let request = AuditRequest::from_path(file.path()).unwrap();
    let report = request.run(&AuditConfig::default()).unwrap();
    assert_eq!(report.retrieved[0].chunk_id, "c0");
    assert_eq!(report.coverage[0].coverage, Coverage::Supported);
    assert_eq!(report.noise[1].classification, ChunkRole::Noise);
}

#[test]
fn test_request_with_bad_json_is_serialization_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{{not json").unwrap();
    assert!(matches!(
        AuditRequest::from_path(file.path()),
        Err(AuditError::Serialization(_))
    ));
}

#[test]
fn test_request_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        AuditRequest::from_path(&dir.path().join("absent.json")),
        Err(AuditError::Io(_))
    ));
}

#[test]
fn test_load_config_layers_workspace_and_explicit_file() {
    let workspace = TempDir::new().unwrap();
    let config_dir = workspace.path().join(".retrieval-audit");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.toml"),
        "[retrieval]\ntop_k = 8\n\n[noise]\npartial_threshold = 0.3\n",
    )
    .unwrap();

    let explicit = workspace.path().join("override.toml");
    std::fs::write(&explicit, "[retrieval]\ntop_k = 3\n").unwrap();

    let config = load_config(Some(workspace.path()), None).unwrap();
    assert_eq!(config.retrieval.top_k, 8);
    assert_eq!(config.noise.partial_threshold, 0.3);
    assert_eq!(config.coverage.support_threshold, 0.6);

    let config = load_config(Some(workspace.path()), Some(explicit.as_path())).unwrap();
    assert_eq!(config.retrieval.top_k, 3);
    assert_eq!(config.noise.partial_threshold, 0.3);
    assert!(config.validate().is_ok());
}

#[test]
fn test_invalid_loaded_config_fails_validation() {
    let workspace = TempDir::new().unwrap();
    let explicit = workspace.path().join("bad.toml");
    std::fs::write(&explicit, "[coverage]\nsupport_threshold = 1.5\n").unwrap();
    let config = load_config(None, Some(explicit.as_path())).unwrap();
    assert!(matches!(
        AuditSession::new(config),
        Err(AuditError::Configuration(_))
    ));
}
