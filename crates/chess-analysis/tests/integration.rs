//! Integration tests against a real engine.
//!
//! These tests require Stockfish to be installed and available in PATH.
//! Run with: `cargo test -p chess-analysis --test integration -- --ignored`

use chess_analysis::{
    AnalysisConfig, EngineSettings, EvaluationOracle, GameAnalyzer, GameOutcome, LocalEngine,
    MoveQuality, RulesOracle, ShakmatyRules, Side,
};

/// Check if Stockfish is available in PATH.
fn stockfish_available() -> bool {
    std::process::Command::new("stockfish")
        .arg("--version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok()
}

fn settings() -> EngineSettings {
    EngineSettings {
        depth: 10,
        ..EngineSettings::default()
    }
}

#[tokio::test]
#[ignore = "requires Stockfish"]
async fn test_engine_basic_analysis() {
    if !stockfish_available() {
        eprintln!("Skipping test: Stockfish not available");
        return;
    }

    let engine = LocalEngine::spawn("stockfish", settings())
        .await
        .expect("Failed to start Stockfish");

    let name = engine.name();
    assert!(
        name.to_lowercase().contains("stockfish"),
        "Engine name should contain 'Stockfish', got: {}",
        name
    );

    let rules = ShakmatyRules::new();
    let result = engine.evaluate(&rules.initial_position()).await;
    assert!(result.source_ok, "Starting position should evaluate");
    assert!(result.best_move.is_some(), "Best move should be reported");

    let lines = engine.evaluate_top(&rules.initial_position(), 3).await;
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines.iter().map(|l| l.rank).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(lines.iter().all(|l| !l.moves.is_empty() && l.moves.len() <= 4));
}

#[tokio::test]
#[ignore = "requires Stockfish"]
async fn test_scholars_mate_game_analysis() {
    if !stockfish_available() {
        eprintln!("Skipping test: Stockfish not available");
        return;
    }

    // Scholar's mate: 1.e4 e5 2.Qh5 Nc6 3.Bc4 Nf6?? 4.Qxf7#
    let moves = ["e4", "e5", "Qh5", "Nc6", "Bc4", "Nf6", "Qxf7#"];

    let engine = LocalEngine::spawn("stockfish", settings())
        .await
        .expect("Failed to start Stockfish");
    let rules = ShakmatyRules::new();
    let analyzer = GameAnalyzer::new(&engine, &rules, AnalysisConfig::default());

    let report = analyzer.analyze(&moves).await;

    assert!(report.is_complete());
    assert_eq!(report.records.len(), moves.len());
    assert_eq!(report.degraded_count(), 0);
    assert_eq!(report.outcome, GameOutcome::Checkmate { winner: Side::White });

    // Nf6?? allows mate in one.
    let nf6 = &report.records[5];
    assert_eq!(nf6.quality, MoveQuality::Blunder);
    assert!(nf6.annotation.is_some());
    assert!(report.key_moments.iter().any(|r| r.index == 5));

    // Qxf7# is the engine's own choice.
    assert_eq!(report.records[6].quality, MoveQuality::Brilliant);
    assert!(report.records[6].evaluation_after > 90_000);

    engine.shutdown();
}

#[tokio::test]
#[ignore = "requires Stockfish"]
async fn test_mated_position_is_scored() {
    if !stockfish_available() {
        eprintln!("Skipping test: Stockfish not available");
        return;
    }

    let engine = LocalEngine::spawn("stockfish", settings())
        .await
        .expect("Failed to start Stockfish");
    let rules = ShakmatyRules::new();
    let mated = rules
        .position_from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3")
        .unwrap();

    let result = engine.evaluate(&mated).await;
    assert!(result.source_ok);
    assert!(result.best_move.is_none());
    assert!(result.evaluation.to_centipawns() < -90_000);
}
