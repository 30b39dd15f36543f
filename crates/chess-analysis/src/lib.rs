//! Move quality analysis of completed chess games.
//!
//! This crate replays a game, evaluates every position through an
//! evaluation oracle, classifies each move by how much it changed the
//! evaluation, and aggregates the result into a report ready for
//! narrative summarization.
//!
//! # Overview
//!
//! - [`Evaluation`] - Position evaluation (centipawn or mate score)
//! - [`EvaluationOracle`] - Source of evaluations; [`CloudEvalClient`] and
//!   [`LocalEngine`] backends, chosen at runtime through [`Oracle`]
//! - [`RulesOracle`] / [`ShakmatyRules`] - Move legality and game state
//! - [`classify_move`] / [`MoveQuality`] - Move classification
//! - [`GameAnalyzer`] - Analyzes complete games into an [`AnalysisReport`]
//! - [`NarrativeGenerator`] - Turns a report into prose
//!
//! # Example
//!
//! ```ignore
//! use chess_analysis::{AnalysisConfig, GameAnalyzer, Oracle, ReviewConfig, ShakmatyRules};
//!
//! let config = ReviewConfig::load()?;
//! let oracle = Oracle::from_config(&config).await?;
//! let rules = ShakmatyRules::new();
//! let analyzer = GameAnalyzer::new(&oracle, &rules, AnalysisConfig::from(&config));
//! let report = analyzer.analyze(&["e4", "e5", "Qh5"]).await;
//! println!("{}", report.outcome.label());
//! ```

pub mod analyzer;
pub mod book;
pub mod config;
pub mod evaluation;
pub mod hint;
pub mod narrative;
pub mod oracle;
pub mod quality;
pub mod replay;
pub mod summary;

pub use analyzer::{AnalysisConfig, GameAnalyzer, Progress, ProgressSink};
pub use book::{BookError, OpeningBook};
pub use config::{BackendKind, ConfigError, LocalConfig, RemoteConfig, ReviewConfig};
pub use evaluation::{Evaluation, Side, MATE_SCORE};
pub use hint::{suggest_lines, SuggestedLine};
pub use narrative::{narrate, HttpNarrator, Narration, NarrativeError, NarrativeGenerator};
pub use oracle::{
    BackendError, CloudEvalClient, EngineError, EngineLine, EngineSettings, EvaluationOracle,
    EvaluationResult, LocalEngine, Oracle, RemoteError, MAX_MULTI_PV,
};
pub use quality::{classify_move, Classification, MoveQuality, MoveRecord, Thresholds};
pub use replay::{
    split_move_text, AppliedMove, GameReplayer, IllegalMove, Position, ReplayError, ReplayStep,
    RulesOracle, ShakmatyRules, TerminalState,
};
pub use summary::{
    summarize, AnalysisReport, GameOutcome, KeyMoment, NarrativePayload, RunStatus, SideCounts,
    TierCounts,
};
