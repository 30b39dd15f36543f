//! Game analysis with move quality classification.
//!
//! This module provides the [`GameAnalyzer`] for analyzing complete chess games
//! and classifying each move's quality.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::book::OpeningBook;
use crate::config::ReviewConfig;
use crate::oracle::{EvaluationOracle, EvaluationResult};
use crate::quality::{classify_move, MoveQuality, MoveRecord, Thresholds};
use crate::replay::{GameReplayer, Position, ReplayStep, RulesOracle};
use crate::summary::{summarize, AnalysisReport, RunStatus, DEFAULT_KEY_MOMENTS};

/// Plies analyzed so far out of the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
}

/// Receives progress updates after each analyzed ply.
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: Progress);
}

impl<F> ProgressSink for F
where
    F: Fn(Progress) + Send + Sync,
{
    fn report(&self, progress: Progress) {
        self(progress)
    }
}

impl ProgressSink for UnboundedSender<Progress> {
    fn report(&self, progress: Progress) {
        // A dropped receiver just means nobody is watching.
        let _ = self.send(progress);
    }
}

/// Configuration for game analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    pub thresholds: Thresholds,
    /// Most key moments kept in the report.
    pub key_moments: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            key_moments: DEFAULT_KEY_MOMENTS,
        }
    }
}

impl From<&ReviewConfig> for AnalysisConfig {
    fn from(config: &ReviewConfig) -> Self {
        Self {
            thresholds: config.thresholds,
            key_moments: config.key_moments,
        }
    }
}

/// Analyzes chess games to classify move quality.
///
/// Positions are evaluated one at a time, in game order, and each position
/// is evaluated once: the evaluation after a move is reused as the
/// evaluation before the next one. A failed evaluation is the exception;
/// it is retried once when the next ply needs it.
pub struct GameAnalyzer<'a, O, R> {
    oracle: &'a O,
    rules: &'a R,
    config: AnalysisConfig,
    book: Option<OpeningBook>,
    progress: Option<Box<dyn ProgressSink + 'a>>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a, O, R> GameAnalyzer<'a, O, R>
where
    O: EvaluationOracle,
    R: RulesOracle,
{
    pub fn new(oracle: &'a O, rules: &'a R, config: AnalysisConfig) -> Self {
        Self {
            oracle,
            rules,
            config,
            book: None,
            progress: None,
            cancel: None,
        }
    }

    /// Tier moves found in `book` as [`MoveQuality::Book`].
    pub fn with_book(mut self, book: OpeningBook) -> Self {
        self.book = Some(book);
        self
    }

    pub fn with_progress(mut self, sink: impl ProgressSink + 'a) -> Self {
        self.progress = Some(Box::new(sink));
        self
    }

    /// Stop between plies once `flag` is set.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Analyzes a game played from the standard starting position.
    ///
    /// Moves may be in SAN or UCI notation. The run never fails: unusable
    /// evaluations are flagged on the affected records, an illegal move
    /// truncates the run and cancellation stops it, keeping every record
    /// produced so far.
    pub async fn analyze<S: AsRef<str>>(&self, moves: &[S]) -> AnalysisReport {
        self.analyze_from(self.rules.initial_position(), moves).await
    }

    /// Analyzes a game starting at `start`.
    ///
    /// The opening book only applies to games from the standard start.
    pub async fn analyze_from<S: AsRef<str>>(&self, start: Position, moves: &[S]) -> AnalysisReport {
        let total = moves.len();
        let book = self
            .book
            .as_ref()
            .filter(|_| start == self.rules.initial_position());
        info!(plies = total, fen = %start.fen, "starting game analysis");

        let mut replayer = GameReplayer::from_position(self.rules, moves, start);
        let mut records: Vec<MoveRecord> = Vec::with_capacity(total);
        let mut history: Vec<String> = Vec::with_capacity(total);
        let mut carried: Option<EvaluationResult> = None;
        let mut status = RunStatus::Complete;

        for _ in 0..total {
            if self.is_cancelled() {
                info!(processed = records.len(), total, "analysis cancelled");
                status = RunStatus::Cancelled {
                    processed: records.len(),
                };
                break;
            }

            let step = match replayer.next() {
                Some(Ok(step)) => step,
                Some(Err(e)) => {
                    warn!(error = %e, "stopping analysis at illegal move");
                    status = RunStatus::Truncated {
                        ply: records.len(),
                        reason: e.to_string(),
                    };
                    break;
                }
                None => break,
            };

            // A failed evaluation is asked for once more before it spills
            // into a second ply.
            let before = match carried.take() {
                Some(result) if !result.is_degraded() => result,
                Some(_) => {
                    debug!(ply = step.ply, "retrying failed evaluation");
                    self.oracle.evaluate(&step.before).await
                }
                None => self.oracle.evaluate(&step.before).await,
            };
            let after = self.oracle.evaluate(&step.applied.position).await;

            let in_book = book.is_some_and(|b| b.contains(&history, &step.applied.uci));
            let record = self.build_record(&step, &before, &after, in_book);
            debug!(
                ply = record.index,
                notation = %record.notation,
                quality = %record.quality,
                eval = record.evaluation_after,
                degraded = record.degraded,
                "classified move"
            );

            history.push(step.applied.uci.clone());
            records.push(record);
            if let Some(sink) = &self.progress {
                sink.report(Progress {
                    processed: records.len(),
                    total,
                });
            }
            carried = Some(after);
        }

        let terminal = replayer.game_state();
        let report = summarize(records, terminal, self.config.key_moments, status);
        info!(
            plies = report.records.len(),
            degraded = report.degraded_count(),
            outcome = %report.outcome.label(),
            "game analysis finished"
        );
        report
    }

    fn build_record(
        &self,
        step: &ReplayStep,
        before: &EvaluationResult,
        after: &EvaluationResult,
        in_book: bool,
    ) -> MoveRecord {
        let degraded = before.is_degraded() || after.is_degraded();

        let (quality, annotation) = if in_book {
            (MoveQuality::Book, None)
        } else if degraded {
            (MoveQuality::Good, None)
        } else {
            let c = classify_move(
                before.evaluation,
                after.evaluation,
                step.applied.mover,
                before.best_move.as_deref(),
                &step.applied.uci,
                &self.config.thresholds,
            );
            (c.quality, c.annotation)
        };

        let best_move = before
            .best_move
            .as_deref()
            .and_then(|uci| self.rules.to_external_notation(&step.before, uci));

        MoveRecord {
            index: step.ply,
            notation: step.notation.clone(),
            uci: step.applied.uci.clone(),
            mover: step.applied.mover,
            position_after: step.applied.position.clone(),
            // A degraded result already carries the neutral score.
            evaluation_after: after.evaluation.to_centipawns(),
            quality,
            annotation,
            best_move,
            degraded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::Evaluation;
    use crate::oracle::EngineLine;
    use crate::replay::ShakmatyRules;
    use std::sync::Mutex;

    /// Same score and best move for every position.
    struct Flat;

    impl EvaluationOracle for Flat {
        async fn evaluate(&self, _position: &Position) -> EvaluationResult {
            EvaluationResult::new(Evaluation::Centipawns(15), Some("a2a3".to_string()))
        }

        async fn evaluate_top(&self, _position: &Position, _n: usize) -> Vec<EngineLine> {
            Vec::new()
        }
    }

    /// Counts the positions it was asked about.
    #[derive(Default)]
    struct Counting(Mutex<Vec<String>>);

    impl EvaluationOracle for Counting {
        async fn evaluate(&self, position: &Position) -> EvaluationResult {
            self.0.lock().unwrap().push(position.fen.clone());
            EvaluationResult::new(Evaluation::Centipawns(0), None)
        }

        async fn evaluate_top(&self, _position: &Position, _n: usize) -> Vec<EngineLine> {
            Vec::new()
        }
    }

    #[test]
    fn test_analysis_config_default() {
        let config = AnalysisConfig::default();
        assert_eq!(config.key_moments, 5);
        assert_eq!(config.thresholds, Thresholds::default());
    }

    #[test]
    fn test_analysis_config_from_review_config() {
        let mut review = ReviewConfig::default();
        review.key_moments = 2;
        review.thresholds.great = -3;
        let config = AnalysisConfig::from(&review);
        assert_eq!(config.key_moments, 2);
        assert_eq!(config.thresholds.great, -3);
    }

    #[tokio::test]
    async fn each_position_is_evaluated_once() {
        let oracle = Counting::default();
        let rules = ShakmatyRules::new();
        let analyzer = GameAnalyzer::new(&oracle, &rules, AnalysisConfig::default());

        let report = analyzer.analyze(&["e4", "e5", "Nf3", "Nc6"]).await;
        assert_eq!(report.records.len(), 4);

        let seen = oracle.0.lock().unwrap();
        assert_eq!(seen.len(), 5);
        let mut unique = seen.clone();
        unique.dedup();
        assert_eq!(unique.len(), 5);
    }

    /// Fails the given call numbers (0-based), succeeds otherwise.
    struct FailingCalls {
        fail: Vec<usize>,
        calls: Mutex<Vec<String>>,
    }

    impl EvaluationOracle for FailingCalls {
        async fn evaluate(&self, position: &Position) -> EvaluationResult {
            let mut calls = self.calls.lock().unwrap();
            let n = calls.len();
            calls.push(position.fen.clone());
            if self.fail.contains(&n) {
                EvaluationResult::degraded()
            } else {
                EvaluationResult::new(Evaluation::Centipawns(20), None)
            }
        }

        async fn evaluate_top(&self, _position: &Position, _n: usize) -> Vec<EngineLine> {
            Vec::new()
        }
    }

    #[tokio::test]
    async fn failed_evaluation_is_retried_for_next_ply() {
        let oracle = FailingCalls {
            fail: vec![1],
            calls: Mutex::new(Vec::new()),
        };
        let rules = ShakmatyRules::new();
        let analyzer = GameAnalyzer::new(&oracle, &rules, AnalysisConfig::default());

        let report = analyzer.analyze(&["e4", "e5", "Nf3"]).await;
        let degraded: Vec<bool> = report.records.iter().map(|r| r.degraded).collect();
        assert_eq!(degraded, vec![true, false, false]);

        let calls = oracle.calls.lock().unwrap();
        assert_eq!(calls.len(), 5);
        assert_eq!(calls[1], calls[2]);
        assert_eq!(calls[2], report.records[0].position_after.fen);
    }

    #[tokio::test]
    async fn failed_retry_degrades_the_next_ply_too() {
        let oracle = FailingCalls {
            fail: vec![1, 2],
            calls: Mutex::new(Vec::new()),
        };
        let rules = ShakmatyRules::new();
        let analyzer = GameAnalyzer::new(&oracle, &rules, AnalysisConfig::default());

        let report = analyzer.analyze(&["e4", "e5", "Nf3"]).await;
        let degraded: Vec<bool> = report.records.iter().map(|r| r.degraded).collect();
        assert_eq!(degraded, vec![true, true, false]);
        assert_eq!(oracle.calls.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn book_moves_are_tiered_as_book() {
        let oracle = Flat;
        let rules = ShakmatyRules::new();
        let analyzer = GameAnalyzer::new(&oracle, &rules, AnalysisConfig::default())
            .with_book(OpeningBook::builtin());

        let report = analyzer.analyze(&["e4", "e5", "Nf3", "a6"]).await;
        let tiers: Vec<MoveQuality> = report.records.iter().map(|r| r.quality).collect();
        assert_eq!(
            tiers,
            vec![MoveQuality::Book, MoveQuality::Book, MoveQuality::Book, MoveQuality::Great]
        );
        assert_eq!(report.tier_counts.get(MoveQuality::Book), 3);
        assert!(report.records[3].annotation.is_none());
    }

    #[tokio::test]
    async fn book_is_ignored_for_custom_start() {
        let oracle = Flat;
        let rules = ShakmatyRules::new();
        let start = rules
            .position_from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 3")
            .unwrap();
        let analyzer = GameAnalyzer::new(&oracle, &rules, AnalysisConfig::default())
            .with_book(OpeningBook::builtin());

        let report = analyzer.analyze_from(start, &["e4"]).await;
        assert_eq!(report.records[0].quality, MoveQuality::Great);
    }

    #[tokio::test]
    async fn best_move_is_shown_in_san() {
        let oracle = Flat;
        let rules = ShakmatyRules::new();
        let analyzer = GameAnalyzer::new(&oracle, &rules, AnalysisConfig::default());

        let report = analyzer.analyze(&["a3"]).await;
        assert_eq!(report.records[0].best_move.as_deref(), Some("a3"));
        assert_eq!(report.records[0].quality, MoveQuality::Brilliant);
    }

    #[tokio::test]
    async fn progress_is_reported_per_ply() {
        let oracle = Flat;
        let rules = ShakmatyRules::new();
        let seen = Mutex::new(Vec::new());
        let analyzer = GameAnalyzer::new(&oracle, &rules, AnalysisConfig::default())
            .with_progress(|p: Progress| seen.lock().unwrap().push(p));

        analyzer.analyze(&["d4", "d5", "c4"]).await;
        drop(analyzer);

        let seen = seen.into_inner().unwrap();
        assert_eq!(
            seen,
            vec![
                Progress { processed: 1, total: 3 },
                Progress { processed: 2, total: 3 },
                Progress { processed: 3, total: 3 },
            ]
        );
    }

    #[tokio::test]
    async fn progress_over_channel() {
        let oracle = Flat;
        let rules = ShakmatyRules::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let analyzer = GameAnalyzer::new(&oracle, &rules, AnalysisConfig::default()).with_progress(tx);

        analyzer.analyze(&["e4", "c5"]).await;
        drop(analyzer);

        assert_eq!(rx.recv().await, Some(Progress { processed: 1, total: 2 }));
        assert_eq!(rx.recv().await, Some(Progress { processed: 2, total: 2 }));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn empty_game_is_complete() {
        let oracle = Flat;
        let rules = ShakmatyRules::new();
        let analyzer = GameAnalyzer::new(&oracle, &rules, AnalysisConfig::default());

        let moves: [&str; 0] = [];
        let report = analyzer.analyze(&moves).await;
        assert!(report.records.is_empty());
        assert!(report.is_complete());
    }
}
