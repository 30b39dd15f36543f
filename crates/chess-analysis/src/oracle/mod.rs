//! Position evaluation backends.
//!
//! Every backend answers through [`EvaluationOracle`] and never fails: a
//! backend that cannot produce an evaluation returns a degraded result
//! (neutral score, no best move) and logs a warning.

mod local;
mod remote;

use std::future::Future;

use serde::Serialize;
use thiserror::Error;

pub use local::{EngineError, EngineSettings, LocalEngine, MAX_UCI_LINES};
pub use remote::{CloudEvalClient, RemoteError, DEFAULT_BASE_URL, DEFAULT_PACING};

use crate::config::{BackendKind, ReviewConfig};
use crate::evaluation::Evaluation;
use crate::replay::Position;

/// Most ranked lines a backend is asked for.
pub const MAX_MULTI_PV: usize = 5;

/// Clamp a requested line count to `1..=MAX_MULTI_PV`.
pub fn clamp_lines(n: usize) -> usize {
    n.clamp(1, MAX_MULTI_PV)
}

/// Evaluation of a single position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationResult {
    pub evaluation: Evaluation,
    /// The backend's preferred move, in UCI notation.
    pub best_move: Option<String>,
    /// False when the backend could not evaluate the position.
    pub source_ok: bool,
}

impl EvaluationResult {
    pub fn new(evaluation: Evaluation, best_move: Option<String>) -> Self {
        Self {
            evaluation,
            best_move,
            source_ok: true,
        }
    }

    /// Placeholder result for a failed evaluation.
    pub fn degraded() -> Self {
        Self {
            evaluation: Evaluation::NEUTRAL,
            best_move: None,
            source_ok: false,
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.source_ok
    }
}

/// One ranked candidate line with an absolute evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineLine {
    /// 1 = best
    pub rank: u32,
    /// Leading moves in UCI notation.
    pub moves: Vec<String>,
    pub evaluation: Evaluation,
}

/// A source of position evaluations.
pub trait EvaluationOracle: Send + Sync {
    /// Evaluate a position, degrading instead of failing.
    fn evaluate(&self, position: &Position) -> impl Future<Output = EvaluationResult> + Send;

    /// Top `n` lines (clamped to `1..=MAX_MULTI_PV`), best first.
    ///
    /// Empty when the backend could not evaluate the position.
    fn evaluate_top(&self, position: &Position, n: usize) -> impl Future<Output = Vec<EngineLine>> + Send;
}

/// Failure to bring up an evaluation backend.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Runtime choice between the evaluation backends.
pub enum Oracle {
    Remote(CloudEvalClient),
    Local(LocalEngine),
}

impl Oracle {
    /// Build the backend selected in the configuration.
    ///
    /// The local backend spawns and initializes its engine here.
    pub async fn from_config(config: &ReviewConfig) -> Result<Self, BackendError> {
        match config.backend {
            BackendKind::Remote => {
                let client = CloudEvalClient::from_config(&config.remote, config.pv_plies)?;
                Ok(Oracle::Remote(client))
            }
            BackendKind::Local => {
                let settings = EngineSettings::from_config(&config.local, config.pv_plies);
                let engine = LocalEngine::spawn(&config.local.engine_path, settings).await?;
                Ok(Oracle::Local(engine))
            }
        }
    }

    /// Stop the backend. Only the local engine holds resources to release.
    pub fn shutdown(&self) {
        if let Oracle::Local(engine) = self {
            engine.shutdown();
        }
    }
}

impl EvaluationOracle for Oracle {
    async fn evaluate(&self, position: &Position) -> EvaluationResult {
        match self {
            Oracle::Remote(client) => client.evaluate(position).await,
            Oracle::Local(engine) => engine.evaluate(position).await,
        }
    }

    async fn evaluate_top(&self, position: &Position, n: usize) -> Vec<EngineLine> {
        match self {
            Oracle::Remote(client) => client.evaluate_top(position, n).await,
            Oracle::Local(engine) => engine.evaluate_top(position, n).await,
        }
    }
}
