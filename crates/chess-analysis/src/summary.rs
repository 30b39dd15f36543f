//! Aggregation of per-move records into a game report.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::evaluation::Side;
use crate::quality::{MoveQuality, MoveRecord};
use crate::replay::TerminalState;

/// Default number of key moments kept in a report.
pub const DEFAULT_KEY_MOMENTS: usize = 5;

/// Count of moves per quality tier. Every tier is present, zero or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TierCounts(BTreeMap<MoveQuality, usize>);

impl Default for TierCounts {
    fn default() -> Self {
        Self(MoveQuality::ALL.into_iter().map(|q| (q, 0)).collect())
    }
}

impl TierCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, quality: MoveQuality) {
        *self.0.entry(quality).or_insert(0) += 1;
    }

    pub fn get(&self, quality: MoveQuality) -> usize {
        self.0.get(&quality).copied().unwrap_or(0)
    }

    /// Total number of moves counted.
    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MoveQuality, usize)> + '_ {
        self.0.iter().map(|(&q, &n)| (q, n))
    }
}

/// Tier counts split by the side that moved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SideCounts {
    pub white: TierCounts,
    pub black: TierCounts,
}

impl SideCounts {
    pub fn for_side(&self, side: Side) -> &TierCounts {
        match side {
            Side::White => &self.white,
            Side::Black => &self.black,
        }
    }
}

/// How the game ended, as far as the final position tells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum GameOutcome {
    Checkmate { winner: Side },
    Draw,
    /// The game stopped before a decisive or drawn position.
    Unresolved,
}

impl From<TerminalState> for GameOutcome {
    fn from(state: TerminalState) -> Self {
        match state {
            TerminalState::Checkmate { winner } => GameOutcome::Checkmate { winner },
            TerminalState::Draw => GameOutcome::Draw,
            TerminalState::Ongoing => GameOutcome::Unresolved,
        }
    }
}

impl GameOutcome {
    pub fn label(&self) -> String {
        match self {
            GameOutcome::Checkmate { winner } => format!("{} wins by checkmate", winner),
            GameOutcome::Draw => "Draw".to_string(),
            GameOutcome::Unresolved => "Unresolved".to_string(),
        }
    }
}

/// How far an analysis run got.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    /// Every move was analyzed.
    Complete,
    /// Replay hit an illegal move at `ply`.
    Truncated { ply: usize, reason: String },
    /// Cancelled after `processed` plies.
    Cancelled { processed: usize },
}

/// Complete analysis of a game.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub records: Vec<MoveRecord>,
    pub tier_counts: TierCounts,
    pub side_counts: SideCounts,
    /// Mistakes, blunders and brilliant moves, in ply order.
    pub key_moments: Vec<MoveRecord>,
    pub outcome: GameOutcome,
    pub status: RunStatus,
}

/// Reduce a run's records into a report.
///
/// `terminal` is the rules oracle's verdict on the last replayed position.
pub fn summarize(
    records: Vec<MoveRecord>,
    terminal: TerminalState,
    key_moment_limit: usize,
    status: RunStatus,
) -> AnalysisReport {
    let mut tier_counts = TierCounts::new();
    let mut side_counts = SideCounts::default();

    for record in &records {
        tier_counts.add(record.quality);
        match record.mover {
            Side::White => side_counts.white.add(record.quality),
            Side::Black => side_counts.black.add(record.quality),
        }
    }

    let key_moments = records
        .iter()
        .filter(|r| r.quality.is_key_moment())
        .take(key_moment_limit)
        .cloned()
        .collect();

    AnalysisReport {
        records,
        tier_counts,
        side_counts,
        key_moments,
        outcome: terminal.into(),
        status,
    }
}

/// A key moment as handed to the narrative generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyMoment {
    pub ply: usize,
    /// Full-move number as shown in a score sheet.
    pub move_number: usize,
    pub side: Side,
    #[serde(rename = "move")]
    pub notation: String,
    pub tier: MoveQuality,
    pub annotation: Option<String>,
}

/// Everything the narrative generator is told about a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NarrativePayload {
    pub plies: usize,
    pub tier_counts: TierCounts,
    pub key_moments: Vec<KeyMoment>,
    pub outcome: String,
}

impl AnalysisReport {
    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Complete
    }

    /// Number of records flagged as degraded.
    pub fn degraded_count(&self) -> usize {
        self.records.iter().filter(|r| r.degraded).count()
    }

    pub fn narrative_payload(&self) -> NarrativePayload {
        NarrativePayload {
            plies: self.records.len(),
            tier_counts: self.tier_counts.clone(),
            key_moments: self
                .key_moments
                .iter()
                .map(|r| KeyMoment {
                    ply: r.index,
                    move_number: r.index / 2 + 1,
                    side: r.mover,
                    notation: r.notation.clone(),
                    tier: r.quality,
                    annotation: r.annotation.clone(),
                })
                .collect(),
            outcome: self.outcome.label(),
        }
    }
}
