//! Reconstruction of ranked multi-PV lines from a stream of engine output.

use std::collections::BTreeMap;

use tracing::debug;

use crate::{EngineInfo, EngineMessage, Score};

/// Default number of plies kept from each principal variation.
pub const DEFAULT_PV_PLIES: usize = 4;

/// One ranked candidate line, as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PvLine {
    /// Rank of the line (1 = best).
    pub rank: u32,
    /// Leading moves of the principal variation, in UCI notation.
    pub moves: Vec<String>,
    /// Score relative to the side to move.
    pub score: Score,
}

/// Result of one completed search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Move from the `bestmove` line, `None` for `bestmove (none)`.
    pub best_move: Option<String>,
    /// Ranked lines, best first. Empty when no info line was usable.
    pub lines: Vec<PvLine>,
}

/// Collects info lines for a single search.
///
/// Lines may arrive interleaved, duplicated or out of rank order; the most
/// recent line per rank wins, since deeper iterations supersede shallower
/// ones. Create one collector per search and drop it afterwards.
#[derive(Debug, Clone)]
pub struct MultiPvCollector {
    lines: BTreeMap<u32, EngineInfo>,
    pv_plies: usize,
}

impl Default for MultiPvCollector {
    fn default() -> Self {
        Self::new(DEFAULT_PV_PLIES)
    }
}

impl MultiPvCollector {
    /// Create a collector keeping at most `pv_plies` moves per line.
    pub fn new(pv_plies: usize) -> Self {
        Self {
            lines: BTreeMap::new(),
            pv_plies,
        }
    }

    /// Feed one raw output line.
    ///
    /// Returns the rendered outcome when the line is a `bestmove` completion,
    /// `None` otherwise. Rendering does not consume the retained lines, so a
    /// duplicated completion line renders the same outcome again.
    pub fn feed(&mut self, line: &str) -> Option<SearchOutcome> {
        match EngineMessage::parse(line) {
            Some(EngineMessage::Info(info)) => {
                self.record(info);
                None
            }
            Some(EngineMessage::BestMove { mv, .. }) => Some(self.finish(mv)),
            Some(_) => None,
            None => {
                if line.trim_start().starts_with("info") {
                    debug!(line = line.trim(), "skipping unparseable info line");
                }
                None
            }
        }
    }

    /// Number of ranks seen so far.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns true if no usable info line has been seen.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn record(&mut self, info: EngineInfo) {
        if info.score.is_none() {
            // Progress lines (currmove, hashfull, strings) carry no score.
            return;
        }
        self.lines.insert(info.rank(), info);
    }

    /// Render the retained lines sorted by rank.
    pub fn finish(&self, best_move: Option<String>) -> SearchOutcome {
        let lines = self
            .lines
            .iter()
            .filter_map(|(&rank, info)| {
                let score = info.score?;
                Some(PvLine {
                    rank,
                    moves: info.pv.iter().take(self.pv_plies).cloned().collect(),
                    score,
                })
            })
            .collect();

        SearchOutcome { best_move, lines }
    }
}
