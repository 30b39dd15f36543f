//! Top engine lines rendered for display.

use serde::Serialize;

use crate::evaluation::Evaluation;
use crate::oracle::{EngineLine, EvaluationOracle};
use crate::replay::{Position, RulesOracle};

/// A candidate line in SAN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestedLine {
    pub rank: u32,
    pub moves: Vec<String>,
    pub evaluation: Evaluation,
}

/// Ask `oracle` for its top `n` lines in `position` and render them in SAN.
///
/// A line is cut short at the first move the rules oracle rejects. Empty
/// when the oracle has nothing to offer.
pub async fn suggest_lines<O, R>(oracle: &O, rules: &R, position: &Position, n: usize) -> Vec<SuggestedLine>
where
    O: EvaluationOracle,
    R: RulesOracle,
{
    oracle
        .evaluate_top(position, n)
        .await
        .into_iter()
        .map(|line| render_line(rules, position, line))
        .collect()
}

fn render_line<R: RulesOracle>(rules: &R, start: &Position, line: EngineLine) -> SuggestedLine {
    let mut moves = Vec::with_capacity(line.moves.len());
    let mut current = start.clone();

    for uci in &line.moves {
        let Some(san) = rules.to_external_notation(&current, uci) else {
            break;
        };
        match rules.apply_move(&current, uci) {
            Ok(applied) => current = applied.position,
            Err(_) => break,
        }
        moves.push(san);
    }

    SuggestedLine {
        rank: line.rank,
        moves,
        evaluation: line.evaluation,
    }
}
