//! Chess position evaluation types.

use serde::{Deserialize, Serialize};
use uci::Score;

/// Base magnitude for mate scores once collapsed to centipawns.
///
/// A mate in N collapses to `±(MATE_SCORE - N)`, so nearer mates have the
/// larger magnitude and every mate outweighs any realistic centipawn score.
pub const MATE_SCORE: i32 = 100_000;

/// The side making a move or having the move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    /// The other side.
    pub fn opposite(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    /// `+1` for White, `-1` for Black.
    ///
    /// Evaluations are expressed with positive values favoring White, so
    /// multiplying by this sign turns them into the given side's own view.
    pub fn sign(self) -> i32 {
        match self {
            Side::White => 1,
            Side::Black => -1,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::White => write!(f, "White"),
            Side::Black => write!(f, "Black"),
        }
    }
}

/// Represents a chess position evaluation.
///
/// Evaluations can be either centipawn scores (for normal positions)
/// or mate scores (when a forced mate is found). Both are absolute:
/// positive centipawns favor White, and a mate names its winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Evaluation {
    /// Centipawn evaluation (positive = White advantage).
    Centipawns(i32),
    /// Forced mate for `winner` in `moves` moves (0 = already mated).
    Mate { moves: u32, winner: Side },
}

impl Evaluation {
    /// The neutral evaluation used when no real evaluation is available.
    pub const NEUTRAL: Evaluation = Evaluation::Centipawns(0);

    /// Convert an engine score reported relative to `side_to_move`.
    ///
    /// `mate 0` means the side to move has been mated.
    pub fn from_uci_score(score: Score, side_to_move: Side) -> Self {
        match score {
            Score::Cp(cp) => Evaluation::Centipawns(cp * side_to_move.sign()),
            Score::Mate(n) if n > 0 => Evaluation::Mate {
                moves: n.unsigned_abs(),
                winner: side_to_move,
            },
            Score::Mate(n) => Evaluation::Mate {
                moves: n.unsigned_abs(),
                winner: side_to_move.opposite(),
            },
        }
    }

    /// Convert a White-relative score as reported by cloud evaluation.
    ///
    /// A positive mate count means White mates; `mate 0` is attributed
    /// against the side to move.
    pub fn from_white_score(cp: Option<i32>, mate: Option<i32>, side_to_move: Side) -> Option<Self> {
        match (cp, mate) {
            (_, Some(m)) if m > 0 => Some(Evaluation::Mate {
                moves: m.unsigned_abs(),
                winner: Side::White,
            }),
            (_, Some(m)) if m < 0 => Some(Evaluation::Mate {
                moves: m.unsigned_abs(),
                winner: Side::Black,
            }),
            (_, Some(_)) => Some(Evaluation::Mate {
                moves: 0,
                winner: side_to_move.opposite(),
            }),
            (Some(cp), None) => Some(Evaluation::Centipawns(cp)),
            (None, None) => None,
        }
    }

    /// Collapse into a single comparable White-relative magnitude.
    ///
    /// Centipawns are returned unchanged (clamped below the mate band);
    /// `Mate { moves, winner }` becomes `sign(winner) * (MATE_SCORE - moves)`.
    pub fn to_centipawns(self) -> i32 {
        match self {
            Evaluation::Centipawns(cp) => cp.clamp(-MATE_BAND_FLOOR, MATE_BAND_FLOOR),
            Evaluation::Mate { moves, winner } => {
                let distance = i32::try_from(moves).unwrap_or(MATE_BAND_WIDTH).min(MATE_BAND_WIDTH);
                winner.sign() * (MATE_SCORE - distance)
            }
        }
    }

    /// Returns true for forced-mate evaluations.
    pub fn is_mate(self) -> bool {
        matches!(self, Evaluation::Mate { .. })
    }
}

/// Mate distances beyond this are treated as this far away.
const MATE_BAND_WIDTH: i32 = 1_000;
/// Largest centipawn magnitude kept distinct from the mate band.
const MATE_BAND_FLOOR: i32 = MATE_SCORE - MATE_BAND_WIDTH - 1;

impl std::fmt::Display for Evaluation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Evaluation::Centipawns(cp) => write!(f, "{:+.2}", f64::from(*cp) / 100.0),
            Evaluation::Mate { moves, winner: Side::White } => write!(f, "#{}", moves),
            Evaluation::Mate { moves, winner: Side::Black } => write!(f, "#-{}", moves),
        }
    }
}
