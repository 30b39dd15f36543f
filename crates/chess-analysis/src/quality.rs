//! Move quality classification.

use serde::{Deserialize, Serialize};

use crate::evaluation::{Evaluation, Side};
use crate::replay::Position;

/// Classification of move quality based on evaluation change.
///
/// Ordered from best to worst, with [`MoveQuality::Book`] last since it
/// says nothing about the evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveQuality {
    /// The engine's preferred move was played
    Brilliant,
    /// Minimal evaluation loss
    Great,
    /// Small evaluation loss
    Good,
    /// Noticeable evaluation loss
    Inaccuracy,
    /// Significant evaluation loss
    Mistake,
    /// Major evaluation loss
    Blunder,
    /// Known opening move
    Book,
}

impl MoveQuality {
    /// All tiers, in display order.
    pub const ALL: [MoveQuality; 7] = [
        MoveQuality::Brilliant,
        MoveQuality::Great,
        MoveQuality::Good,
        MoveQuality::Inaccuracy,
        MoveQuality::Mistake,
        MoveQuality::Blunder,
        MoveQuality::Book,
    ];

    /// Tiers worth pointing out in a game summary.
    pub fn is_key_moment(self) -> bool {
        matches!(
            self,
            MoveQuality::Mistake | MoveQuality::Blunder | MoveQuality::Brilliant
        )
    }

    /// Lowercase tier name.
    pub fn as_str(self) -> &'static str {
        match self {
            MoveQuality::Brilliant => "brilliant",
            MoveQuality::Great => "great",
            MoveQuality::Good => "good",
            MoveQuality::Inaccuracy => "inaccuracy",
            MoveQuality::Mistake => "mistake",
            MoveQuality::Blunder => "blunder",
            MoveQuality::Book => "book",
        }
    }
}

impl std::fmt::Display for MoveQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower bounds (inclusive, in centipawns) of the numeric tiers.
///
/// A signed delta at or above `great` is great, at or above `good` is good,
/// and so on down to `mistake`; anything lower is a blunder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_great")]
    pub great: i32,
    #[serde(default = "default_good")]
    pub good: i32,
    #[serde(default = "default_inaccuracy")]
    pub inaccuracy: i32,
    #[serde(default = "default_mistake")]
    pub mistake: i32,
    /// Deltas strictly below this carry a pawn-loss annotation.
    #[serde(default = "default_annotate_below")]
    pub annotate_below: i32,
}

fn default_great() -> i32 {
    -10
}

fn default_good() -> i32 {
    -40
}

fn default_inaccuracy() -> i32 {
    -100
}

fn default_mistake() -> i32 {
    -200
}

fn default_annotate_below() -> i32 {
    -100
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            great: default_great(),
            good: default_good(),
            inaccuracy: default_inaccuracy(),
            mistake: default_mistake(),
            annotate_below: default_annotate_below(),
        }
    }
}

impl Thresholds {
    /// Tier for a signed delta, ignoring best-move matches.
    pub fn tier(&self, signed_delta: i32) -> MoveQuality {
        if signed_delta >= self.great {
            MoveQuality::Great
        } else if signed_delta >= self.good {
            MoveQuality::Good
        } else if signed_delta >= self.inaccuracy {
            MoveQuality::Inaccuracy
        } else if signed_delta >= self.mistake {
            MoveQuality::Mistake
        } else {
            MoveQuality::Blunder
        }
    }
}

/// Outcome of classifying one move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub quality: MoveQuality,
    pub annotation: Option<String>,
    /// Evaluation change from the mover's point of view (negative = lost ground).
    pub signed_delta: i32,
}

/// Classify a move from the evaluations around it.
///
/// `best_move` and `actual_move` must be in the same notation; playing the
/// engine's preferred move is brilliant whatever the evaluation did.
pub fn classify_move(
    before: Evaluation,
    after: Evaluation,
    mover: Side,
    best_move: Option<&str>,
    actual_move: &str,
    thresholds: &Thresholds,
) -> Classification {
    let signed_delta = signed_delta(before, after, mover);

    let quality = if best_move == Some(actual_move) {
        MoveQuality::Brilliant
    } else {
        thresholds.tier(signed_delta)
    };

    let annotation = (signed_delta < thresholds.annotate_below).then(|| pawn_loss_note(signed_delta));

    Classification {
        quality,
        annotation,
        signed_delta,
    }
}

/// Evaluation change seen from `mover`'s side of the board.
pub fn signed_delta(before: Evaluation, after: Evaluation, mover: Side) -> i32 {
    let before = i64::from(before.to_centipawns());
    let after = i64::from(after.to_centipawns());
    let delta = (after - before) * i64::from(mover.sign());
    delta.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Whole pawns lost, rounding halves up.
fn pawns_lost(signed_delta: i32) -> u32 {
    (signed_delta.unsigned_abs() + 50) / 100
}

fn pawn_loss_note(signed_delta: i32) -> String {
    match pawns_lost(signed_delta) {
        1 => "Lost 1 pawn of advantage".to_string(),
        n => format!("Lost {} pawns of advantage", n),
    }
}

/// Analysis result for a single ply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveRecord {
    /// 0-based ply number
    pub index: usize,
    /// The move as it appeared in the game record
    pub notation: String,
    /// The move in UCI notation
    pub uci: String,
    pub mover: Side,
    pub position_after: Position,
    /// White-relative centipawns, mates collapsed via [`Evaluation::to_centipawns`]
    pub evaluation_after: i32,
    pub quality: MoveQuality,
    pub annotation: Option<String>,
    /// The engine's preferred move in the position before, in SAN
    pub best_move: Option<String>,
    /// Set when either evaluation around this move was unavailable
    pub degraded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn classify(before: i32, after: i32, mover: Side) -> Classification {
        classify_move(
            Evaluation::Centipawns(before),
            Evaluation::Centipawns(after),
            mover,
            Some("a2a3"),
            "h2h3",
            &Thresholds::default(),
        )
    }

    #[test]
    fn great_boundary_is_inclusive() {
        assert_eq!(classify(0, -10, Side::White).quality, MoveQuality::Great);
        assert_eq!(classify(0, -11, Side::White).quality, MoveQuality::Good);
    }

    #[test]
    fn tier_boundaries() {
        assert_eq!(classify(0, -40, Side::White).quality, MoveQuality::Good);
        assert_eq!(classify(0, -41, Side::White).quality, MoveQuality::Inaccuracy);
        assert_eq!(classify(0, -100, Side::White).quality, MoveQuality::Inaccuracy);
        assert_eq!(classify(0, -101, Side::White).quality, MoveQuality::Mistake);
        assert_eq!(classify(0, -200, Side::White).quality, MoveQuality::Mistake);
        assert_eq!(classify(0, -201, Side::White).quality, MoveQuality::Blunder);
    }

    #[test]
    fn black_perspective_is_flipped() {
        // White-relative evaluation rising is bad for Black.
        let c = classify(-50, 150, Side::Black);
        assert_eq!(c.signed_delta, -200);
        assert_eq!(c.quality, MoveQuality::Mistake);

        let c = classify(100, -20, Side::Black);
        assert_eq!(c.signed_delta, 120);
        assert_eq!(c.quality, MoveQuality::Great);
    }

    #[test]
    fn best_move_overrides_delta() {
        let c = classify_move(
            Evaluation::Centipawns(300),
            Evaluation::Centipawns(-300),
            Side::White,
            Some("e2e4"),
            "e2e4",
            &Thresholds::default(),
        );
        assert_eq!(c.quality, MoveQuality::Brilliant);
        assert_eq!(c.signed_delta, -600);
        assert_eq!(c.annotation.as_deref(), Some("Lost 6 pawns of advantage"));
    }

    #[test]
    fn annotation_rounds_half_up() {
        assert_eq!(
            classify(0, -250, Side::White).annotation.as_deref(),
            Some("Lost 3 pawns of advantage")
        );
        assert_eq!(
            classify(0, -149, Side::White).annotation.as_deref(),
            Some("Lost 1 pawn of advantage")
        );
        assert_eq!(
            classify(0, -150, Side::White).annotation.as_deref(),
            Some("Lost 2 pawns of advantage")
        );
    }

    #[test]
    fn no_annotation_at_or_above_cutoff() {
        assert!(classify(0, -100, Side::White).annotation.is_none());
        assert!(classify(0, -99, Side::White).annotation.is_none());
        assert!(classify(0, -101, Side::White).annotation.is_some());
    }

    #[test]
    fn allowing_mate_is_a_blunder() {
        let c = classify_move(
            Evaluation::Centipawns(50),
            Evaluation::Mate { moves: 2, winner: Side::Black },
            Side::White,
            None,
            "f2f3",
            &Thresholds::default(),
        );
        assert_eq!(c.quality, MoveQuality::Blunder);
        assert_eq!(c.signed_delta, -99_998 - 50);
    }

    #[test]
    fn shortening_a_mate_is_great() {
        let c = classify_move(
            Evaluation::Mate { moves: 3, winner: Side::White },
            Evaluation::Mate { moves: 2, winner: Side::White },
            Side::White,
            None,
            "d1h5",
            &Thresholds::default(),
        );
        assert_eq!(c.signed_delta, 1);
        assert_eq!(c.quality, MoveQuality::Great);
    }

    #[test]
    fn custom_thresholds() {
        let strict = Thresholds {
            great: 0,
            ..Thresholds::default()
        };
        assert_eq!(strict.tier(-1), MoveQuality::Good);
        assert_eq!(strict.tier(0), MoveQuality::Great);
    }

    #[test]
    fn key_moment_tiers() {
        let keys: Vec<MoveQuality> = MoveQuality::ALL
            .into_iter()
            .filter(|q| q.is_key_moment())
            .collect();
        assert_eq!(
            keys,
            vec![MoveQuality::Brilliant, MoveQuality::Mistake, MoveQuality::Blunder]
        );
    }

    #[test]
    fn quality_serializes_lowercase() {
        let json = serde_json::to_string(&MoveQuality::Inaccuracy).unwrap();
        assert_eq!(json, "\"inaccuracy\"");
    }

    proptest! {
        #[test]
        fn non_negative_delta_is_never_worse_than_good(
            before in -5_000i32..5_000,
            gain in 0i32..5_000,
            white in any::<bool>(),
        ) {
            let mover = if white { Side::White } else { Side::Black };
            let after = before + gain * mover.sign();
            let c = classify(before, after, mover);
            prop_assert!(c.signed_delta >= 0);
            prop_assert!(c.quality <= MoveQuality::Good);
            prop_assert!(c.annotation.is_none());
        }

        #[test]
        fn tiers_are_monotonic(a in -1_000i32..1_000, b in -1_000i32..1_000) {
            let t = Thresholds::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(t.tier(hi) <= t.tier(lo));
        }
    }
}
