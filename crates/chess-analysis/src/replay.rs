//! Game replay against a rules oracle.
//!
//! The pipeline never decides legality itself. Everything it knows about
//! the rules of chess comes through [`RulesOracle`]; [`ShakmatyRules`] is
//! the implementation backed by the `shakmaty` crate.

use serde::{Deserialize, Serialize};
use shakmaty::fen::Fen;
use shakmaty::san::{San, SanPlus};
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Move, Position as _};
use thiserror::Error;

use crate::evaluation::Side;

/// A board state as a FEN string plus the side to move.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub fen: String,
    pub side_to_move: Side,
}

/// A move successfully applied to a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMove {
    /// Position after the move.
    pub position: Position,
    /// Side that made the move.
    pub mover: Side,
    /// The move in UCI notation.
    pub uci: String,
    /// The move in SAN, including any check suffix.
    pub san: String,
}

/// Whether the game is over in a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TerminalState {
    Ongoing,
    Checkmate { winner: Side },
    Draw,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Illegal move '{notation}': {reason}")]
pub struct IllegalMove {
    pub notation: String,
    pub reason: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    #[error("Illegal move '{notation}' at ply {ply}")]
    IllegalMove { ply: usize, notation: String },
    #[error("Invalid FEN: {0}")]
    InvalidFen(String),
}

/// Legality and game-state queries the pipeline relies on.
pub trait RulesOracle {
    /// The standard starting position.
    fn initial_position(&self) -> Position;

    /// Validate a FEN string and wrap it as a [`Position`].
    fn position_from_fen(&self, fen: &str) -> Result<Position, ReplayError>;

    /// Apply a move given in SAN or UCI notation.
    fn apply_move(&self, position: &Position, notation: &str) -> Result<AppliedMove, IllegalMove>;

    /// Game state decidable from `position` alone.
    ///
    /// A record that ends where a draw can be claimed (the fifty-move rule)
    /// is taken to end in that claim.
    fn terminal_state(&self, position: &Position) -> TerminalState;

    /// Game state at the end of `history`, every position the game passed
    /// through in order, the current one last. Adds threefold repetition
    /// to what [`terminal_state`](Self::terminal_state) sees.
    fn game_state(&self, history: &[Position]) -> TerminalState {
        let Some(current) = history.last() else {
            return TerminalState::Ongoing;
        };
        match self.terminal_state(current) {
            TerminalState::Ongoing if repetitions(history, current) >= 3 => TerminalState::Draw,
            state => state,
        }
    }

    /// Render a UCI move in SAN, or `None` if it is not legal in `position`.
    fn to_external_notation(&self, position: &Position, uci: &str) -> Option<String>;
}

/// Board, side to move, castling rights and en passant square of a FEN.
///
/// The move counters do not take part in repetition.
fn repetition_key(fen: &str) -> impl Iterator<Item = &str> {
    fen.split_whitespace().take(4)
}

fn repetitions(history: &[Position], position: &Position) -> usize {
    history
        .iter()
        .filter(|p| repetition_key(&p.fen).eq(repetition_key(&position.fen)))
        .count()
}

/// [`RulesOracle`] backed by `shakmaty`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShakmatyRules;

impl ShakmatyRules {
    pub fn new() -> Self {
        Self
    }

    fn load(&self, position: &Position) -> Option<Chess> {
        let fen: Fen = position.fen.parse().ok()?;
        fen.into_position(CastlingMode::Standard).ok()
    }

    fn parse_move(pos: &Chess, notation: &str) -> Result<Move, String> {
        if let Ok(uci) = notation.parse::<UciMove>() {
            if let Ok(mv) = uci.to_move(pos) {
                return Ok(mv);
            }
        }
        let san: SanPlus = notation
            .parse()
            .map_err(|_| "not a recognizable move".to_string())?;
        san.san
            .to_move(pos)
            .map_err(|_| "not legal in this position".to_string())
    }
}

fn side_of(color: Color) -> Side {
    match color {
        Color::White => Side::White,
        Color::Black => Side::Black,
    }
}

fn wrap(pos: &Chess) -> Position {
    Position {
        fen: Fen::from_position(pos, EnPassantMode::Legal).to_string(),
        side_to_move: side_of(pos.turn()),
    }
}

/// SAN for a legal move, with `+` or `#` appended.
fn san_with_suffix(pos: &Chess, mv: Move) -> String {
    let mut san = San::from_move(pos, mv.clone()).to_string();
    let mut after = pos.clone();
    after.play_unchecked(mv);
    if after.is_checkmate() {
        san.push('#');
    } else if after.is_check() {
        san.push('+');
    }
    san
}

impl RulesOracle for ShakmatyRules {
    fn initial_position(&self) -> Position {
        wrap(&Chess::default())
    }

    fn position_from_fen(&self, fen: &str) -> Result<Position, ReplayError> {
        let parsed: Fen = fen
            .trim()
            .parse()
            .map_err(|e| ReplayError::InvalidFen(format!("{}: {}", fen, e)))?;
        let pos: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| ReplayError::InvalidFen(format!("{}: {}", fen, e)))?;
        Ok(wrap(&pos))
    }

    fn apply_move(&self, position: &Position, notation: &str) -> Result<AppliedMove, IllegalMove> {
        let illegal = |reason: String| IllegalMove {
            notation: notation.to_string(),
            reason,
        };

        let pos = self
            .load(position)
            .ok_or_else(|| illegal("position is not valid".to_string()))?;
        let mv = Self::parse_move(&pos, notation.trim()).map_err(illegal)?;

        let san = san_with_suffix(&pos, mv.clone());
        let uci = mv.clone().to_uci(CastlingMode::Standard).to_string();
        let mover = side_of(pos.turn());

        let mut after = pos;
        after.play_unchecked(mv);

        Ok(AppliedMove {
            position: wrap(&after),
            mover,
            uci,
            san,
        })
    }

    fn terminal_state(&self, position: &Position) -> TerminalState {
        let Some(pos) = self.load(position) else {
            return TerminalState::Ongoing;
        };

        // Fifty-move draws are claimable rather than automatic; a record that
        // stops at 100 halfmoves is taken to have ended in the claim.
        if pos.is_checkmate() {
            TerminalState::Checkmate {
                winner: side_of(pos.turn()).opposite(),
            }
        } else if pos.is_stalemate() || pos.is_insufficient_material() || pos.halfmoves() >= 100 {
            TerminalState::Draw
        } else {
            TerminalState::Ongoing
        }
    }

    fn to_external_notation(&self, position: &Position, uci: &str) -> Option<String> {
        let pos = self.load(position)?;
        let mv = uci.parse::<UciMove>().ok()?.to_move(&pos).ok()?;
        Some(san_with_suffix(&pos, mv))
    }
}

/// One successfully replayed ply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayStep {
    pub ply: usize,
    pub before: Position,
    pub applied: AppliedMove,
    /// The move as given in the game record.
    pub notation: String,
}

/// Iterates over a move list, applying each move to the previous position.
///
/// Stops for good after the first illegal move.
pub struct GameReplayer<'a, R, S> {
    rules: &'a R,
    moves: &'a [S],
    current: Position,
    /// Every position reached, starting position first.
    history: Vec<Position>,
    ply: usize,
    halted: bool,
}

impl<'a, R: RulesOracle, S: AsRef<str>> GameReplayer<'a, R, S> {
    /// Replay from the standard starting position.
    pub fn new(rules: &'a R, moves: &'a [S]) -> Self {
        Self::from_position(rules, moves, rules.initial_position())
    }

    pub fn from_position(rules: &'a R, moves: &'a [S], start: Position) -> Self {
        Self {
            rules,
            moves,
            history: vec![start.clone()],
            current: start,
            ply: 0,
            halted: false,
        }
    }

    /// The position reached so far.
    pub fn current(&self) -> &Position {
        &self.current
    }

    /// Positions reached so far, starting position first and
    /// [`current`](Self::current) last.
    pub fn history(&self) -> &[Position] {
        &self.history
    }

    /// Game state of the position reached so far, repetition included.
    pub fn game_state(&self) -> TerminalState {
        self.rules.game_state(&self.history)
    }
}

impl<R: RulesOracle, S: AsRef<str>> Iterator for GameReplayer<'_, R, S> {
    type Item = Result<ReplayStep, ReplayError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.halted {
            return None;
        }
        let notation = self.moves.get(self.ply)?.as_ref();
        let ply = self.ply;

        match self.rules.apply_move(&self.current, notation) {
            Ok(applied) => {
                let before = std::mem::replace(&mut self.current, applied.position.clone());
                self.history.push(applied.position.clone());
                self.ply += 1;
                Some(Ok(ReplayStep {
                    ply,
                    before,
                    applied,
                    notation: notation.to_string(),
                }))
            }
            Err(_) => {
                self.halted = true;
                Some(Err(ReplayError::IllegalMove {
                    ply,
                    notation: notation.to_string(),
                }))
            }
        }
    }
}

/// Split a free-text move list into move tokens.
///
/// Move numbers (`1.`, `12...`), results (`1-0`, `*`) and trailing
/// `!`/`?` annotations are dropped.
pub fn split_move_text(text: &str) -> Vec<String> {
    text.split_whitespace()
        .filter_map(|token| {
            let token = match token.rfind('.') {
                Some(i) if token[..i].chars().all(|c| c.is_ascii_digit() || c == '.') => &token[i + 1..],
                _ => token,
            };
            let token = token.trim_end_matches(['!', '?']);
            match token {
                "" | "1-0" | "0-1" | "1/2-1/2" | "*" => None,
                t => Some(t.to_string()),
            }
        })
        .collect()
}
