//! Opening reference used to tier known opening moves as book.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use thiserror::Error;

/// Errors that can occur when loading an opening book.
#[derive(Debug, Error)]
pub enum BookError {
    /// Failed to read the opening book file.
    #[error("failed to read opening book: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Main lines compiled into the built-in book, in UCI notation.
const MAIN_LINES: &[&str] = &[
    // Ruy Lopez
    "e2e4 e7e5 g1f3 b8c6 f1b5 a7a6 b5a4 g8f6 e1g1 f8e7",
    // Italian Game
    "e2e4 e7e5 g1f3 b8c6 f1c4 f8c5 c2c3 g8f6",
    "e2e4 e7e5 g1f3 b8c6 f1c4 g8f6 d2d3",
    // Scotch Game
    "e2e4 e7e5 g1f3 b8c6 d2d4 e5d4 f3d4",
    // Petrov Defense
    "e2e4 e7e5 g1f3 g8f6 f3e5 d7d6 e5f3 f6e4",
    // Vienna Game
    "e2e4 e7e5 b1c3 g8f6",
    // Sicilian Defense, Open
    "e2e4 c7c5 g1f3 d7d6 d2d4 c5d4 f3d4 g8f6 b1c3 a7a6",
    "e2e4 c7c5 g1f3 b8c6 d2d4 c5d4 f3d4",
    "e2e4 c7c5 g1f3 e7e6 d2d4 c5d4 f3d4",
    // French Defense
    "e2e4 e7e6 d2d4 d7d5 b1c3 g8f6",
    "e2e4 e7e6 d2d4 d7d5 e4e5 c7c5",
    // Caro-Kann Defense
    "e2e4 c7c6 d2d4 d7d5 b1c3 d5e4 c3e4 c8f5",
    // Scandinavian Defense
    "e2e4 d7d5 e4d5 d8d5 b1c3 d5a5",
    // Queen's Gambit
    "d2d4 d7d5 c2c4 e7e6 b1c3 g8f6 c1g5 f8e7",
    "d2d4 d7d5 c2c4 c7c6 g1f3 g8f6",
    "d2d4 d7d5 c2c4 d5c4 g1f3 g8f6",
    // Indian Defenses
    "d2d4 g8f6 c2c4 e7e6 b1c3 f8b4",
    "d2d4 g8f6 c2c4 g7g6 b1c3 f8g7 e2e4 d7d6",
    "d2d4 g8f6 c2c4 e7e6 g1f3 b7b6",
    // London System
    "d2d4 d7d5 c1f4 g8f6 e2e3",
    // English Opening
    "c2c4 e7e5 b1c3 g8f6",
    "c2c4 g8f6 b1c3 e7e6",
    // Reti Opening
    "g1f3 d7d5 c2c4",
    "g1f3 g8f6 c2c4",
];

/// Known opening moves keyed by the move history that precedes them.
///
/// Histories are UCI moves joined by single spaces; the starting position
/// is the empty string.
#[derive(Debug, Clone, Default)]
pub struct OpeningBook {
    positions: HashMap<String, HashSet<String>>,
}

impl OpeningBook {
    /// Creates a new empty opening book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in book of common main lines.
    #[must_use]
    pub fn builtin() -> Self {
        let mut book = Self::new();
        for line in MAIN_LINES {
            book.add_line(line);
        }
        book
    }

    /// Loads a book from a JSON object mapping histories to move lists.
    ///
    /// ```json
    /// { "": ["e2e4", "d2d4"], "e2e4": ["c7c5"] }
    /// ```
    pub fn from_json(json: &str) -> Result<Self, BookError> {
        let positions: HashMap<String, Vec<String>> = serde_json::from_str(json)?;
        let mut book = Self::new();
        for (history, moves) in positions {
            let key = normalize(&history);
            book.positions.entry(key).or_default().extend(moves);
        }
        Ok(book)
    }

    pub fn load(path: &Path) -> Result<Self, BookError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Adds every move of a line, each keyed by the moves before it.
    pub fn add_line(&mut self, line: &str) {
        let mut history: Vec<&str> = Vec::new();
        for mv in line.split_whitespace() {
            self.positions
                .entry(history.join(" "))
                .or_default()
                .insert(mv.to_string());
            history.push(mv);
        }
    }

    /// Returns true if `mv` is a book move after `history`.
    #[must_use]
    pub fn contains<S: AsRef<str>>(&self, history: &[S], mv: &str) -> bool {
        let key = history
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(" ");
        self.positions
            .get(&key)
            .is_some_and(|moves| moves.contains(mv))
    }

    /// Returns the number of positions in the book.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns true if the book is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

fn normalize(history: &str) -> String {
    history.split_whitespace().collect::<Vec<_>>().join(" ")
}
