//! UCI (Universal Chess Interface) protocol parsing for analysis clients.
//!
//! This crate covers the client side of the protocol: formatting the
//! commands an analysis client sends, and reading back what the engine
//! prints, including ranked multi-PV output.
//!
//! # Commands sent
//!
//! - `uci` / `isready` - Handshake and synchronization
//! - `setoption name MultiPV value <k>` - Number of ranked lines
//! - `position fen <fen>` - Set position
//! - `go depth <d>` - Start a bounded search
//! - `quit` - Exit engine
//!
//! # Output read
//!
//! - `info ... multipv <k> score cp|mate <x> ... pv <moves>` - Search progress
//! - `bestmove <move> [ponder <move>]` - Search completion

mod command;
mod info;
mod multipv;

pub use command::{EngineCommand, GoOptions};
pub use info::{EngineInfo, Score};
pub use multipv::{MultiPvCollector, PvLine, SearchOutcome, DEFAULT_PV_PLIES};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum UciError {
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Messages sent from engine to client.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineMessage {
    /// Engine identification.
    Id { name: Option<String>, author: Option<String> },
    /// UCI initialization complete.
    UciOk,
    /// Engine is ready.
    ReadyOk,
    /// Search information.
    Info(EngineInfo),
    /// Best move found. `mv` is `None` when the engine reports `(none)`.
    BestMove {
        mv: Option<String>,
        ponder: Option<String>,
    },
}

impl EngineMessage {
    /// Parse one line of engine output.
    ///
    /// Returns `None` for lines that are not understood, including info
    /// lines with a non-numeric score.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let mut parts = line.split_whitespace();

        match parts.next()? {
            "uciok" => Some(EngineMessage::UciOk),
            "readyok" => Some(EngineMessage::ReadyOk),
            "info" => EngineInfo::parse(line).map(EngineMessage::Info),
            "id" => match parts.next()? {
                "name" => Some(EngineMessage::Id {
                    name: Some(parts.collect::<Vec<_>>().join(" ")),
                    author: None,
                }),
                "author" => Some(EngineMessage::Id {
                    name: None,
                    author: Some(parts.collect::<Vec<_>>().join(" ")),
                }),
                _ => None,
            },
            "bestmove" => {
                let mv = parts
                    .next()
                    .filter(|m| *m != "(none)" && *m != "0000")
                    .map(str::to_string);
                let ponder = match parts.next() {
                    Some("ponder") => parts.next().map(str::to_string),
                    _ => None,
                };
                Some(EngineMessage::BestMove { mv, ponder })
            }
            _ => None,
        }
    }

    /// Format message for output.
    pub fn to_uci(&self) -> String {
        match self {
            EngineMessage::Id { name, author } => {
                let mut parts = Vec::new();
                if let Some(n) = name {
                    parts.push(format!("id name {}", n));
                }
                if let Some(a) = author {
                    parts.push(format!("id author {}", a));
                }
                parts.join("\n")
            }
            EngineMessage::UciOk => "uciok".to_string(),
            EngineMessage::ReadyOk => "readyok".to_string(),
            EngineMessage::Info(info) => info.to_uci(),
            EngineMessage::BestMove { mv, ponder } => {
                let mv = mv.as_deref().unwrap_or("(none)");
                match ponder {
                    Some(p) => format!("bestmove {} ponder {}", mv, p),
                    None => format!("bestmove {}", mv),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bestmove_with_ponder() {
        assert_eq!(
            EngineMessage::parse("bestmove e2e4 ponder e7e5"),
            Some(EngineMessage::BestMove {
                mv: Some("e2e4".to_string()),
                ponder: Some("e7e5".to_string())
            })
        );
    }

    #[test]
    fn parse_bestmove_none() {
        assert_eq!(
            EngineMessage::parse("bestmove (none)"),
            Some(EngineMessage::BestMove {
                mv: None,
                ponder: None
            })
        );
    }

    #[test]
    fn parse_handshake_lines() {
        assert_eq!(EngineMessage::parse("uciok"), Some(EngineMessage::UciOk));
        assert_eq!(EngineMessage::parse(" readyok \n"), Some(EngineMessage::ReadyOk));
        assert_eq!(
            EngineMessage::parse("id name Stockfish 16"),
            Some(EngineMessage::Id {
                name: Some("Stockfish 16".to_string()),
                author: None
            })
        );
    }

    #[test]
    fn unknown_lines_are_none() {
        assert_eq!(EngineMessage::parse("option name Hash type spin"), None);
        assert_eq!(EngineMessage::parse(""), None);
    }

    #[test]
    fn bestmove_to_uci_round_trips() {
        let msg = EngineMessage::BestMove {
            mv: Some("g1f3".to_string()),
            ponder: None,
        };
        assert_eq!(EngineMessage::parse(&msg.to_uci()), Some(msg));
    }

    #[test]
    fn uci_error_display() {
        let err = UciError::ParseError("bad token".to_string());
        assert_eq!(err.to_string(), "Parse error: bad token");
    }
}
