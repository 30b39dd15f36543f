//! UCI commands sent to an analysis engine.

use crate::UciError;

/// Commands sent from the analysis client to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    /// Initialize UCI mode.
    Uci,
    /// Check if engine is ready.
    IsReady,
    /// Reset engine state for a new game.
    UciNewGame,
    /// Set an engine option.
    SetOption { name: String, value: String },
    /// Set up position.
    Position {
        fen: Option<String>,
        moves: Vec<String>,
    },
    /// Start calculating.
    Go(GoOptions),
    /// Stop calculating.
    Stop,
    /// Quit the engine.
    Quit,
    /// Unknown command (for forward compatibility).
    Unknown(String),
}

/// Options for the `go` command.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GoOptions {
    /// Search to this depth.
    pub depth: Option<u32>,
    /// Search this many nodes.
    pub nodes: Option<u64>,
    /// Search for exactly this time in milliseconds.
    pub movetime: Option<u64>,
    /// Search indefinitely until `stop`.
    pub infinite: bool,
}

impl GoOptions {
    /// Fixed-depth search.
    pub fn depth(depth: u32) -> Self {
        Self {
            depth: Some(depth),
            ..Self::default()
        }
    }
}

impl EngineCommand {
    /// `setoption name MultiPV value <k>`.
    pub fn multi_pv(lines: u32) -> Self {
        EngineCommand::SetOption {
            name: "MultiPV".to_string(),
            value: lines.to_string(),
        }
    }

    /// `position fen <fen>`.
    pub fn position_fen(fen: impl Into<String>) -> Self {
        EngineCommand::Position {
            fen: Some(fen.into()),
            moves: Vec::new(),
        }
    }

    /// Format the command as a UCI line (without trailing newline).
    pub fn to_uci(&self) -> String {
        match self {
            EngineCommand::Uci => "uci".to_string(),
            EngineCommand::IsReady => "isready".to_string(),
            EngineCommand::UciNewGame => "ucinewgame".to_string(),
            EngineCommand::SetOption { name, value } => {
                format!("setoption name {} value {}", name, value)
            }
            EngineCommand::Position { fen, moves } => {
                let mut line = match fen {
                    Some(fen) => format!("position fen {}", fen),
                    None => "position startpos".to_string(),
                };
                if !moves.is_empty() {
                    line.push_str(" moves ");
                    line.push_str(&moves.join(" "));
                }
                line
            }
            EngineCommand::Go(opts) => {
                let mut parts = vec!["go".to_string()];
                if let Some(d) = opts.depth {
                    parts.push(format!("depth {}", d));
                }
                if let Some(n) = opts.nodes {
                    parts.push(format!("nodes {}", n));
                }
                if let Some(t) = opts.movetime {
                    parts.push(format!("movetime {}", t));
                }
                if opts.infinite {
                    parts.push("infinite".to_string());
                }
                parts.join(" ")
            }
            EngineCommand::Stop => "stop".to_string(),
            EngineCommand::Quit => "quit".to_string(),
            EngineCommand::Unknown(raw) => raw.clone(),
        }
    }

    /// Parse a UCI command string.
    pub fn parse(input: &str) -> Result<Self, UciError> {
        let input = input.trim();
        let mut parts = input.split_whitespace();

        let cmd = parts.next().unwrap_or("");

        match cmd {
            "uci" => Ok(EngineCommand::Uci),
            "isready" => Ok(EngineCommand::IsReady),
            "ucinewgame" => Ok(EngineCommand::UciNewGame),
            "stop" => Ok(EngineCommand::Stop),
            "quit" => Ok(EngineCommand::Quit),
            "setoption" => Self::parse_setoption(parts),
            "position" => Self::parse_position(parts),
            "go" => Self::parse_go(parts),
            "" => Err(UciError::InvalidCommand("empty command".to_string())),
            _ => Ok(EngineCommand::Unknown(input.to_string())),
        }
    }

    fn parse_setoption<'a>(parts: impl Iterator<Item = &'a str>) -> Result<Self, UciError> {
        let parts: Vec<&str> = parts.collect();
        let name_at = parts.iter().position(|&s| s == "name");
        let value_at = parts.iter().position(|&s| s == "value");

        match (name_at, value_at) {
            (Some(n), Some(v)) if n < v => Ok(EngineCommand::SetOption {
                name: parts[n + 1..v].join(" "),
                value: parts[v + 1..].join(" "),
            }),
            (Some(n), None) => Ok(EngineCommand::SetOption {
                name: parts[n + 1..].join(" "),
                value: String::new(),
            }),
            _ => Err(UciError::ParseError(
                "Expected 'setoption name <id> [value <x>]'".to_string(),
            )),
        }
    }

    fn parse_position<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Self, UciError> {
        let mut fen = None;

        match parts.next() {
            Some("startpos") => {}
            Some("fen") => {
                // Collect FEN parts until "moves" or end
                let mut fen_parts = Vec::new();
                for part in parts.by_ref() {
                    if part == "moves" {
                        break;
                    }
                    fen_parts.push(part);
                }
                if !fen_parts.is_empty() {
                    fen = Some(fen_parts.join(" "));
                }
            }
            Some(other) => {
                return Err(UciError::ParseError(format!(
                    "Expected 'startpos' or 'fen', got '{}'",
                    other
                )));
            }
            None => {
                return Err(UciError::ParseError(
                    "Expected 'startpos' or 'fen'".to_string(),
                ));
            }
        }

        let remaining: Vec<&str> = parts.collect();
        let moves = match remaining.iter().position(|&s| s == "moves") {
            Some(idx) => remaining[idx + 1..].iter().map(|s| s.to_string()).collect(),
            // FEN case already consumed "moves" in the loop
            None if fen.is_some() => remaining.iter().map(|s| s.to_string()).collect(),
            None => Vec::new(),
        };

        Ok(EngineCommand::Position { fen, moves })
    }

    fn parse_go<'a>(parts: impl Iterator<Item = &'a str>) -> Result<Self, UciError> {
        let mut opts = GoOptions::default();
        let parts: Vec<&str> = parts.collect();
        let mut i = 0;

        while i < parts.len() {
            match parts[i] {
                "depth" => {
                    i += 1;
                    if i < parts.len() {
                        opts.depth = parts[i].parse().ok();
                    }
                }
                "nodes" => {
                    i += 1;
                    if i < parts.len() {
                        opts.nodes = parts[i].parse().ok();
                    }
                }
                "movetime" => {
                    i += 1;
                    if i < parts.len() {
                        opts.movetime = parts[i].parse().ok();
                    }
                }
                "infinite" => {
                    opts.infinite = true;
                }
                _ => {}
            }
            i += 1;
        }

        Ok(EngineCommand::Go(opts))
    }
}
