//! UCI info line types.

/// Score in centipawns or mate distance, relative to the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    /// Centipawn score (100 = 1 pawn advantage).
    Cp(i32),
    /// Mate in N moves (positive = side to move mates, negative = side to move is mated).
    Mate(i32),
}

/// Search information from engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineInfo {
    /// Search depth in plies.
    pub depth: Option<u32>,
    /// Selective search depth.
    pub seldepth: Option<u32>,
    /// Rank of this line in multi-PV mode (1 = best).
    pub multipv: Option<u32>,
    /// Score evaluation.
    pub score: Option<Score>,
    /// Nodes searched.
    pub nodes: Option<u64>,
    /// Nodes per second.
    pub nps: Option<u64>,
    /// Time spent in milliseconds.
    pub time: Option<u64>,
    /// Principal variation (best line found).
    pub pv: Vec<String>,
    /// Arbitrary string info.
    pub string: Option<String>,
}

impl EngineInfo {
    /// Create a new empty info.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rank of this line, defaulting to 1 when the engine omits `multipv`.
    pub fn rank(&self) -> u32 {
        self.multipv.unwrap_or(1)
    }

    /// Format as UCI info string.
    pub fn to_uci(&self) -> String {
        let mut parts = vec!["info".to_string()];

        if let Some(d) = self.depth {
            parts.push(format!("depth {}", d));
        }
        if let Some(d) = self.seldepth {
            parts.push(format!("seldepth {}", d));
        }
        if let Some(k) = self.multipv {
            parts.push(format!("multipv {}", k));
        }
        if let Some(ref s) = self.score {
            match s {
                Score::Cp(cp) => parts.push(format!("score cp {}", cp)),
                Score::Mate(m) => parts.push(format!("score mate {}", m)),
            }
        }
        if let Some(n) = self.nodes {
            parts.push(format!("nodes {}", n));
        }
        if let Some(n) = self.nps {
            parts.push(format!("nps {}", n));
        }
        if let Some(t) = self.time {
            parts.push(format!("time {}", t));
        }
        if !self.pv.is_empty() {
            parts.push(format!("pv {}", self.pv.join(" ")));
        }
        if let Some(ref s) = self.string {
            parts.push(format!("string {}", s));
        }

        parts.join(" ")
    }

    /// Parse UCI info line.
    ///
    /// Returns `None` if the line is not an info line, or if its `score` or
    /// `multipv` value is not numeric. Other malformed counters are ignored.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let mut parts = line.split_whitespace();
        if parts.next() != Some("info") {
            return None;
        }

        let mut info = EngineInfo::new();
        let parts: Vec<&str> = parts.collect();
        let mut i = 0;

        while i < parts.len() {
            match parts[i] {
                "depth" => {
                    i += 1;
                    if i < parts.len() {
                        info.depth = parts[i].parse().ok();
                    }
                }
                "seldepth" => {
                    i += 1;
                    if i < parts.len() {
                        info.seldepth = parts[i].parse().ok();
                    }
                }
                "multipv" => {
                    i += 1;
                    let rank: u32 = parts.get(i)?.parse().ok()?;
                    info.multipv = Some(rank);
                }
                "score" => {
                    i += 1;
                    let kind = *parts.get(i)?;
                    i += 1;
                    let value: i32 = parts.get(i)?.parse().ok()?;
                    info.score = match kind {
                        "cp" => Some(Score::Cp(value)),
                        "mate" => Some(Score::Mate(value)),
                        _ => return None,
                    };
                }
                // Bound qualifiers follow the score; the value is kept as reported.
                "lowerbound" | "upperbound" => {}
                "nodes" => {
                    i += 1;
                    if i < parts.len() {
                        info.nodes = parts[i].parse().ok();
                    }
                }
                "nps" => {
                    i += 1;
                    if i < parts.len() {
                        info.nps = parts[i].parse().ok();
                    }
                }
                "time" => {
                    i += 1;
                    if i < parts.len() {
                        info.time = parts[i].parse().ok();
                    }
                }
                "pv" => {
                    i += 1;
                    // Collect all remaining moves until another keyword or end
                    while i < parts.len() && !is_info_keyword(parts[i]) {
                        info.pv.push(parts[i].to_string());
                        i += 1;
                    }
                    continue;
                }
                "string" => {
                    // Rest of line is the string
                    info.string = Some(parts[i + 1..].join(" "));
                    break;
                }
                _ => {}
            }
            i += 1;
        }

        Some(info)
    }
}

fn is_info_keyword(s: &str) -> bool {
    matches!(
        s,
        "depth"
            | "seldepth"
            | "multipv"
            | "score"
            | "nodes"
            | "nps"
            | "time"
            | "pv"
            | "currmove"
            | "currmovenumber"
            | "hashfull"
            | "tbhits"
            | "string"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builder for constructing EngineInfo.
    #[derive(Default)]
    struct InfoBuilder {
        info: EngineInfo,
    }

    impl InfoBuilder {
        fn new() -> Self {
            Self::default()
        }

        fn depth(mut self, d: u32) -> Self {
            self.info.depth = Some(d);
            self
        }

        fn multipv(mut self, rank: u32) -> Self {
            self.info.multipv = Some(rank);
            self
        }

        fn score_cp(mut self, cp: i32) -> Self {
            self.info.score = Some(Score::Cp(cp));
            self
        }

        fn score_mate(mut self, moves: i32) -> Self {
            self.info.score = Some(Score::Mate(moves));
            self
        }

        fn nodes(mut self, n: u64) -> Self {
            self.info.nodes = Some(n);
            self
        }

        fn pv<S: Into<String>>(mut self, moves: impl IntoIterator<Item = S>) -> Self {
            self.info.pv = moves.into_iter().map(Into::into).collect();
            self
        }

        fn build(self) -> EngineInfo {
            self.info
        }
    }

    #[test]
    fn info_to_uci() {
        let info = InfoBuilder::new()
            .depth(10)
            .multipv(2)
            .score_cp(35)
            .nodes(50000)
            .pv(["e2e4", "e7e5"])
            .build();

        let uci = info.to_uci();
        assert!(uci.contains("depth 10"));
        assert!(uci.contains("multipv 2"));
        assert!(uci.contains("score cp 35"));
        assert!(uci.contains("nodes 50000"));
        assert!(uci.contains("pv e2e4 e7e5"));
    }

    #[test]
    fn mate_info_parses_back() {
        let info = InfoBuilder::new()
            .depth(18)
            .score_mate(-3)
            .pv(["h7h6", "d1h5"])
            .build();

        let parsed = EngineInfo::parse(&info.to_uci()).unwrap();
        assert_eq!(parsed.score, Some(Score::Mate(-3)));
        assert_eq!(parsed.pv, vec!["h7h6", "d1h5"]);
        assert_eq!(parsed.rank(), 1);
    }

    #[test]
    fn parse_info() {
        let line = "info depth 12 score cp 30 nodes 125000 nps 500000 pv e2e4 e7e5 g1f3";
        let info = EngineInfo::parse(line).unwrap();

        assert_eq!(info.depth, Some(12));
        assert_eq!(info.score, Some(Score::Cp(30)));
        assert_eq!(info.nodes, Some(125000));
        assert_eq!(info.nps, Some(500000));
        assert_eq!(info.pv, vec!["e2e4", "e7e5", "g1f3"]);
        assert_eq!(info.rank(), 1);
    }

    #[test]
    fn parse_multipv_rank() {
        let line = "info depth 18 seldepth 24 multipv 3 score cp -12 nodes 900 pv d2d4 d7d5";
        let info = EngineInfo::parse(line).unwrap();

        assert_eq!(info.multipv, Some(3));
        assert_eq!(info.rank(), 3);
        assert_eq!(info.score, Some(Score::Cp(-12)));
        assert_eq!(info.pv, vec!["d2d4", "d7d5"]);
    }

    #[test]
    fn parse_mate_score() {
        let line = "info depth 20 score mate -3 pv e2e4";
        let info = EngineInfo::parse(line).unwrap();

        assert_eq!(info.score, Some(Score::Mate(-3)));
    }

    #[test]
    fn parse_bounded_score() {
        let line = "info depth 9 multipv 1 score cp 41 lowerbound nodes 3000 pv g1f3";
        let info = EngineInfo::parse(line).unwrap();

        assert_eq!(info.score, Some(Score::Cp(41)));
        assert_eq!(info.nodes, Some(3000));
        assert_eq!(info.pv, vec!["g1f3"]);
    }

    #[test]
    fn non_numeric_score_is_rejected() {
        assert!(EngineInfo::parse("info depth 5 score cp abc pv e2e4").is_none());
        assert!(EngineInfo::parse("info depth 5 score mate pv e2e4").is_none());
        assert!(EngineInfo::parse("info depth 5 multipv x score cp 3 pv e2e4").is_none());
    }

    #[test]
    fn pv_stops_at_next_keyword() {
        let line = "info depth 7 pv e2e4 e7e5 currmove g1f3 currmovenumber 2";
        let info = EngineInfo::parse(line).unwrap();
        assert_eq!(info.pv, vec!["e2e4", "e7e5"]);
    }

    #[test]
    fn parse_string_tail() {
        let info = EngineInfo::parse("info string NNUE evaluation enabled").unwrap();
        assert_eq!(info.string.as_deref(), Some("NNUE evaluation enabled"));
        assert!(info.score.is_none());
    }

    #[test]
    fn non_info_lines_are_ignored() {
        assert!(EngineInfo::parse("bestmove e2e4").is_none());
        assert!(EngineInfo::parse("information overload").is_none());
        assert!(EngineInfo::parse("").is_none());
    }
}
