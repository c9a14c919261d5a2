use crate::uci::UciError;
use crate::{Score, SearchInfo};
use cozy_chess::Move;

/// Incoming message from the engine
#[derive(Debug, Clone)]
pub enum UciMessage {
    Id { name: String, value: String },
    UciOk,
    ReadyOk,
    BestMove { mv: Option<Move>, ponder: Option<Move> },
    Info(SearchInfo),
    /// Benchmark throughput line, e.g. `Nodes/second : 1234567`.
    NodesPerSecond(u64),
}

/// Parse one line of engine output.
///
/// Lines that match no known grammar come back as `UnknownMessage`; the
/// process layer forwards those as raw-line events rather than failing.
pub fn parse_uci_message(line: &str) -> Result<UciMessage, UciError> {
    if let Some(nps) = parse_bench_line(line) {
        return Ok(UciMessage::NodesPerSecond(nps));
    }

    let tokens: Vec<&str> = line.split_whitespace().collect();

    match tokens.first() {
        Some(&"uciok") => Ok(UciMessage::UciOk),
        Some(&"readyok") => Ok(UciMessage::ReadyOk),

        Some(&"id") => {
            if tokens.len() < 3 {
                return Err(UciError::MalformedMessage(line.to_string()));
            }
            Ok(UciMessage::Id {
                name: tokens[1].to_string(),
                value: tokens[2..].join(" "),
            })
        }

        Some(&"bestmove") => {
            if tokens.len() < 2 {
                return Err(UciError::MalformedMessage(line.to_string()));
            }
            // "(none)" from a stopped search without a move available.
            let mv = parse_uci_move(tokens[1]).ok();
            let ponder = if tokens.len() >= 4 && tokens[2] == "ponder" {
                parse_uci_move(tokens[3]).ok()
            } else {
                None
            };
            Ok(UciMessage::BestMove { mv, ponder })
        }

        Some(&"info") => Ok(UciMessage::Info(parse_info_line(&tokens[1..]))),

        _ => Err(UciError::UnknownMessage(line.to_string())),
    }
}

/// Parse an "info" line from the engine. Unknown keywords are skipped, so
/// the parser is total over anything that starts with "info".
fn parse_info_line(tokens: &[&str]) -> SearchInfo {
    let mut info = SearchInfo::default();
    let mut i = 0;

    while i < tokens.len() {
        match tokens[i] {
            "depth" => {
                i += 1;
                info.depth = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "seldepth" => {
                i += 1;
                info.seldepth = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "time" => {
                i += 1;
                info.time_ms = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "nodes" => {
                i += 1;
                info.nodes = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "nps" => {
                i += 1;
                info.nps = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "score" => {
                if let (Some(&kind), Some(value)) = (tokens.get(i + 1), tokens.get(i + 2)) {
                    info.score = match kind {
                        "cp" => value.parse().ok().map(Score::Centipawns),
                        "mate" => value.parse().ok().map(Score::Mate),
                        _ => None,
                    };
                    if info.score.is_some() {
                        i += 2;
                    }
                }
            }
            "pv" => {
                // Remainder of the line is the principal variation.
                info.pv = tokens[i + 1..]
                    .iter()
                    .filter_map(|s| parse_uci_move(s).ok())
                    .collect();
                break;
            }
            _ => {
                // Unknown keyword ("hashfull", "tbhits", ...) — skip.
            }
        }
        i += 1;
    }

    info
}

/// Recognize the benchmark throughput line. Stockfish prints
/// `Nodes/second    : 929680`; be lenient about spacing and case.
fn parse_bench_line(line: &str) -> Option<u64> {
    let (label, value) = line.split_once(':')?;
    if !label.trim().eq_ignore_ascii_case("nodes/second") {
        return None;
    }
    value.trim().parse().ok()
}

/// Parse UCI move format (e2e4, e7e8q)
pub fn parse_uci_move(s: &str) -> Result<Move, UciError> {
    s.parse().map_err(|_| UciError::InvalidMove(s.to_string()))
}

/// Format a move as a UCI token.
pub fn format_uci_move(mv: &Move) -> String {
    mv.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_handshake_acks() {
        assert!(matches!(parse_uci_message("uciok"), Ok(UciMessage::UciOk)));
        assert!(matches!(
            parse_uci_message("readyok"),
            Ok(UciMessage::ReadyOk)
        ));
    }

    #[test]
    fn parses_bestmove_with_ponder() {
        let msg = parse_uci_message("bestmove e2e4 ponder e7e5").unwrap();
        match msg {
            UciMessage::BestMove { mv, ponder } => {
                assert_eq!(format_uci_move(&mv.unwrap()), "e2e4");
                assert_eq!(format_uci_move(&ponder.unwrap()), "e7e5");
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn parses_bestmove_none() {
        let msg = parse_uci_message("bestmove (none)").unwrap();
        match msg {
            UciMessage::BestMove { mv, ponder } => {
                assert!(mv.is_none());
                assert!(ponder.is_none());
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn parses_info_line() {
        let msg =
            parse_uci_message("info depth 12 score cp 35 nodes 15234 nps 800000 pv e2e4 e7e5")
                .unwrap();
        match msg {
            UciMessage::Info(info) => {
                assert_eq!(info.depth, Some(12));
                assert!(matches!(info.score, Some(Score::Centipawns(35))));
                assert_eq!(info.nodes, Some(15234));
                assert_eq!(info.nps, Some(800000));
                assert_eq!(info.pv.len(), 2);
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn parses_mate_score() {
        let msg = parse_uci_message("info depth 20 score mate -3 pv g8f8").unwrap();
        match msg {
            UciMessage::Info(info) => {
                assert!(matches!(info.score, Some(Score::Mate(-3))));
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn info_with_unknown_keywords_still_parses() {
        let msg = parse_uci_message("info depth 8 hashfull 120 tbhits 0 score cp -14").unwrap();
        match msg {
            UciMessage::Info(info) => {
                assert_eq!(info.depth, Some(8));
                assert!(matches!(info.score, Some(Score::Centipawns(-14))));
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn parses_nodes_per_second_variants() {
        for line in [
            "Nodes/second    : 929680",
            "Nodes/second: 2100000",
            "nodes/second :1",
        ] {
            assert!(
                matches!(parse_uci_message(line), Ok(UciMessage::NodesPerSecond(_))),
                "failed on {line:?}"
            );
        }
        assert_eq!(
            match parse_uci_message("Nodes/second : 929680").unwrap() {
                UciMessage::NodesPerSecond(n) => n,
                _ => panic!(),
            },
            929680
        );
    }

    #[test]
    fn garbage_is_unknown_not_fatal() {
        for line in ["", "Stockfish 16 by the Stockfish developers", "option name Hash type spin", "%%%"] {
            assert!(parse_uci_message(line).is_err());
        }
    }
}
