//! Engine process driver: owns a UCI search-engine subprocess and translates
//! between typed commands/events and the engine's line-oriented text protocol.

pub mod process;
pub mod uci;

pub use process::{EngineConfig, UciProcess};
pub use uci::{UciError, UciMessage};

use cozy_chess::Move;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Commands sent to the engine
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Set the current position. `fen: None` means the standard start position.
    SetPosition { fen: Option<String>, moves: Vec<Move> },
    /// Start a depth-bounded search.
    Go { depth: u32 },
    /// Best-effort search interrupt.
    Stop,
    /// Run the engine's fixed built-in benchmark workload.
    Bench,
    Quit,
}

/// Events received from the engine
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Both handshake steps acknowledged; the engine accepts commands.
    HandshakeComplete,
    SearchProgress(SearchInfo),
    SearchComplete { best_move: Option<Move> },
    /// Benchmark workload finished with the reported throughput.
    Bench { nodes_per_second: u64 },
    /// A line the parser did not recognize. Never fatal.
    RawLine(String),
    /// Subprocess failed to start, crashed, or closed its output.
    Fault(String),
}

/// A snapshot of in-progress search output.
#[derive(Debug, Clone, Default)]
pub struct SearchInfo {
    pub depth: Option<u32>,
    pub seldepth: Option<u32>,
    pub time_ms: Option<u64>,
    pub nodes: Option<u64>,
    pub nps: Option<u64>,
    pub score: Option<Score>,
    /// Principal variation, best line first.
    pub pv: Vec<Move>,
}

/// Engine evaluation score.
///
/// Centipawns: positive = side-to-move is better.
/// Mate: positive N = side-to-move mates in N, negative N = side-to-move
/// gets mated in N.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Score {
    Centipawns(i32),
    Mate(i32),
}

impl Score {
    /// Convert to centipawns for comparison. Mate scores saturate onto the
    /// centipawn scale so that shorter mates compare as stronger.
    pub fn to_cp(&self) -> i32 {
        match self {
            Self::Centipawns(cp) => *cp,
            Self::Mate(m) => {
                if *m > 0 {
                    30000 - *m * 100
                } else {
                    -30000 - *m * 100
                }
            }
        }
    }

    /// Negate the score (flip perspective).
    pub fn negate(&self) -> Self {
        match self {
            Self::Centipawns(cp) => Self::Centipawns(-cp),
            Self::Mate(m) => Self::Mate(-m),
        }
    }

    pub fn mate_distance(&self) -> Option<i32> {
        match self {
            Self::Mate(m) => Some(*m),
            Self::Centipawns(_) => None,
        }
    }
}

impl Default for Score {
    fn default() -> Self {
        Self::Centipawns(0)
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Centipawns(cp) => write!(f, "{:+.2}", *cp as f64 / 100.0),
            Self::Mate(m) => {
                if *m > 0 {
                    write!(f, "+M{}", m)
                } else {
                    write!(f, "-M{}", m.abs())
                }
            }
        }
    }
}

/// The result of one completed (or timed-out) search.
///
/// `Default` is the neutral placeholder returned when nothing better is
/// known: depth 0, even score, no line.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Evaluation {
    pub depth: u32,
    pub score: Score,
    #[serde(serialize_with = "serialize_moves")]
    pub pv: Vec<Move>,
    #[serde(serialize_with = "serialize_opt_move")]
    pub best_move: Option<Move>,
}

impl Evaluation {
    /// Build an evaluation from the latest progress snapshot and the
    /// terminal best move.
    pub fn from_parts(info: Option<SearchInfo>, best_move: Option<Move>) -> Self {
        let info = info.unwrap_or_default();
        Self {
            depth: info.depth.unwrap_or(0),
            score: info.score.unwrap_or_default(),
            pv: info.pv,
            best_move,
        }
    }
}

fn serialize_moves<S: serde::Serializer>(moves: &[Move], s: S) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeSeq;
    let mut seq = s.serialize_seq(Some(moves.len()))?;
    for mv in moves {
        seq.serialize_element(&uci::format_uci_move(mv))?;
    }
    seq.end()
}

fn serialize_opt_move<S: serde::Serializer>(mv: &Option<Move>, s: S) -> Result<S::Ok, S::Error> {
    match mv {
        Some(mv) => s.serialize_some(&uci::format_uci_move(mv)),
        None => s.serialize_none(),
    }
}

/// Lifecycle state of the engine subprocess.
///
/// Commands other than the handshake are only accepted while `Ready` or
/// `Searching`. A `Faulted` engine accepts nothing further.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EngineState {
    Uninitialized = 0,
    HandshakeInProgress = 1,
    Ready = 2,
    Searching = 3,
    Faulted = 4,
}

/// Shared, lock-free view of [`EngineState`], updated by the I/O tasks.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(state: EngineState) -> Arc<Self> {
        Arc::new(Self(AtomicU8::new(state as u8)))
    }

    pub fn load(&self) -> EngineState {
        match self.0.load(Ordering::Acquire) {
            0 => EngineState::Uninitialized,
            1 => EngineState::HandshakeInProgress,
            2 => EngineState::Ready,
            3 => EngineState::Searching,
            _ => EngineState::Faulted,
        }
    }

    pub fn store(&self, state: EngineState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Whether the engine currently accepts protocol commands.
    pub fn accepts_commands(&self) -> bool {
        matches!(self.load(), EngineState::Ready | EngineState::Searching)
    }
}
