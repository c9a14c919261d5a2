//! Move-quality classification from consecutive centipawn evaluations.

use serde::{Deserialize, Serialize};

/// Quality judgment for a single played move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Book,
    Best,
    Great,
    Excellent,
    Good,
    Inaccuracy,
    Mistake,
    Blunder,
    /// No judgment possible (an evaluation is missing).
    Normal,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Book => "book",
            Self::Best => "best",
            Self::Great => "great",
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Inaccuracy => "inaccuracy",
            Self::Mistake => "mistake",
            Self::Blunder => "blunder",
            Self::Normal => "normal",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Moves up to this move number are opening theory and exempt from judgment.
pub const BOOK_MOVE_WINDOW: u32 = 10;

/// Classify a move from the evaluations before and after it.
///
/// Both evaluations are centipawns from White's perspective; mate scores
/// must already be saturated onto the centipawn scale by the caller.
/// Centipawn loss is computed from the mover's perspective, then mapped
/// through inclusive-upper-bound bands, lowest band first.
pub fn classify(
    prev_eval: Option<i32>,
    curr_eval: Option<i32>,
    is_white_to_move: bool,
    move_number: u32,
) -> Label {
    if move_number <= BOOK_MOVE_WINDOW {
        return Label::Book;
    }

    let (prev, curr) = match (prev_eval, curr_eval) {
        (Some(prev), Some(curr)) => (prev, curr),
        _ => return Label::Normal,
    };

    let cp_loss = if is_white_to_move {
        prev - curr
    } else {
        curr - prev
    };

    match cp_loss {
        loss if loss <= 0 => Label::Best,
        loss if loss <= 10 => Label::Great,
        loss if loss <= 25 => Label::Excellent,
        loss if loss <= 50 => Label::Good,
        loss if loss <= 100 => Label::Inaccuracy,
        loss if loss <= 250 => Label::Mistake,
        _ => Label::Blunder,
    }
}
