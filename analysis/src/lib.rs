//! Pure scoring: the win-probability model, the move-quality classifier,
//! and per-ply evaluation of a whole game. No I/O, no async, no engine.

pub mod classify;
pub mod game;
pub mod score;

pub use classify::{classify, Label, BOOK_MOVE_WINDOW};
pub use game::{evaluate_game, is_white_ply, MoveEvaluation, PositionEval};
pub use score::win_probability;
