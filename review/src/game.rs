//! Whole-game review: evaluate every position of a game and judge each
//! played move.

use crate::session::AnalysisSession;
use analysis::{evaluate_game, MoveEvaluation, PositionEval};
use cozy_chess::Move;
use engine::Evaluation;

/// Evaluate the start position and the position after every ply, then
/// classify each move. `moves` is the game in played order.
///
/// Evaluations come back from the engine relative to the side to move;
/// they are flipped to White's perspective before classification, with
/// mate scores saturated onto the centipawn scale.
pub async fn review_game(
    session: &mut AnalysisSession,
    moves: &[Move],
    depth: u32,
) -> Vec<MoveEvaluation> {
    let mut evals = Vec::with_capacity(moves.len() + 1);
    for ply in 0..=moves.len() {
        let eval = session.analyze_from_moves(&moves[..ply], depth).await;
        // After an even number of plies it is White's turn again.
        let white_to_move = ply % 2 == 0;
        evals.push(position_eval(&eval, white_to_move));
    }
    evaluate_game(&evals)
}

/// Convert a side-to-move evaluation into a White-perspective entry.
fn position_eval(eval: &Evaluation, white_to_move: bool) -> PositionEval {
    // The depth-0 placeholder carries no information; report the position
    // as unevaluated rather than as dead even.
    if eval.depth == 0 && eval.best_move.is_none() {
        return PositionEval::default();
    }
    let score = if white_to_move {
        eval.score
    } else {
        eval.score.negate()
    };
    PositionEval {
        cp: Some(score.to_cp()),
        mate: score.mate_distance(),
    }
}
