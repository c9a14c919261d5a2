//! Per-ply move evaluation for a whole game.

use crate::classify::{classify, Label};
use serde::Serialize;

/// Evaluation of one position, from White's perspective. `cp` carries the
/// already-saturated centipawn value even for mate scores; `mate` keeps the
/// signed ply-to-mate distance when one was reported.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionEval {
    pub cp: Option<i32>,
    pub mate: Option<i32>,
}

/// Quality judgment for one played ply.
#[derive(Debug, Clone, Serialize)]
pub struct MoveEvaluation {
    /// 1-indexed half-move number.
    pub ply: u32,
    /// 1-indexed full-move number.
    pub move_number: u32,
    pub eval_before: Option<i32>,
    pub eval_after: Option<i32>,
    pub mate_distance: Option<i32>,
    pub classification: Label,
}

/// Returns true if the given 1-indexed ply belongs to White.
/// Convention: odd plies (1, 3, 5, …) are White moves; even plies are Black.
pub fn is_white_ply(ply: u32) -> bool {
    ply % 2 == 1
}

/// Judge every played move from the position evaluations around it.
///
/// `evals` holds one entry per position: the start position first, then the
/// position after each ply, so N plies need N+1 entries.
pub fn evaluate_game(evals: &[PositionEval]) -> Vec<MoveEvaluation> {
    evals
        .windows(2)
        .enumerate()
        .map(|(i, pair)| {
            let ply = i as u32 + 1;
            let move_number = ply.div_ceil(2);
            MoveEvaluation {
                ply,
                move_number,
                eval_before: pair[0].cp,
                eval_after: pair[1].cp,
                mate_distance: pair[1].mate,
                classification: classify(
                    pair[0].cp,
                    pair[1].cp,
                    is_white_ply(ply),
                    move_number,
                ),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cp(value: i32) -> PositionEval {
        PositionEval {
            cp: Some(value),
            mate: None,
        }
    }

    #[test]
    fn ply_color_convention() {
        assert!(is_white_ply(1));
        assert!(!is_white_ply(2));
        assert!(is_white_ply(3));
    }

    #[test]
    fn empty_and_single_position_games_have_no_moves() {
        assert!(evaluate_game(&[]).is_empty());
        assert!(evaluate_game(&[cp(0)]).is_empty());
    }

    #[test]
    fn numbers_moves_by_pairs_of_plies() {
        let evals: Vec<PositionEval> = (0..=4).map(|_| cp(0)).collect();
        let moves = evaluate_game(&evals);
        assert_eq!(moves.len(), 4);
        assert_eq!(
            moves.iter().map(|m| (m.ply, m.move_number)).collect::<Vec<_>>(),
            vec![(1, 1), (2, 1), (3, 2), (4, 2)]
        );
    }

    #[test]
    fn classifies_each_ply_from_the_movers_perspective() {
        // 22 even positions to get past the book window, then White
        // blunders (+20 → -400) and Black converts (-400 → -420).
        let mut evals: Vec<PositionEval> = (0..21).map(|_| cp(20)).collect();
        evals.push(cp(-400));
        evals.push(cp(-420));
        let moves = evaluate_game(&evals);

        assert!(moves[..20].iter().all(|m| m.classification == Label::Book));
        let white_blunder = &moves[20];
        assert_eq!(white_blunder.ply, 21);
        assert!(is_white_ply(white_blunder.ply));
        assert_eq!(white_blunder.classification, Label::Blunder);
        let black_reply = &moves[21];
        assert_eq!(black_reply.classification, Label::Best);
    }

    #[test]
    fn carries_mate_distance_through() {
        let mut evals: Vec<PositionEval> = (0..21).map(|_| cp(0)).collect();
        evals.push(PositionEval {
            cp: Some(29_700),
            mate: Some(3),
        });
        let moves = evaluate_game(&evals);
        assert_eq!(moves.last().unwrap().mate_distance, Some(3));
    }
}
