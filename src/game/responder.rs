use std::sync::Mutex;

use chess::{Board, ChessMove};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::game::rules::legal_moves;

/// Chooses the automated side's reply
///
/// Implementations must only return moves from the legal-move set of `board`,
/// and `None` only when that set is empty.
pub trait Responder: Send + Sync {
    fn select_move(&self, board: &Board) -> Option<ChessMove>;
}

/// Uniform pick over the legal moves of `board`
pub fn pick_random<R: Rng + ?Sized>(board: &Board, rng: &mut R) -> Option<ChessMove> {
    legal_moves(board).choose(rng).copied()
}

/// Baseline responder: any legal move, chosen uniformly
pub struct RandomResponder {
    rng: Mutex<StdRng>,
}

impl RandomResponder {
    pub fn new() -> Self {
        RandomResponder {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible sequence of choices for a given seed
    pub fn seeded(seed: u64) -> Self {
        RandomResponder {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomResponder {
    fn default() -> Self {
        RandomResponder::new()
    }
}

impl Responder for RandomResponder {
    fn select_move(&self, board: &Board) -> Option<ChessMove> {
        // A poisoned lock still holds a usable generator
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        pick_random(board, &mut *rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn always_picks_a_legal_move() {
        let responder = RandomResponder::seeded(7);
        let mut board = Board::default();
        for _ in 0..40 {
            let Some(mv) = responder.select_move(&board) else {
                break;
            };
            assert!(board.legal(mv));
            board = board.make_move_new(mv);
        }
    }

    #[test]
    fn same_seed_same_choices() {
        let board = Board::default();
        let first = RandomResponder::seeded(42);
        let second = RandomResponder::seeded(42);
        for _ in 0..10 {
            assert_eq!(first.select_move(&board), second.select_move(&board));
        }
    }

    #[test]
    fn no_move_when_mated() {
        let mated =
            Board::from_str("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3").unwrap();
        assert_eq!(RandomResponder::seeded(1).select_move(&mated), None);
    }

    #[test]
    fn no_move_when_stalemated() {
        let stalemate = Board::from_str("7k/8/6QK/8/8/8/8/8 b - - 0 1").unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(pick_random(&stalemate, &mut rng), None);
    }
}
