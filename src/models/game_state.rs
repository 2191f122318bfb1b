use chess::{Color, Piece};
use serde::{Deserialize, Serialize};

use crate::game::rules::STARTING_FEN;
use crate::game::utils::piece_symbol;

/// Pieces removed from the board, keyed by the side that captured them
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedPieces {
    #[serde(default)]
    pub white: Vec<String>,
    #[serde(default)]
    pub black: Vec<String>,
}

impl CapturedPieces {
    /// Record `piece` (owned by `owner`) as taken by `by`
    pub fn record(&mut self, by: Color, piece: Piece, owner: Color) {
        let symbol = piece_symbol(piece, owner);
        match by {
            Color::White => self.white.push(symbol),
            Color::Black => self.black.push(symbol),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.white.is_empty() && self.black.is_empty()
    }
}

/// Persisted record for one browser session
///
/// `position` is authoritative for rendering; `initial_position` plus `moves`
/// must replay to it, which is what keeps the side to move consistent with the
/// number of plies played.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GameSession {
    pub initial_position: String,
    pub position: String,
    /// Plies since `initial_position`, in UCI form
    #[serde(default)]
    pub moves: Vec<String>,
    /// SAN of each move, as displayed
    #[serde(default)]
    pub move_history: Vec<String>,
    #[serde(default)]
    pub captured_pieces: CapturedPieces,
    #[serde(default)]
    pub special_moves: Vec<String>,
    /// Set by position injection; the next page load keeps the session
    #[serde(default)]
    pub preserve_on_load: bool,
}

impl GameSession {
    pub fn new() -> Self {
        Self::from_position(STARTING_FEN.to_string())
    }

    /// Session starting from an arbitrary position with nothing played yet
    pub fn from_position(fen: String) -> Self {
        GameSession {
            initial_position: fen.clone(),
            position: fen,
            moves: Vec::new(),
            move_history: Vec::new(),
            captured_pieces: CapturedPieces::default(),
            special_moves: Vec::new(),
            preserve_on_load: false,
        }
    }

    /// Back to the canonical starting position
    pub fn reset(&mut self) {
        *self = GameSession::new();
    }
}

impl Default for GameSession {
    fn default() -> Self {
        GameSession::new()
    }
}
