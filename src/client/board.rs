use std::str::FromStr;

use chess::{Board, ChessMove, Color, Piece, Square};

use crate::errors::ClientError;
use crate::game::rules::check_placement;
use crate::game::utils::piece_symbol;

/// The four piece kinds offered by the promotion dialog, in display order
pub const PROMOTION_CHOICES: [Piece; 4] = [Piece::Queen, Piece::Rook, Piece::Bishop, Piece::Knight];

/// Piece placement as the client currently draws it
///
/// This is only what the user sees. It may run ahead of the server while a
/// move is in flight and is overwritten by every committed reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderedBoard {
    squares: [Option<(Piece, Color)>; 64],
}

impl RenderedBoard {
    pub fn empty() -> Self {
        RenderedBoard { squares: [None; 64] }
    }

    /// Read the placement field of a FEN; the remaining fields are ignored
    pub fn from_fen(fen: &str) -> Result<Self, ClientError> {
        let invalid = || ClientError::InvalidPosition(fen.to_string());
        let placement = fen.split_whitespace().next().ok_or_else(invalid)?;
        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            return Err(invalid());
        }

        let mut board = RenderedBoard::empty();
        // FEN lists rank 8 first
        for (row, rank_text) in ranks.iter().enumerate() {
            let rank = 7 - row;
            let mut file = 0usize;
            for c in rank_text.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file += skip as usize;
                    continue;
                }
                let piece = piece_from_char(c).ok_or_else(invalid)?;
                if file > 7 {
                    return Err(invalid());
                }
                board.squares[rank * 8 + file] = Some(piece);
                file += 1;
            }
            if file != 8 {
                return Err(invalid());
            }
        }
        Ok(board)
    }

    pub fn piece_at(&self, square: Square) -> Option<(Piece, Color)> {
        self.squares[square.to_index()]
    }

    /// Optimistic rendering of a drop; the server reply fixes up castling and en passant
    pub fn move_piece(&mut self, from: Square, to: Square, promotion: Option<Piece>) {
        if let Some((piece, color)) = self.squares[from.to_index()].take() {
            self.squares[to.to_index()] = Some((promotion.unwrap_or(piece), color));
        }
    }

    /// FEN placement field
    pub fn placement(&self) -> String {
        let mut out = String::with_capacity(72);
        for rank in (0..8).rev() {
            let mut gap = 0;
            for file in 0..8 {
                match self.squares[rank * 8 + file] {
                    Some((piece, color)) => {
                        if gap > 0 {
                            out.push_str(&gap.to_string());
                            gap = 0;
                        }
                        out.push_str(&piece_symbol(piece, color));
                    }
                    None => gap += 1,
                }
            }
            if gap > 0 {
                out.push_str(&gap.to_string());
            }
            if rank > 0 {
                out.push('/');
            }
        }
        out
    }

    /// Rules-engine view of this placement with `side` to move, if it is a legal position
    fn to_board(&self, side: Color) -> Option<Board> {
        let side = match side {
            Color::White => 'w',
            Color::Black => 'b',
        };
        let placement = self.placement();
        check_placement(&placement).ok()?;
        Board::from_str(&format!("{} {} - - 0 1", placement, side)).ok()
    }
}

fn piece_from_char(c: char) -> Option<(Piece, Color)> {
    let color = if c.is_ascii_uppercase() { Color::White } else { Color::Black };
    let piece = match c.to_ascii_lowercase() {
        'p' => Piece::Pawn,
        'n' => Piece::Knight,
        'b' => Piece::Bishop,
        'r' => Piece::Rook,
        'q' => Piece::Queen,
        'k' => Piece::King,
        _ => return None,
    };
    Some((piece, color))
}

/// Local guess at whether dropping `from` onto `to` needs a promotion choice
///
/// True only for a pawn stepping onto its far rank, either straight onto an
/// empty square or diagonally onto an opposing piece, that also leaves its own
/// king safe on the rendered placement. A diagonal step onto an empty square is
/// never a promotion. Never true for a move the rules engine would refuse;
/// anything it cannot judge answers false.
pub fn needs_promotion(board: &RenderedBoard, from: Square, to: Square) -> bool {
    let color = match board.piece_at(from) {
        Some((Piece::Pawn, color)) => color,
        _ => return false,
    };
    let (far_rank, step) = match color {
        Color::White => (7, 1),
        Color::Black => (0, -1),
    };
    let to_rank = to.get_rank().to_index() as i32;
    let from_rank = from.get_rank().to_index() as i32;
    if to_rank != far_rank || to_rank - from_rank != step {
        return false;
    }

    let file_delta = (to.get_file().to_index() as i32 - from.get_file().to_index() as i32).abs();
    let shaped = match (file_delta, board.piece_at(to)) {
        (0, None) => true,
        (1, Some((_, target_color))) => target_color != color,
        _ => false,
    };
    if !shaped {
        return false;
    }

    // Pins and checks
    board
        .to_board(color)
        .map(|b| b.legal(ChessMove::new(from, to, Some(Piece::Queen))))
        .unwrap_or(false)
}
