//! Adapter over the `chess` crate.
//!
//! The crate answers legality and board status. Everything it does not track
//! (move counters, SAN, special-move kinds, captured pieces) is derived here
//! from the position before the move.

use std::fmt;
use std::str::FromStr;

use chess::{Board, BoardStatus, ChessMove, Color, File, MoveGen, Piece, Rank, Square};

use crate::errors::{GameError, InvalidPosition};
use crate::game::utils::{color_to_string, has_insufficient_material, piece_name, side_label};
use crate::models::{MoveIntent, TerminalFlags};

pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Half-moves without a capture or pawn move after which the fifty-move rule applies
const FIFTY_MOVE_PLIES: u32 = 100;

/// Board plus the move counters `chess::Board` does not keep
#[derive(Clone, Copy)]
pub struct Position {
    board: Board,
    halfmove_clock: u32,
    fullmove_number: u32,
}

impl Position {
    pub fn starting() -> Self {
        Position {
            board: Board::default(),
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> Color {
        self.board.side_to_move()
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    /// Key for repetition counting: placement, side, castling and en passant
    pub fn repetition_key(&self) -> u64 {
        self.board.get_hash()
    }

    /// First two FEN fields, placement and side to move
    pub fn placement_and_side(&self) -> String {
        let fen = self.board.to_string();
        fen.split_whitespace().take(2).collect::<Vec<_>>().join(" ")
    }

    /// Position after a move already known to be legal
    pub fn play(&self, mv: ChessMove) -> Position {
        let resets_clock = self.board.piece_on(mv.get_source()) == Some(Piece::Pawn)
            || self.board.piece_on(mv.get_dest()).is_some();
        let halfmove_clock = if resets_clock { 0 } else { self.halfmove_clock + 1 };
        let fullmove_number = match self.board.side_to_move() {
            Color::Black => self.fullmove_number + 1,
            Color::White => self.fullmove_number,
        };
        Position {
            board: self.board.make_move_new(mv),
            halfmove_clock,
            fullmove_number,
        }
    }
}

impl FromStr for Position {
    type Err = InvalidPosition;

    fn from_str(fen: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| InvalidPosition {
            fen: fen.to_string(),
            reason,
        };
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() < 4 || fields.len() > 6 {
            return Err(invalid("expected 4 to 6 FEN fields".to_string()));
        }
        check_placement(fields[0]).map_err(invalid)?;
        let board = Board::from_str(&fields[..4].join(" ")).map_err(|e| invalid(e.to_string()))?;
        let halfmove_clock = match fields.get(4) {
            Some(v) => v.parse::<u32>().map_err(|_| invalid(format!("bad halfmove clock '{}'", v)))?,
            None => 0,
        };
        let fullmove_number = match fields.get(5) {
            Some(v) => match v.parse::<u32>() {
                Ok(n) if n >= 1 => n,
                _ => return Err(invalid(format!("bad fullmove number '{}'", v))),
            },
            None => 1,
        };
        Ok(Position {
            board,
            halfmove_clock,
            fullmove_number,
        })
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fen = self.board.to_string();
        let fields: Vec<&str> = fen.split_whitespace().take(4).collect();
        write!(f, "{} {} {}", fields.join(" "), self.halfmove_clock, self.fullmove_number)
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Position({})", self)
    }
}

/// Shape check on a FEN placement field
///
/// `chess::Board` must never see a placement without exactly one king per
/// side: it indexes king squares unchecked while building pin masks.
/// Pawns on the first or last rank are refused here too.
pub fn check_placement(placement: &str) -> Result<(), String> {
    let ranks: Vec<&str> = placement.split('/').collect();
    if ranks.len() != 8 {
        return Err(format!("expected 8 ranks, found {}", ranks.len()));
    }
    let (mut white_kings, mut black_kings) = (0, 0);
    for (row, rank) in ranks.iter().enumerate() {
        let mut files = 0u32;
        for c in rank.chars() {
            match c {
                '1'..='8' => files += c.to_digit(10).unwrap_or(0),
                'K' => white_kings += 1,
                'k' => black_kings += 1,
                'P' | 'p' if row == 0 || row == 7 => {
                    return Err("pawn on the first or last rank".to_string());
                }
                'P' | 'N' | 'B' | 'R' | 'Q' | 'p' | 'n' | 'b' | 'r' | 'q' => {}
                _ => return Err(format!("unexpected '{}' in placement", c)),
            }
            if c.is_ascii_alphabetic() {
                files += 1;
            }
        }
        if files != 8 {
            return Err(format!("rank {} does not have 8 files", 8 - row));
        }
    }
    if white_kings != 1 || black_kings != 1 {
        return Err("each side needs exactly one king".to_string());
    }
    Ok(())
}

/// Special-move kinds the rules engine does not label itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialMove {
    CastleKingside,
    CastleQueenside,
    EnPassant,
    Promotion(Piece),
    /// Promotion onto an occupied square
    PromotionCapture(Piece),
}

impl SpecialMove {
    /// Tag shown in the special-move log, e.g. `White: castle-kingside`
    pub fn tag(&self, side: Color) -> String {
        let kind = match self {
            SpecialMove::CastleKingside => "castle-kingside".to_string(),
            SpecialMove::CastleQueenside => "castle-queenside".to_string(),
            SpecialMove::EnPassant => "en-passant".to_string(),
            SpecialMove::Promotion(piece) => format!("promotion-to-{}", piece_name(*piece)),
            SpecialMove::PromotionCapture(piece) => {
                format!("capture-promotion-to-{}", piece_name(*piece))
            }
        };
        format!("{}: {}", side_label(side), kind)
    }
}

fn file_distance(a: Square, b: Square) -> usize {
    let (a, b) = (a.get_file().to_index(), b.get_file().to_index());
    a.max(b) - a.min(b)
}

fn is_castle(board: &Board, mv: ChessMove) -> bool {
    board.piece_on(mv.get_source()) == Some(Piece::King)
        && file_distance(mv.get_source(), mv.get_dest()) == 2
}

fn is_en_passant(board: &Board, mv: ChessMove) -> bool {
    board.piece_on(mv.get_source()) == Some(Piece::Pawn)
        && mv.get_source().get_file() != mv.get_dest().get_file()
        && board.piece_on(mv.get_dest()).is_none()
}

/// Classify a legal move against the position it is played from
pub fn classify(board: &Board, mv: ChessMove) -> Option<SpecialMove> {
    if is_castle(board, mv) {
        return if mv.get_dest().get_file() == File::G {
            Some(SpecialMove::CastleKingside)
        } else {
            Some(SpecialMove::CastleQueenside)
        };
    }
    if is_en_passant(board, mv) {
        return Some(SpecialMove::EnPassant);
    }
    mv.get_promotion().map(|piece| {
        if board.piece_on(mv.get_dest()).is_some() {
            SpecialMove::PromotionCapture(piece)
        } else {
            SpecialMove::Promotion(piece)
        }
    })
}

/// Piece removed by a legal move, with its owner
///
/// En passant lands on an empty square; the pawn taken stands on the
/// destination file on the rank the capturing pawn started from.
pub fn captured_piece(board: &Board, mv: ChessMove) -> Option<(Piece, Color)> {
    if is_en_passant(board, mv) {
        let victim = Square::make_square(mv.get_source().get_rank(), mv.get_dest().get_file());
        return board.piece_on(victim).zip(board.color_on(victim));
    }
    if is_castle(board, mv) {
        return None;
    }
    let dest = mv.get_dest();
    board.piece_on(dest).zip(board.color_on(dest))
}

fn file_char(file: File) -> char {
    (b'a' + file.to_index() as u8) as char
}

fn rank_char(rank: Rank) -> char {
    (b'1' + rank.to_index() as u8) as char
}

fn san_letter(piece: Piece) -> &'static str {
    match piece {
        Piece::Pawn => "",
        Piece::Knight => "N",
        Piece::Bishop => "B",
        Piece::Rook => "R",
        Piece::Queen => "Q",
        Piece::King => "K",
    }
}

/// Standard Algebraic Notation for a legal move, computed on the pre-move board
pub fn san(board: &Board, mv: ChessMove) -> String {
    let source = mv.get_source();
    let dest = mv.get_dest();
    let piece = board.piece_on(source).unwrap_or(Piece::Pawn);
    let capture = board.piece_on(dest).is_some() || is_en_passant(board, mv);

    let mut out = String::new();
    if is_castle(board, mv) {
        out.push_str(if dest.get_file() == File::G { "O-O" } else { "O-O-O" });
    } else if piece == Piece::Pawn {
        if capture {
            out.push(file_char(source.get_file()));
            out.push('x');
        }
        out.push_str(&dest.to_string());
        if let Some(promotion) = mv.get_promotion() {
            out.push('=');
            out.push_str(san_letter(promotion));
        }
    } else {
        out.push_str(san_letter(piece));
        let rivals: Vec<Square> = MoveGen::new_legal(board)
            .filter(|m| {
                m.get_dest() == dest
                    && m.get_source() != source
                    && board.piece_on(m.get_source()) == Some(piece)
            })
            .map(|m| m.get_source())
            .collect();
        if !rivals.is_empty() {
            let shares_file = rivals.iter().any(|sq| sq.get_file() == source.get_file());
            let shares_rank = rivals.iter().any(|sq| sq.get_rank() == source.get_rank());
            if !shares_file {
                out.push(file_char(source.get_file()));
            } else if !shares_rank {
                out.push(rank_char(source.get_rank()));
            } else {
                out.push(file_char(source.get_file()));
                out.push(rank_char(source.get_rank()));
            }
        }
        if capture {
            out.push('x');
        }
        out.push_str(&dest.to_string());
    }

    let after = board.make_move_new(mv);
    if after.status() == BoardStatus::Checkmate {
        out.push('#');
    } else if after.checkers().popcnt() > 0 {
        out.push('+');
    }
    out
}

/// Parse a move stored as `e2e4` / `e7e8q`
pub fn parse_uci(text: &str) -> Option<ChessMove> {
    if text.len() != 4 && text.len() != 5 {
        return None;
    }
    let from = Square::from_str(text.get(0..2)?).ok()?;
    let to = Square::from_str(text.get(2..4)?).ok()?;
    let promotion = match text.get(4..) {
        None | Some("") => None,
        Some("q") => Some(Piece::Queen),
        Some("r") => Some(Piece::Rook),
        Some("b") => Some(Piece::Bishop),
        Some("n") => Some(Piece::Knight),
        Some(_) => return None,
    };
    Some(ChessMove::new(from, to, promotion))
}

/// UCI text of a move, the inverse of [`parse_uci`]
pub fn to_uci(mv: ChessMove) -> String {
    let mut out = format!("{}{}", mv.get_source(), mv.get_dest());
    if let Some(piece) = mv.get_promotion() {
        out.push_str(match piece {
            Piece::Queen => "q",
            Piece::Rook => "r",
            Piece::Bishop => "b",
            _ => "n",
        });
    }
    out
}

pub fn legal_moves(board: &Board) -> Vec<ChessMove> {
    MoveGen::new_legal(board).collect()
}

/// Match an intent against the legal-move set
pub fn resolve(board: &Board, intent: &MoveIntent) -> Result<ChessMove, GameError> {
    let mv = ChessMove::new(intent.from, intent.to, intent.promotion);
    if MoveGen::new_legal(board).any(|m| m == mv) {
        Ok(mv)
    } else {
        Err(GameError::IllegalMove(explain_illegal(board, intent)))
    }
}

/// Human-readable reason an intent is not in the legal set
pub fn explain_illegal(board: &Board, intent: &MoveIntent) -> String {
    let side = board.side_to_move();
    match board.color_on(intent.from) {
        None => return format!("There is no piece on {}.", intent.from),
        Some(owner) if owner != side => {
            return format!("It is {}'s turn.", color_to_string(side));
        }
        Some(_) => {}
    }

    let same_squares: Vec<ChessMove> = MoveGen::new_legal(board)
        .filter(|m| m.get_source() == intent.from && m.get_dest() == intent.to)
        .collect();
    if !same_squares.is_empty() {
        return match intent.promotion {
            None => "Choose a piece to promote to.".to_string(),
            Some(_) if same_squares.iter().all(|m| m.get_promotion().is_none()) => {
                "That move is not a promotion.".to_string()
            }
            Some(_) => "Pawns cannot promote to that piece.".to_string(),
        };
    }

    let in_check = board.checkers().popcnt() > 0;
    if board.piece_on(intent.from) == Some(Piece::King)
        && file_distance(intent.from, intent.to) == 2
        && in_check
    {
        return "You cannot castle while in check.".to_string();
    }
    if in_check {
        return "Illegal move: your king is in check.".to_string();
    }
    "Illegal move.".to_string()
}

/// Flags of a position given how many times it has been seen
pub fn terminal_flags(position: &Position, repetitions: usize) -> TerminalFlags {
    let board = position.board();
    let status = board.status();
    let checkmate = status == BoardStatus::Checkmate;
    let stalemate = status == BoardStatus::Stalemate;
    let fifty_move_rule = position.halfmove_clock() >= FIFTY_MOVE_PLIES;
    let repetition = repetitions >= 3;
    let insufficient_material = has_insufficient_material(board);
    TerminalFlags {
        check: board.checkers().popcnt() > 0,
        checkmate,
        stalemate,
        fifty_move_rule,
        repetition,
        insufficient_material,
        game_over: checkmate || stalemate || fifty_move_rule || repetition || insufficient_material,
    }
}
