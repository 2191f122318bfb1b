use chess::{Board, Color, Piece, Square, EMPTY};

/// Convert a chess color to a string
pub fn color_to_string(color: Color) -> String {
    match color {
        Color::White => "white".to_string(),
        Color::Black => "black".to_string(),
    }
}

/// Capitalised side name used in special-move tags and status lines
pub fn side_label(color: Color) -> &'static str {
    match color {
        Color::White => "White",
        Color::Black => "Black",
    }
}

/// Parse a side name as sent over the wire
pub fn color_from_str(value: &str) -> Option<Color> {
    match value.to_ascii_lowercase().as_str() {
        "white" | "w" => Some(Color::White),
        "black" | "b" => Some(Color::Black),
        _ => None,
    }
}

/// FEN symbol for a piece: uppercase for white, lowercase for black
pub fn piece_symbol(piece: Piece, color: Color) -> String {
    let symbol = match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    };
    match color {
        Color::White => symbol.to_ascii_uppercase().to_string(),
        Color::Black => symbol.to_string(),
    }
}

/// Lowercase English name of a piece kind
pub fn piece_name(piece: Piece) -> &'static str {
    match piece {
        Piece::Pawn => "pawn",
        Piece::Knight => "knight",
        Piece::Bishop => "bishop",
        Piece::Rook => "rook",
        Piece::Queen => "queen",
        Piece::King => "king",
    }
}

/// Parse a promotion designator. Accepts `q r b n` or the full piece names, in any case.
pub fn promotion_from_str(value: &str) -> Option<Piece> {
    match value.trim().to_ascii_lowercase().as_str() {
        "q" | "queen" => Some(Piece::Queen),
        "r" | "rook" => Some(Piece::Rook),
        "b" | "bishop" => Some(Piece::Bishop),
        "n" | "knight" => Some(Piece::Knight),
        _ => None,
    }
}

/// Centipawn value of a piece kind. The king is not counted.
pub fn piece_value(piece: Piece) -> i32 {
    match piece {
        Piece::Pawn => 100,
        Piece::Knight => 320,
        Piece::Bishop => 330,
        Piece::Rook => 500,
        Piece::Queen => 900,
        Piece::King => 0,
    }
}

/// Material balance in centipawns. Positive means White is ahead.
pub fn material_balance(board: &Board) -> i32 {
    let mut score = 0;
    for piece in [Piece::Pawn, Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen] {
        let pieces = *board.pieces(piece);
        let white = (pieces & *board.color_combined(Color::White)).popcnt() as i32;
        let black = (pieces & *board.color_combined(Color::Black)).popcnt() as i32;
        score += (white - black) * piece_value(piece);
    }
    score
}

/// Check if the board has insufficient material for checkmate
pub fn has_insufficient_material(board: &Board) -> bool {
    // Any pawn, rook or queen can still force mate
    let heavy = *board.pieces(Piece::Pawn) | *board.pieces(Piece::Rook) | *board.pieces(Piece::Queen);
    if heavy != EMPTY {
        return false;
    }

    let knights = *board.pieces(Piece::Knight);
    let bishops = *board.pieces(Piece::Bishop);

    // King vs king, or a single minor piece
    if (knights | bishops).popcnt() <= 1 {
        return true;
    }

    // Only bishops left, all on the same square colour
    if knights == EMPTY {
        let on_light = bishops.into_iter().filter(|sq| is_light_square(*sq)).count();
        return on_light == 0 || on_light == bishops.popcnt() as usize;
    }

    false
}

fn is_light_square(square: Square) -> bool {
    (square.get_rank().to_index() + square.get_file().to_index()) % 2 == 1
}
