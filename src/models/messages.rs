use std::str::FromStr;

use chess::{Piece, Square};
use serde::{Deserialize, Serialize};

use crate::errors::GameError;
use crate::game::utils::{piece_name, promotion_from_str};
use crate::models::CapturedPieces;

/// Outcome of a request, as the client sees it
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Illegal,
    Error,
}

/// Move submission body sent from client to server
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveRequest {
    pub from: Option<String>,
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<String>,
}

/// A fully specified move: squares and an optional promotion piece
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveIntent {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Piece>,
}

impl MoveIntent {
    pub fn new(from: Square, to: Square, promotion: Option<Piece>) -> Self {
        MoveIntent { from, to, promotion }
    }

    /// Wire form of this intent
    pub fn to_request(&self) -> MoveRequest {
        MoveRequest {
            from: Some(self.from.to_string()),
            to: Some(self.to.to_string()),
            promotion: self.promotion.map(|piece| piece_name(piece).to_string()),
        }
    }
}

impl TryFrom<&MoveRequest> for MoveIntent {
    type Error = GameError;

    fn try_from(request: &MoveRequest) -> Result<Self, Self::Error> {
        let from = parse_square(request.from.as_deref(), "from")?;
        let to = parse_square(request.to.as_deref(), "to")?;
        let promotion = match request.promotion.as_deref() {
            None => None,
            Some(value) => Some(promotion_from_str(value).ok_or_else(|| {
                GameError::MalformedRequest(format!("Invalid promotion piece '{}'.", value))
            })?),
        };
        Ok(MoveIntent { from, to, promotion })
    }
}

fn parse_square(value: Option<&str>, field: &str) -> Result<Square, GameError> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| GameError::MalformedRequest(format!("Missing '{}' square.", field)))?;
    // Square::from_str is lenient about trailing input, so check the shape first
    let bytes = value.as_bytes();
    let shaped = bytes.len() == 2
        && (b'a'..=b'h').contains(&bytes[0].to_ascii_lowercase())
        && (b'1'..=b'8').contains(&bytes[1]);
    if !shaped {
        return Err(GameError::MalformedRequest(format!(
            "Invalid '{}' square '{}'.",
            field, value
        )));
    }
    Square::from_str(&value.to_ascii_lowercase())
        .map_err(|_| GameError::MalformedRequest(format!("Invalid '{}' square '{}'.", field, value)))
}

/// Check and terminal conditions of a position
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerminalFlags {
    pub check: bool,
    pub checkmate: bool,
    pub stalemate: bool,
    pub fifty_move_rule: bool,
    pub repetition: bool,
    pub insufficient_material: bool,
    pub game_over: bool,
}

/// One applied move with the facts derived from it
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PlayedMove {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<String>,
    /// SAN computed on the position before the move
    pub notation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_move: Option<String>,
    pub position: String,
    pub turn: String,
    #[serde(flatten)]
    pub flags: TerminalFlags,
}

/// Full reply to a move, reset, state or position-injection request
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MoveResult {
    pub status: Status,
    pub position: String,
    pub turn: String,
    #[serde(flatten)]
    pub flags: TerminalFlags,
    pub special_moves: Vec<String>,
    pub move_history: Vec<String>,
    pub captured_pieces: CapturedPieces,
    pub material_balance: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_move: Option<PlayedMove>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_move: Option<PlayedMove>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl MoveResult {
    pub fn is_accepted(&self) -> bool {
        self.status == Status::Ok
    }
}

/// Diagnostic position injection body
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SetPositionRequest {
    pub fen: String,
    #[serde(default)]
    pub move_history: Vec<String>,
    #[serde(default)]
    pub captured_pieces: CapturedPieces,
    #[serde(default)]
    pub special_moves: Vec<String>,
}

/// JSON body of an HTTP-level error
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub status: Status,
    pub message: String,
}
