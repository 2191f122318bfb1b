use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::{error, warn};
use thiserror::Error;

use crate::models::{ErrorBody, Status};

/// Failures of a move submission against a loaded session
#[derive(Debug, Error)]
pub enum GameError {
    /// Move is not in the legal set; the session was not touched
    #[error("{0}")]
    IllegalMove(String),
    /// Missing or unparsable squares or promotion designator
    #[error("{0}")]
    MalformedRequest(String),
    #[error("The game is over.")]
    GameOver,
    /// Persisted position cannot be parsed or replayed; the session must be reset
    #[error("session is corrupt: {0}")]
    SessionCorrupt(String),
}

impl GameError {
    /// Recoverable errors are reported as an `illegal` result instead of an HTTP error
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, GameError::SessionCorrupt(_))
    }
}

/// A FEN that the rules engine refuses
#[derive(Debug, Error)]
#[error("invalid position '{fen}': {reason}")]
pub struct InvalidPosition {
    pub fen: String,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("session record could not be encoded: {0}")]
    Serialize(#[from] serde_json::Error),
    /// A stored record exists but does not decode; resetting the session replaces it
    #[error("session record is unreadable: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Handler-level error, rendered as a JSON body
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Game(#[from] GameError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("request could not be processed")]
    Blocking(#[from] actix_web::error::BlockingError),
    #[error("not found")]
    NotFound,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Game(GameError::SessionCorrupt(_)) | ApiError::Store(StoreError::Corrupt(_)) => {
                StatusCode::CONFLICT
            }
            ApiError::Game(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Store(_) | ApiError::Blocking(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }
        HttpResponse::build(status).json(ErrorBody {
            status: Status::Error,
            message: self.to_string(),
        })
    }
}

/// Client controller misuse: an event arrived in a state that cannot accept it
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("board interaction is disabled")]
    InteractionDisabled,
    #[error("unexpected {event} while {phase}")]
    UnexpectedEvent { event: &'static str, phase: &'static str },
    #[error("no promotion choice is pending")]
    NoPendingPromotion,
    #[error("{0} is not a promotion piece")]
    InvalidPromotionPiece(&'static str),
    #[error("unreadable position: {0}")]
    InvalidPosition(String),
}

/// The move request never produced a structured server reply
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("transport failure: {}", message.as_deref().unwrap_or("no response"))]
pub struct TransportFailure {
    pub message: Option<String>,
}
