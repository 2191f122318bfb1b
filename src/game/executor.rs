use chess::{ChessMove, Color};
use log::{info, warn};

use crate::errors::{ApiError, GameError, InvalidPosition, StoreError};
use crate::game::responder::Responder;
use crate::game::rules::{self, Position};
use crate::game::utils::{color_to_string, material_balance, piece_name, piece_symbol};
use crate::models::{
    GameSession, MoveIntent, MoveRequest, MoveResult, PlayedMove, SetPositionRequest, Status,
    TerminalFlags,
};
use crate::store::SessionStore;

/// A session parsed into rules-engine form
struct LoadedGame {
    position: Position,
    /// Repetition keys of every position since the session's initial one
    seen: Vec<u64>,
}

impl LoadedGame {
    /// Parse the stored position and replay the stored plies up to it
    fn load(session: &GameSession) -> Result<Self, GameError> {
        let position: Position = session
            .position
            .parse()
            .map_err(|e: InvalidPosition| GameError::SessionCorrupt(e.to_string()))?;
        let mut replay: Position = session
            .initial_position
            .parse()
            .map_err(|e: InvalidPosition| GameError::SessionCorrupt(e.to_string()))?;

        let mut seen = Vec::with_capacity(session.moves.len() + 1);
        seen.push(replay.repetition_key());
        for text in &session.moves {
            let mv = rules::parse_uci(text)
                .filter(|mv| replay.board().legal(*mv))
                .ok_or_else(|| {
                    GameError::SessionCorrupt(format!("stored move '{}' cannot be replayed", text))
                })?;
            replay = replay.play(mv);
            seen.push(replay.repetition_key());
        }

        // Side to move must agree with the number of plies played
        if replay.placement_and_side() != position.placement_and_side() {
            return Err(GameError::SessionCorrupt(
                "stored moves do not lead to the stored position".to_string(),
            ));
        }
        Ok(LoadedGame { position, seen })
    }

    fn flags(&self) -> TerminalFlags {
        let key = self.position.repetition_key();
        let repetitions = self.seen.iter().filter(|k| **k == key).count();
        rules::terminal_flags(&self.position, repetitions)
    }

    fn turn(&self) -> String {
        color_to_string(self.position.side_to_move())
    }

    /// Apply a legal move and record everything derived from it in `session`
    fn play(&mut self, session: &mut GameSession, mv: ChessMove) -> PlayedMove {
        // All derived facts come from the board before the move
        let before = *self.position.board();
        let side = before.side_to_move();
        let notation = rules::san(&before, mv);
        let special = rules::classify(&before, mv);
        let captured = rules::captured_piece(&before, mv);

        self.position = self.position.play(mv);
        self.seen.push(self.position.repetition_key());

        session.position = self.position.to_string();
        session.moves.push(rules::to_uci(mv));
        session.move_history.push(notation.clone());
        if let Some((piece, owner)) = captured {
            session.captured_pieces.record(side, piece, owner);
        }
        let tag = special.map(|kind| kind.tag(side));
        if let Some(tag) = &tag {
            session.special_moves.push(tag.clone());
        }

        PlayedMove {
            from: mv.get_source().to_string(),
            to: mv.get_dest().to_string(),
            promotion: mv.get_promotion().map(|piece| piece_name(piece).to_string()),
            notation,
            captured: captured.map(|(piece, owner)| piece_symbol(piece, owner)),
            special_move: tag,
            position: session.position.clone(),
            turn: self.turn(),
            flags: self.flags(),
        }
    }

    fn result(&self, session: &GameSession, status: Status) -> MoveResult {
        MoveResult {
            status,
            position: session.position.clone(),
            turn: self.turn(),
            flags: self.flags(),
            special_moves: session.special_moves.clone(),
            move_history: session.move_history.clone(),
            captured_pieces: session.captured_pieces.clone(),
            material_balance: material_balance(self.position.board()),
            last_move: None,
            ai_move: None,
            message: None,
        }
    }
}

/// Move validator and executor for stored sessions
///
/// Every operation loads the session fresh, runs to completion (including any
/// automated reply) and saves before returning. Rejected moves never reach
/// the store.
pub struct Executor<'a> {
    store: &'a dyn SessionStore,
    responder: Option<&'a dyn Responder>,
    ai_color: Color,
}

impl<'a> Executor<'a> {
    pub fn new(store: &'a dyn SessionStore) -> Self {
        Executor {
            store,
            responder: None,
            ai_color: Color::Black,
        }
    }

    /// Enable the automated opponent for `ai_color`
    pub fn with_responder(mut self, responder: &'a dyn Responder, ai_color: Color) -> Self {
        self.responder = Some(responder);
        self.ai_color = ai_color;
        self
    }

    /// Validate and apply one move to an already loaded session
    ///
    /// On error the session is left exactly as it was.
    pub fn apply(&self, session: &mut GameSession, intent: &MoveIntent) -> Result<MoveResult, GameError> {
        let mut game = LoadedGame::load(session)?;
        if game.flags().game_over {
            return Err(GameError::GameOver);
        }
        if self.responder.is_some() && game.position.side_to_move() == self.ai_color {
            return Err(GameError::IllegalMove("It is the computer's turn.".to_string()));
        }
        let mv = rules::resolve(game.position.board(), intent)?;

        let human = game.play(session, mv);
        let automated = self.respond(&mut game, session);

        let mut result = game.result(session, Status::Ok);
        result.last_move = Some(human);
        result.ai_move = automated;
        Ok(result)
    }

    fn respond(&self, game: &mut LoadedGame, session: &mut GameSession) -> Option<PlayedMove> {
        let responder = self.responder?;
        if game.flags().game_over || game.position.side_to_move() != self.ai_color {
            return None;
        }
        let mv = responder.select_move(game.position.board())?;
        if !game.position.board().legal(mv) {
            warn!("Responder proposed illegal move {}, ignoring it", mv);
            return None;
        }
        let played = game.play(session, mv);
        info!("Automated reply {} ({})", played.notation, rules::to_uci(mv));
        Some(played)
    }

    /// Load `session` and let the automated side move if it is on turn
    fn opening(&self, session: &mut GameSession) -> Result<(LoadedGame, Option<PlayedMove>), GameError> {
        let mut game = LoadedGame::load(session)?;
        let automated = self.respond(&mut game, session);
        Ok((game, automated))
    }

    /// A stored session left with the automated side on turn gets its move now
    fn catch_up(&self, session_id: &str, session: &mut GameSession) -> Result<(), ApiError> {
        if let (_, Some(played)) = self.opening(session)? {
            self.store.save(session_id, session)?;
            info!("Session {}: automated side caught up with {}", session_id, played.notation);
        }
        Ok(())
    }

    /// Load, apply and persist a move submission
    pub fn submit(&self, session_id: &str, request: &MoveRequest) -> Result<MoveResult, ApiError> {
        let mut session = self.store.load(session_id)?;
        self.catch_up(session_id, &mut session)?;
        let outcome = MoveIntent::try_from(request).and_then(|intent| self.apply(&mut session, &intent));
        match outcome {
            Ok(result) => {
                self.store.save(session_id, &session)?;
                info!(
                    "Session {}: {} played, {} plies total",
                    session_id,
                    result.last_move.as_ref().map(|m| m.notation.as_str()).unwrap_or("?"),
                    session.moves.len()
                );
                Ok(result)
            }
            Err(e) if e.is_recoverable() => {
                warn!("Session {}: move {:?} rejected: {}", session_id, request, e);
                self.rejected(&session, e.to_string())
            }
            Err(e) => {
                warn!("Session {}: {}", session_id, e);
                Err(e.into())
            }
        }
    }

    fn rejected(&self, session: &GameSession, message: String) -> Result<MoveResult, ApiError> {
        let game = LoadedGame::load(session)?;
        let mut result = game.result(session, Status::Illegal);
        result.message = Some(message);
        Ok(result)
    }

    /// Current state without a move
    pub fn current(&self, session_id: &str) -> Result<MoveResult, ApiError> {
        let mut session = self.store.load(session_id)?;
        self.catch_up(session_id, &mut session)?;
        let game = LoadedGame::load(&session)?;
        Ok(game.result(&session, Status::Ok))
    }

    /// Canonical starting position, empty history and captures
    ///
    /// An automated White opens straight away.
    pub fn reset(&self, session_id: &str) -> Result<MoveResult, ApiError> {
        let mut session = GameSession::new();
        let (game, automated) = self.opening(&mut session)?;
        self.store.save(session_id, &session)?;
        info!("Session {} reset", session_id);
        let mut result = game.result(&session, Status::Ok);
        result.ai_move = automated;
        Ok(result)
    }

    /// Diagnostic position injection; the next page load keeps the result
    pub fn inject(&self, session_id: &str, request: &SetPositionRequest) -> Result<MoveResult, ApiError> {
        let position: Position = match request.fen.parse() {
            Ok(position) => position,
            Err(e) => {
                warn!("Session {}: rejected injected position: {}", session_id, e);
                let current = self.store.load(session_id)?;
                return self.rejected(&current, e.to_string());
            }
        };

        let mut session = GameSession::from_position(position.to_string());
        session.move_history = request.move_history.clone();
        session.captured_pieces = request.captured_pieces.clone();
        session.special_moves = request.special_moves.clone();
        session.preserve_on_load = true;
        let (game, automated) = self.opening(&mut session)?;
        self.store.save(session_id, &session)?;
        info!("Session {}: injected position {}", session_id, request.fen);

        let mut result = game.result(&session, Status::Ok);
        result.ai_move = automated;
        Ok(result)
    }

    /// Full page load: keep an injected session once, otherwise start over
    ///
    /// Nothing is written unless the stored record actually changes, so an id
    /// that only ever loads the page never lands in the store.
    pub fn page_load(&self, session_id: &str) -> Result<(), ApiError> {
        let stored = match self.store.load(session_id) {
            Ok(session) => Some(session),
            Err(StoreError::Corrupt(reason)) => {
                warn!("Session {}: replacing unreadable record: {}", session_id, reason);
                None
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(mut session) = stored.clone().filter(|s| s.preserve_on_load) {
            info!("Session {}: keeping injected position across page load", session_id);
            session.preserve_on_load = false;
            self.store.save(session_id, &session)?;
            return Ok(());
        }

        let mut fresh = GameSession::new();
        self.opening(&mut fresh)?;
        if stored.as_ref() != Some(&fresh) {
            self.store.save(session_id, &fresh)?;
        }
        Ok(())
    }
}
