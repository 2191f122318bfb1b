use chess::{Color, Piece, Square};
use log::{debug, warn};

use crate::client::board::{needs_promotion, RenderedBoard, PROMOTION_CHOICES};
use crate::errors::{ClientError, TransportFailure};
use crate::game::utils::{color_from_str, piece_name, side_label};
use crate::models::{CapturedPieces, MoveIntent, MoveResult, TerminalFlags};

/// Shown on rollback when the server gave no reason
pub const GENERIC_FAILURE: &str = "The move could not be completed. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Dragging { from: Square },
    AwaitingPromotionChoice,
    AwaitingServer,
}

impl Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Dragging { .. } => "dragging",
            Phase::AwaitingPromotionChoice => "awaiting a promotion choice",
            Phase::AwaitingServer => "awaiting the server",
        }
    }
}

/// Promotion dialog in progress; it owns the rollback snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPromotion {
    pub from: Square,
    pub to: Square,
    pub snapshot: RenderedBoard,
}

/// What the UI must do after a drop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropAction {
    /// Piece returns to its square; nothing is sent
    Snapback,
    /// Show the dialog with these choices plus a cancel affordance
    ChoosePromotion([Piece; 4]),
    /// Dispatch this intent
    Send(MoveIntent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    Committed,
    RolledBack { message: String },
}

/// Everything drawn around the board from the last committed result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Displays {
    pub move_history: Vec<String>,
    pub special_moves: Vec<String>,
    pub captured_pieces: CapturedPieces,
    pub material_balance: i32,
}

/// Optimistic move controller for one board
///
/// At most one move is in flight: board interaction stays disabled from the
/// drop until the server reply is reconciled.
#[derive(Debug, Clone)]
pub struct ClientController {
    board: RenderedBoard,
    phase: Phase,
    /// Rendered board at drag start
    snapshot: Option<RenderedBoard>,
    pending_promotion: Option<PendingPromotion>,
    turn: Color,
    flags: TerminalFlags,
    interaction_enabled: bool,
    status_text: String,
    message: Option<String>,
    displays: Displays,
}

impl ClientController {
    /// Controller showing a state fetched from the server
    pub fn from_result(result: &MoveResult) -> Result<Self, ClientError> {
        let mut controller = ClientController {
            board: RenderedBoard::empty(),
            phase: Phase::Idle,
            snapshot: None,
            pending_promotion: None,
            turn: Color::White,
            flags: TerminalFlags::default(),
            interaction_enabled: true,
            status_text: String::new(),
            message: None,
            displays: Displays::default(),
        };
        controller.commit(result)?;
        Ok(controller)
    }

    /// Replace the shown state outside a move, e.g. after a reset
    pub fn sync(&mut self, result: &MoveResult) -> Result<(), ClientError> {
        if self.phase != Phase::Idle {
            return Err(self.unexpected("sync"));
        }
        self.commit(result)?;
        self.message = None;
        Ok(())
    }

    pub fn board(&self) -> &RenderedBoard {
        &self.board
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pending_promotion(&self) -> Option<&PendingPromotion> {
        self.pending_promotion.as_ref()
    }

    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn flags(&self) -> &TerminalFlags {
        &self.flags
    }

    pub fn interaction_enabled(&self) -> bool {
        self.interaction_enabled
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn displays(&self) -> &Displays {
        &self.displays
    }

    /// Try to pick up the piece on `square`; false leaves the board untouched
    pub fn on_drag_start(&mut self, square: Square) -> Result<bool, ClientError> {
        match self.phase {
            Phase::Idle => {}
            Phase::Dragging { .. } => return Err(self.unexpected("drag start")),
            _ => return Err(ClientError::InteractionDisabled),
        }
        if self.flags.game_over {
            return Ok(false);
        }
        match self.board.piece_at(square) {
            Some((_, color)) if color == self.turn => {}
            _ => return Ok(false),
        }
        self.snapshot = Some(self.board);
        self.phase = Phase::Dragging { from: square };
        Ok(true)
    }

    pub fn on_drop(&mut self, target: Square) -> Result<DropAction, ClientError> {
        let from = match self.phase {
            Phase::Dragging { from } => from,
            _ => return Err(self.unexpected("drop")),
        };
        let snapshot = self.snapshot.unwrap_or(self.board);

        if from == target {
            self.board = snapshot;
            self.snapshot = None;
            self.phase = Phase::Idle;
            return Ok(DropAction::Snapback);
        }

        self.board = snapshot;
        self.board.move_piece(from, target, None);
        self.interaction_enabled = false;

        // Judged on the board as it was before the drag
        if needs_promotion(&snapshot, from, target) {
            self.pending_promotion = Some(PendingPromotion {
                from,
                to: target,
                snapshot,
            });
            self.phase = Phase::AwaitingPromotionChoice;
            return Ok(DropAction::ChoosePromotion(PROMOTION_CHOICES));
        }

        self.phase = Phase::AwaitingServer;
        Ok(DropAction::Send(MoveIntent::new(from, target, None)))
    }

    /// Finish the dialog; the returned intent must be dispatched
    pub fn choose_promotion(&mut self, piece: Piece) -> Result<MoveIntent, ClientError> {
        let pending = match (&self.phase, &self.pending_promotion) {
            (Phase::AwaitingPromotionChoice, Some(pending)) => pending.clone(),
            _ => return Err(ClientError::NoPendingPromotion),
        };
        if !PROMOTION_CHOICES.contains(&piece) {
            return Err(ClientError::InvalidPromotionPiece(piece_name(piece)));
        }
        self.board = pending.snapshot;
        self.board.move_piece(pending.from, pending.to, Some(piece));
        self.phase = Phase::AwaitingServer;
        Ok(MoveIntent::new(pending.from, pending.to, Some(piece)))
    }

    /// Close the dialog and put the pawn back; nothing is sent
    pub fn cancel_promotion(&mut self) -> Result<(), ClientError> {
        if self.phase != Phase::AwaitingPromotionChoice {
            return Err(ClientError::NoPendingPromotion);
        }
        let pending = self.pending_promotion.take().ok_or(ClientError::NoPendingPromotion)?;
        self.board = pending.snapshot;
        self.finish();
        Ok(())
    }

    /// Commit an accepted result, otherwise roll back to the snapshot
    pub fn on_server_reply(
        &mut self,
        reply: Result<MoveResult, TransportFailure>,
    ) -> Result<Reconciliation, ClientError> {
        if self.phase != Phase::AwaitingServer {
            return Err(self.unexpected("server reply"));
        }

        let failure = match reply {
            Ok(result) if result.is_accepted() => match self.commit(&result) {
                Ok(()) => {
                    self.message = None;
                    self.finish();
                    return Ok(Reconciliation::Committed);
                }
                Err(e) => {
                    warn!("Accepted reply could not be shown: {}", e);
                    GENERIC_FAILURE.to_string()
                }
            },
            Ok(result) => result.message.unwrap_or_else(|| GENERIC_FAILURE.to_string()),
            Err(transport) => {
                warn!("{}", transport);
                transport.message.unwrap_or_else(|| GENERIC_FAILURE.to_string())
            }
        };

        self.rollback();
        self.message = Some(failure.clone());
        Ok(Reconciliation::RolledBack { message: failure })
    }

    fn commit(&mut self, result: &MoveResult) -> Result<(), ClientError> {
        let board = RenderedBoard::from_fen(&result.position)?;
        let turn = color_from_str(&result.turn)
            .ok_or_else(|| ClientError::InvalidPosition(format!("unknown turn '{}'", result.turn)))?;
        self.board = board;
        self.turn = turn;
        self.flags = result.flags;
        self.displays = Displays {
            move_history: result.move_history.clone(),
            special_moves: result.special_moves.clone(),
            captured_pieces: result.captured_pieces.clone(),
            material_balance: result.material_balance,
        };
        self.status_text = status_line(self.turn, &self.flags);
        Ok(())
    }

    fn rollback(&mut self) {
        let restore = self
            .pending_promotion
            .as_ref()
            .map(|pending| pending.snapshot)
            .or(self.snapshot);
        if let Some(board) = restore {
            self.board = board;
        }
        debug!("Rolled back to {}", self.board.placement());
        self.status_text = status_line(self.turn, &self.flags);
        self.finish();
    }

    fn finish(&mut self) {
        self.pending_promotion = None;
        self.snapshot = None;
        self.interaction_enabled = true;
        self.phase = Phase::Idle;
    }

    fn unexpected(&self, event: &'static str) -> ClientError {
        ClientError::UnexpectedEvent {
            event,
            phase: self.phase.name(),
        }
    }
}

/// Turn indicator or end-of-game line
pub fn status_line(turn: Color, flags: &TerminalFlags) -> String {
    let side = side_label(turn);
    if flags.checkmate {
        format!("Checkmate! {} wins.", side_label(!turn))
    } else if flags.stalemate {
        "Draw by stalemate.".to_string()
    } else if flags.insufficient_material {
        "Draw by insufficient material.".to_string()
    } else if flags.fifty_move_rule {
        "Draw by the fifty-move rule.".to_string()
    } else if flags.repetition {
        "Draw by repetition.".to_string()
    } else if flags.check {
        format!("{}'s turn (in check)", side)
    } else {
        format!("{}'s turn", side)
    }
}
