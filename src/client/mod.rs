//! Browser-side optimistic move controller.
//!
//! The controller renders a drop immediately and reconciles it with the
//! server's reply. The server stays the only legality authority; the local
//! promotion check only decides whether to ask for a piece before sending.

pub mod board;
pub mod controller;

pub use board::{needs_promotion, RenderedBoard, PROMOTION_CHOICES};
pub use controller::{ClientController, DropAction, Displays, PendingPromotion, Phase, Reconciliation};
