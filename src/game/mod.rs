pub mod executor;
pub mod responder;
pub mod rules;
pub mod utils;

pub use executor::Executor;
pub use responder::{RandomResponder, Responder};
