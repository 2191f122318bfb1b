use crate::config::Config;
use crate::game::{Executor, Responder};
use crate::store::SessionStore;

/// Application state shared between requests
pub struct AppState {
    pub config: Config,
    pub store: Box<dyn SessionStore>,
    pub responder: Box<dyn Responder>,
}

impl AppState {
    pub fn new(config: Config, store: Box<dyn SessionStore>, responder: Box<dyn Responder>) -> Self {
        AppState {
            config,
            store,
            responder,
        }
    }

    /// Executor over this state's store, with the automated opponent if enabled
    pub fn executor(&self) -> Executor<'_> {
        let executor = Executor::new(self.store.as_ref());
        if self.config.ai_enabled {
            executor.with_responder(self.responder.as_ref(), self.config.ai_color)
        } else {
            executor
        }
    }
}
