use std::sync::Arc;

use poker_core::registry::Registry;
use poker_core::session::SessionConfig;
use poker_core::verifier::PasswordVerifier;

use crate::config::GuessConfig;

#[derive(Clone)]
pub struct AppState {
    pub registry: Registry,
    pub verifier: Arc<dyn PasswordVerifier>,
    pub guesses: Arc<GuessConfig>,
    pub session_config: SessionConfig,
}
