//! Shared application state for request handlers.

use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::config::{AppConfig, ConfigError};
use crate::store::Store;

/// Shared application state, cloneable across handlers via Arc-wrapped fields.
///
/// Contains the application configuration, the persistence backend, and the
/// access token issuer.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub tokens: Arc<TokenIssuer>,
}

impl AppState {
    /// Creates a new application state from the given configuration and store.
    pub fn new(config: AppConfig, store: Arc<dyn Store>) -> Result<Self, ConfigError> {
        let tokens = TokenIssuer::new(&config.auth)?;
        Ok(Self {
            config: Arc::new(config),
            store,
            tokens: Arc::new(tokens),
        })
    }
}
