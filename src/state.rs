use crate::auth::SessionConfig;
use crate::registry::ConnectionRegistry;

/// Shared application state
pub struct AppState {
    /// All live dashboard connections
    pub registry: ConnectionRegistry,
    /// Verifier for signed session cookies
    pub sessions: SessionConfig,
}

impl AppState {
    pub fn new(sessions: SessionConfig) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            sessions,
        }
    }
}
