use crate::session::SessionCoordinator;
use crate::transport::Transport;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Active sessions (session_id → coordinator)
    pub sessions: Arc<RwLock<HashMap<String, Arc<SessionCoordinator>>>>,

    /// Creates the transport worker for each new session
    pub transport: Arc<dyn Transport>,

    /// Endpoint used when a start request does not name one
    pub default_endpoint: String,
}

impl AppState {
    pub fn new(transport: Arc<dyn Transport>, default_endpoint: impl Into<String>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            transport,
            default_endpoint: default_endpoint.into(),
        }
    }

    pub async fn session(&self, session_id: &str) -> Option<Arc<SessionCoordinator>> {
        self.sessions.read().await.get(session_id).cloned()
    }
}
