use super::completion::CompletionTracker;
use super::snapshot::{SessionSnapshot, TranscriptFragment, FRAGMENT_DELIMITER};
use crate::error::SessionError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

/// Connection lifecycle
///
/// ```text
/// Idle ──connect()──▶ Connecting ──CONNECTED──▶ Connected
///                     Connecting ──ERROR──────▶ Idle
/// Connected ──DISCONNECTED / ERROR / disconnect()──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Connected,
}

/// One-shot observer for the outcome of an in-flight `connect`
pub(crate) type ConnectObserver = oneshot::Sender<Result<(), SessionError>>;

/// Session aggregate, mutated by the dispatcher and the lifecycle manager
#[derive(Debug)]
pub(crate) struct SessionState {
    pub connection: ConnectionState,
    pub fragments: Vec<TranscriptFragment>,
    pub last_error: Option<String>,
    pub session_id: Option<String>,
    pub completion: CompletionTracker,
    pub connect_observers: Vec<ConnectObserver>,
    /// `CONNECT`s whose caller gave up; their answers are still in flight
    pub abandoned_connects: usize,
    pub started_at: DateTime<Utc>,
}

pub(crate) type SharedState = Arc<Mutex<SessionState>>;

/// Lock the session state. Critical sections never suspend, so a poisoned
/// lock still holds consistent data.
pub(crate) fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            connection: ConnectionState::Idle,
            fragments: Vec::new(),
            last_error: None,
            session_id: None,
            completion: CompletionTracker::new(),
            connect_observers: Vec::new(),
            abandoned_connects: 0,
            started_at: Utc::now(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    /// Accumulated text: every fragment followed by the delimiter.
    pub fn transcription(&self) -> String {
        self.fragments.iter().fold(String::new(), |mut text, fragment| {
            text.push_str(&fragment.text);
            text.push_str(FRAGMENT_DELIMITER);
            text
        })
    }

    /// Record an error or warning for observers, replacing the previous one.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    /// Return text, counters and error to their initial values.
    ///
    /// In-flight connect observers and abandoned connects are left alone:
    /// they belong to the worker, which a reset does not touch.
    pub fn reset(&mut self) {
        self.connection = ConnectionState::Idle;
        self.fragments.clear();
        self.last_error = None;
        self.session_id = None;
        self.completion.reset();
        self.started_at = Utc::now();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            state: self.connection,
            connected: self.is_connected(),
            transcription: self.transcription(),
            last_error: self.last_error.clone(),
            sent_count: self.completion.sent(),
            received_count: self.completion.received(),
            started_at: self.started_at,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
