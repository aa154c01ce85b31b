use super::state::ConnectionState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Delimiter appended after every fragment in the accumulated text
pub const FRAGMENT_DELIMITER: &str = " ";

/// Observable state of a transcription session, as shown to a UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Identifier assigned by the server's `session_init` message, if seen
    pub session_id: Option<String>,

    /// Connection lifecycle state
    pub state: ConnectionState,

    /// Whether the transport is connected
    pub connected: bool,

    /// Accumulated text, one delimiter after each fragment, in arrival order
    pub transcription: String,

    /// Most recent error or warning
    pub last_error: Option<String>,

    /// Number of chunks accepted for sending
    pub sent_count: u64,

    /// Number of transcription results received
    pub received_count: u64,

    /// When the session state was last reset
    pub started_at: DateTime<Utc>,
}

impl SessionSnapshot {
    /// Whether every sent chunk has produced a result.
    pub fn is_complete(&self) -> bool {
        self.received_count >= self.sent_count
    }
}

/// A single transcription result from the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptFragment {
    /// Transcribed text
    pub text: String,

    /// When this fragment was received
    pub received_at: DateTime<Utc>,

    /// Server-side timestamp of the chunk (seconds since the epoch), if sent
    pub timestamp: Option<f64>,

    /// Server-side location of the stored chunk, if reported
    pub audio_file: Option<String>,
}
