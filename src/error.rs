use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by a transcription session to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The transport worker could not be created.
    #[error("Failed to initialize transcription service: {0}")]
    WorkerInit(String),

    /// `connect` was called without an endpoint.
    #[error("Transcription service configuration is missing")]
    MissingEndpoint,

    /// The transport reported an error before the connection was established.
    #[error("{0}")]
    Connect(String),

    /// A chunk was sent while the session was not connected.
    #[error("WebSocket is not connected")]
    NotConnected,

    /// A chunk was sent before any worker was started.
    #[error("Transcription service is not available")]
    WorkerUnavailable,

    /// The worker stopped before answering.
    #[error("Transcription worker stopped unexpectedly")]
    WorkerGone,

    /// A caller-supplied deadline passed before the awaited event arrived.
    #[error("Deadline of {0:?} elapsed")]
    DeadlineElapsed(Duration),
}
