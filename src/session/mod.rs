//! Streaming transcription session management
//!
//! This module provides the `SessionCoordinator` that manages:
//! - Connection lifecycle of the transport worker
//! - Dispatch of outbound audio chunks
//! - Classification of inbound worker events
//! - Count-based completion tracking and finalization
//! - The observable session state consumed by UIs

mod completion;
mod config;
mod coordinator;
mod dispatcher;
mod snapshot;
mod state;

pub use completion::CompletionTracker;
pub use config::SessionConfig;
pub use coordinator::SessionCoordinator;
pub use snapshot::{SessionSnapshot, TranscriptFragment, FRAGMENT_DELIMITER};
pub use state::ConnectionState;
