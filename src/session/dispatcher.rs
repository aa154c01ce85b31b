//! Inbound event classification
//!
//! Every worker event passes through [`dispatch`]. Connect observers are
//! resolved first (they only care about `CONNECTED` and `ERROR`), then the
//! event is applied to the session state by tag.
//!
//! The worker answers every `CONNECT` exactly once and in order, so the
//! first answers after a connect was abandoned belong to that connect and
//! are swallowed.

use super::snapshot::TranscriptFragment;
use super::state::{lock, ConnectionState, SessionState, SharedState};
use crate::error::SessionError;
use crate::transport::{ResultKind, WorkerEvent};
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Apply one worker event to the session.
pub(crate) fn dispatch(state: &mut SessionState, event: WorkerEvent) {
    if state.abandoned_connects > 0 && is_connect_answer(&event) {
        state.abandoned_connects -= 1;
        info!("Ignoring answer to an abandoned connect: {:?}", event);
        return;
    }

    resolve_connect_observers(state, &event);

    match event {
        WorkerEvent::Connected => {
            info!("Transport connected");
            state.connection = ConnectionState::Connected;
            state.last_error = None;
        }

        WorkerEvent::Disconnected { reason } => {
            info!("Transport disconnected: {}", reason);
            state.connection = ConnectionState::Idle;
        }

        WorkerEvent::Result(kind) => handle_result(state, kind),

        WorkerEvent::Error { message } => {
            error!("Transport error: {}", message);
            state.record_error(message);
            state.connection = ConnectionState::Idle;
        }

        WorkerEvent::Unknown { tag } => {
            warn!("Ignoring unknown message type from server: {:?}", tag);
        }
    }
}

fn handle_result(state: &mut SessionState, kind: ResultKind) {
    match kind {
        ResultKind::Transcription {
            text,
            timestamp,
            audio_file,
        } => {
            state.fragments.push(TranscriptFragment {
                text,
                received_at: Utc::now(),
                timestamp,
                audio_file,
            });
            state.completion.record_received();
            debug!(
                "Received transcription chunk. Total received: {}",
                state.completion.received()
            );
            state.completion.check();
        }

        ResultKind::Warning { message } => {
            warn!("Transcription warning: {}", message);
            state.record_error(message);
        }

        ResultKind::SessionInfo { session_id } => {
            info!("Session initialized with ID: {}", session_id);
            state.session_id = Some(session_id);
        }
    }
}

fn is_connect_answer(event: &WorkerEvent) -> bool {
    matches!(event, WorkerEvent::Connected | WorkerEvent::Error { .. })
}

fn resolve_connect_observers(state: &mut SessionState, event: &WorkerEvent) {
    let outcome = match event {
        WorkerEvent::Connected => Ok(()),
        WorkerEvent::Error { message } => Err(SessionError::Connect(message.clone())),
        _ => return,
    };

    for observer in state.connect_observers.drain(..) {
        let _ = observer.send(outcome.clone());
    }
}

/// Feed every event from the worker into the session until the worker
/// goes away.
pub(crate) async fn pump(state: SharedState, mut events: mpsc::UnboundedReceiver<WorkerEvent>) {
    debug!("Event pump started");

    while let Some(event) = events.recv().await {
        dispatch(&mut lock(&state), event);
    }

    info!("Transport worker event stream ended");

    let mut state = lock(&state);
    state.connection = ConnectionState::Idle;
    state.abandoned_connects = 0;
    for observer in state.connect_observers.drain(..) {
        let _ = observer.send(Err(SessionError::WorkerGone));
    }
}
