//! Transport worker boundary
//!
//! The coordinator never touches the network. It owns a [`TransportHandle`]
//! and talks to an isolated worker task through two ordered channels:
//! - commands (`CONNECT`, `SEND_CHUNK`, `DISCONNECT`) flow to the worker
//! - events (`CONNECTED`, `DISCONNECTED`, `RESULT`, `ERROR`) flow back
//!
//! [`Transport`] is the seam used to create workers. [`WebSocketTransport`]
//! is the production implementation; [`ChannelTransport`] hands the worker
//! side of each pair to the caller instead of running one.

pub mod messages;
pub mod websocket;
pub mod worker;

pub use messages::{ResultKind, ServerMessage, WorkerCommand, WorkerEvent};
pub use websocket::{WebSocketConnection, WebSocketConnector, WebSocketTransport};
pub use worker::{run_worker, Connection, Connector, Inbound, WorkerTransport};

use crate::error::SessionError;
use tokio::sync::mpsc;

/// Creates transport workers
pub trait Transport: Send + Sync {
    /// Start a new worker and return the coordinator's end of it.
    ///
    /// Failure here is an initialization failure: no worker exists afterwards.
    fn spawn(&self) -> Result<TransportHandle, SessionError>;
}

/// Coordinator-side ownership of one transport worker
#[derive(Debug)]
pub struct TransportHandle {
    commands: mpsc::UnboundedSender<WorkerCommand>,
    events: Option<mpsc::UnboundedReceiver<WorkerEvent>>,
}

/// Worker-side ends of a command/event channel pair
#[derive(Debug)]
pub struct WorkerChannels {
    pub commands: mpsc::UnboundedReceiver<WorkerCommand>,
    pub events: mpsc::UnboundedSender<WorkerEvent>,
}

impl TransportHandle {
    /// Create a connected handle/worker channel pair.
    pub fn pair() -> (Self, WorkerChannels) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        (
            Self {
                commands: command_tx,
                events: Some(event_rx),
            },
            WorkerChannels {
                commands: command_rx,
                events: event_tx,
            },
        )
    }

    /// Post a command to the worker without waiting.
    pub fn post(&self, command: WorkerCommand) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .map_err(|_| SessionError::WorkerGone)
    }

    /// Take the event stream. Only one consumer may ever hold it.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<WorkerEvent>> {
        self.events.take()
    }

    /// Whether the worker has dropped its command receiver.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Release the worker.
    ///
    /// Closing the command channel lets the worker drain what was already
    /// queued (typically a `DISCONNECT`) and then exit on its own.
    pub fn terminate(self) {
        tracing::debug!("Releasing transport worker handle");
        drop(self.commands);
    }
}

/// In-process transport that hands each new worker's channels to a host
///
/// Useful for embedding a custom worker or for driving the worker contract
/// by hand. Spawning fails once the host receiver is dropped.
pub struct ChannelTransport {
    spawned: mpsc::UnboundedSender<WorkerChannels>,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<WorkerChannels>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { spawned: tx }, rx)
    }
}

impl Transport for ChannelTransport {
    fn spawn(&self) -> Result<TransportHandle, SessionError> {
        let (handle, worker) = TransportHandle::pair();
        self.spawned
            .send(worker)
            .map_err(|_| SessionError::WorkerInit("no worker host is listening".to_string()))?;
        Ok(handle)
    }
}
