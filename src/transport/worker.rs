use super::messages::{WorkerCommand, WorkerEvent};
use super::{Transport, TransportHandle, WorkerChannels};
use crate::error::SessionError;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Frame received from an open connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A text frame, expected to hold one JSON server message.
    Text(String),
    /// The remote side closed the connection.
    Closed(String),
}

/// Opens connections to the transcription server
#[async_trait::async_trait]
pub trait Connector: Send + Sync + 'static {
    type Connection: Connection + 'static;

    async fn connect(&self, endpoint: &str) -> Result<Self::Connection>;
}

/// One open connection owned by a worker
#[async_trait::async_trait]
pub trait Connection: Send {
    /// Send one audio chunk as a single frame.
    async fn send(&mut self, chunk: Vec<u8>) -> Result<()>;

    /// Wait for the next meaningful inbound frame.
    async fn recv(&mut self) -> Result<Inbound>;

    /// Close the connection gracefully.
    async fn close(&mut self) -> Result<()>;
}

/// [`Transport`] that runs [`run_worker`] on the current tokio runtime
pub struct WorkerTransport<C> {
    connector: Arc<C>,
}

impl<C: Connector> WorkerTransport<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector: Arc::new(connector),
        }
    }
}

impl<C: Connector + Default> Default for WorkerTransport<C> {
    fn default() -> Self {
        Self::new(C::default())
    }
}

impl<C: Connector> Transport for WorkerTransport<C> {
    fn spawn(&self) -> Result<TransportHandle, SessionError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SessionError::WorkerInit(e.to_string()))?;

        let (handle, channels) = TransportHandle::pair();
        runtime.spawn(run_worker(Arc::clone(&self.connector), channels));

        info!("Transport worker spawned");
        Ok(handle)
    }
}

/// Worker loop: executes commands in arrival order and turns inbound
/// frames into events.
///
/// Runs until the coordinator drops its command sender. An open connection
/// is closed on the way out.
pub async fn run_worker<C: Connector>(connector: Arc<C>, channels: WorkerChannels) {
    let WorkerChannels {
        mut commands,
        events,
    } = channels;
    let mut connection: Option<C::Connection> = None;

    info!("Transport worker started");

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    break;
                };
                handle_command(connector.as_ref(), &mut connection, command, &events).await;
            }
            inbound = next_inbound(&mut connection) => {
                match inbound {
                    Ok(Inbound::Text(text)) => match WorkerEvent::from_server_text(&text) {
                        Ok(event) => emit(&events, event),
                        Err(e) => warn!("Dropping malformed server message: {}", e),
                    },
                    Ok(Inbound::Closed(reason)) => {
                        info!("Connection closed by server: {}", reason);
                        connection = None;
                        emit(&events, WorkerEvent::Disconnected { reason });
                    }
                    Err(e) => {
                        error!("Connection failed: {:#}", e);
                        connection = None;
                        emit(&events, WorkerEvent::Error { message: format!("{:#}", e) });
                        emit(
                            &events,
                            WorkerEvent::Disconnected {
                                reason: "transport error".to_string(),
                            },
                        );
                    }
                }
            }
        }
    }

    if let Some(mut conn) = connection.take() {
        if let Err(e) = conn.close().await {
            warn!("Failed to close connection on shutdown: {:#}", e);
        }
    }

    info!("Transport worker stopped");
}

async fn handle_command<C: Connector>(
    connector: &C,
    connection: &mut Option<C::Connection>,
    command: WorkerCommand,
    events: &mpsc::UnboundedSender<WorkerEvent>,
) {
    match command {
        WorkerCommand::Connect { endpoint } => {
            if connection.is_some() {
                debug!("CONNECT while already connected");
                emit(events, WorkerEvent::Connected);
                return;
            }

            info!("Connecting to {}", endpoint);
            match connector.connect(&endpoint).await {
                Ok(conn) => {
                    *connection = Some(conn);
                    info!("Connected to {}", endpoint);
                    emit(events, WorkerEvent::Connected);
                }
                Err(e) => {
                    error!("Failed to connect to {}: {:#}", endpoint, e);
                    emit(events, WorkerEvent::Error { message: format!("{:#}", e) });
                }
            }
        }

        WorkerCommand::SendChunk { buffer } => {
            let Some(conn) = connection.as_mut() else {
                warn!("Dropping {} byte chunk: not connected", buffer.len());
                emit(
                    events,
                    WorkerEvent::Error {
                        message: "WebSocket is not connected".to_string(),
                    },
                );
                return;
            };

            let bytes = buffer.len();
            match conn.send(buffer).await {
                Ok(()) => debug!("Sent audio chunk ({} bytes)", bytes),
                Err(e) => {
                    error!("Failed to send audio chunk: {:#}", e);
                    *connection = None;
                    emit(events, WorkerEvent::Error { message: format!("{:#}", e) });
                    emit(
                        events,
                        WorkerEvent::Disconnected {
                            reason: "send failed".to_string(),
                        },
                    );
                }
            }
        }

        WorkerCommand::Disconnect => {
            if let Some(mut conn) = connection.take() {
                if let Err(e) = conn.close().await {
                    warn!("Failed to close connection: {:#}", e);
                }
                emit(
                    events,
                    WorkerEvent::Disconnected {
                        reason: "closed by client".to_string(),
                    },
                );
            }
        }
    }
}

async fn next_inbound<T: Connection>(connection: &mut Option<T>) -> Result<Inbound> {
    match connection.as_mut() {
        Some(conn) => conn.recv().await,
        None => std::future::pending().await,
    }
}

fn emit(events: &mpsc::UnboundedSender<WorkerEvent>, event: WorkerEvent) {
    if events.send(event).is_err() {
        debug!("Coordinator is gone, event dropped");
    }
}
