// Shared helpers for driving a SessionCoordinator through an in-process
// ChannelTransport, playing the part of the transport worker by hand.

#![allow(dead_code)]

use live_transcribe::{
    ChannelTransport, ResultKind, SessionCoordinator, WorkerChannels, WorkerCommand, WorkerEvent,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

pub const ENDPOINT: &str = "ws://transcriber.test/ws/transcribe";

const STEP: Duration = Duration::from_secs(2);

/// A coordinator wired to a ChannelTransport whose workers we receive here
pub fn channel_session() -> (Arc<SessionCoordinator>, mpsc::UnboundedReceiver<WorkerChannels>) {
    let (transport, host) = ChannelTransport::new();
    (Arc::new(SessionCoordinator::new(Arc::new(transport))), host)
}

pub async fn next_worker(host: &mut mpsc::UnboundedReceiver<WorkerChannels>) -> WorkerChannels {
    timeout(STEP, host.recv())
        .await
        .expect("no worker was spawned")
        .expect("transport host closed")
}

pub async fn next_command(worker: &mut WorkerChannels) -> WorkerCommand {
    timeout(STEP, worker.commands.recv())
        .await
        .expect("no command reached the worker")
        .expect("command channel closed")
}

pub fn emit(worker: &WorkerChannels, event: WorkerEvent) {
    worker.events.send(event).expect("event pump is gone");
}

pub fn transcription(text: &str) -> WorkerEvent {
    WorkerEvent::Result(ResultKind::Transcription {
        text: text.to_string(),
        timestamp: None,
        audio_file: None,
    })
}

/// Connect a fresh session, answering the CONNECT as the worker.
pub async fn connected_session() -> (
    Arc<SessionCoordinator>,
    WorkerChannels,
    mpsc::UnboundedReceiver<WorkerChannels>,
) {
    let (session, mut host) = channel_session();

    let connecting = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.connect(ENDPOINT).await }
    });

    let mut worker = next_worker(&mut host).await;
    assert_eq!(
        next_command(&mut worker).await,
        WorkerCommand::Connect {
            endpoint: ENDPOINT.to_string()
        }
    );
    emit(&worker, WorkerEvent::Connected);

    timeout(STEP, connecting)
        .await
        .expect("connect did not resolve")
        .expect("connect task panicked")
        .expect("connect failed");

    (session, worker, host)
}

/// Poll `condition` until it holds or the step timeout passes.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + STEP;
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Await `fut`, failing the test if it takes longer than the step timeout.
pub async fn within<T>(fut: impl Future<Output = T>) -> T {
    timeout(STEP, fut).await.expect("operation timed out")
}

/// Run a worker host that answers every worker like a well-behaved server:
/// CONNECT succeeds unless the endpoint contains "refuse", every chunk comes
/// back as a transcription of its UTF-8 contents.
pub fn spawn_echo_host(mut host: mpsc::UnboundedReceiver<WorkerChannels>) {
    tokio::spawn(async move {
        while let Some(worker) = host.recv().await {
            tokio::spawn(echo_worker(worker));
        }
    });
}

async fn echo_worker(mut worker: WorkerChannels) {
    while let Some(command) = worker.commands.recv().await {
        let event = match command {
            WorkerCommand::Connect { endpoint } if endpoint.contains("refuse") => {
                WorkerEvent::Error {
                    message: "refused".to_string(),
                }
            }
            WorkerCommand::Connect { .. } => WorkerEvent::Connected,
            WorkerCommand::SendChunk { buffer } => {
                transcription(&String::from_utf8_lossy(&buffer))
            }
            WorkerCommand::Disconnect => WorkerEvent::Disconnected {
                reason: "closed by client".to_string(),
            },
        };
        if worker.events.send(event).is_err() {
            break;
        }
    }
}
