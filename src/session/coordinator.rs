use super::dispatcher;
use super::snapshot::{SessionSnapshot, TranscriptFragment};
use super::state::{lock, ConnectionState, SessionState, SharedState};
use crate::error::SessionError;
use crate::transport::{Transport, TransportHandle, WebSocketTransport, WorkerCommand};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// The worker owned by a coordinator, plus the task feeding its events
/// into the session
struct ActiveWorker {
    handle: TransportHandle,
    pump: JoinHandle<()>,
}

impl ActiveWorker {
    fn terminate(self) {
        self.pump.abort();
        self.handle.terminate();
    }
}

/// Coordinates one streaming transcription session
///
/// Owns at most one transport worker. Chunks go out through
/// [`send_chunk`](Self::send_chunk); results arrive asynchronously, in any
/// order, and are counted against the chunks sent. [`finalize`](Self::finalize)
/// waits until every chunk has a result before disconnecting.
///
/// All methods take `&self`, so a coordinator can be shared behind an `Arc`
/// between the producer and whoever awaits completion.
pub struct SessionCoordinator {
    transport: Arc<dyn Transport>,
    state: SharedState,
    worker: Mutex<Option<ActiveWorker>>,
}

impl SessionCoordinator {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            state: Arc::new(Mutex::new(SessionState::new())),
            worker: Mutex::new(None),
        }
    }

    /// Coordinator backed by a WebSocket transport worker
    pub fn websocket() -> Self {
        Self::new(Arc::new(WebSocketTransport::default()))
    }

    // ------------------------------------------------------------------
    // Connection lifecycle
    // ------------------------------------------------------------------

    /// Connect to the transcription server.
    ///
    /// Resolves once the worker reports `CONNECTED`, fails with the carried
    /// message if it reports `ERROR` first. Calling this while connected is a
    /// no-op success. There is no built-in timeout; see
    /// [`connect_with_deadline`](Self::connect_with_deadline).
    pub async fn connect(&self, endpoint: &str) -> Result<(), SessionError> {
        info!("connect called with endpoint: {}", endpoint);

        let outcome = self.begin_connect(endpoint)?;

        let result = match outcome.await {
            Ok(result) => result,
            Err(_) => Err(SessionError::WorkerGone),
        };

        match &result {
            Ok(()) => info!("Connected to {}", endpoint),
            Err(e) => error!("Failed to connect to {}: {}", endpoint, e),
        }
        result
    }

    /// [`connect`](Self::connect) bounded by a caller-supplied deadline.
    ///
    /// When the deadline passes and nobody else is waiting on the attempt,
    /// the session returns to idle and the worker is told to disconnect. A
    /// late answer from the server no longer marks the session connected.
    pub async fn connect_with_deadline(
        &self,
        endpoint: &str,
        deadline: Duration,
    ) -> Result<(), SessionError> {
        let result = with_deadline(deadline, self.connect(endpoint)).await;
        if let Err(e @ SessionError::DeadlineElapsed(_)) = &result {
            self.abandon_connect(e);
        }
        result
    }

    fn abandon_connect(&self, err: &SessionError) {
        let worker = self.lock_worker();
        let mut state = self.lock_state();

        state.connect_observers.retain(|observer| !observer.is_closed());
        if state.connection != ConnectionState::Connecting || !state.connect_observers.is_empty()
        {
            return;
        }

        warn!("Giving up on connect: {}", err);
        state.connection = ConnectionState::Idle;
        state.record_error(err.to_string());

        if let Some(active) = worker.as_ref() {
            state.abandoned_connects += 1;
            if let Err(e) = active.handle.post(WorkerCommand::Disconnect) {
                warn!("Could not send DISCONNECT: {}", e);
            }
        }
    }

    /// Validate, spawn the worker if needed, register the connect observer
    /// and post `CONNECT`. Never suspends.
    ///
    /// A call made while another connect is in flight joins that attempt,
    /// whatever endpoint it names, and posts nothing.
    fn begin_connect(
        &self,
        endpoint: &str,
    ) -> Result<oneshot::Receiver<Result<(), SessionError>>, SessionError> {
        let mut worker = self.lock_worker();

        if self.lock_state().is_connected() {
            info!("Already connected");
            let (tx, rx) = oneshot::channel();
            let _ = tx.send(Ok(()));
            return Ok(rx);
        }

        if endpoint.trim().is_empty() {
            return Err(self.reject(SessionError::MissingEndpoint));
        }

        let needs_worker = worker
            .as_ref()
            .map_or(true, |active| active.handle.is_closed());

        if !needs_worker {
            let mut state = self.lock_state();
            if state.connection == ConnectionState::Connecting {
                info!("Connect already in progress, waiting on it");
                let (tx, rx) = oneshot::channel();
                state.connect_observers.push(tx);
                return Ok(rx);
            }
        }

        if needs_worker {
            info!("Initializing transcription worker");
            let spawned = self.spawn_worker().map_err(|e| self.reject(e))?;
            if let Some(dead) = worker.replace(spawned) {
                dead.terminate();
            }
            self.lock_state().abandoned_connects = 0;
        }

        let (tx, rx) = oneshot::channel();
        {
            // Registered before CONNECT is posted so the answer cannot be missed.
            let mut state = self.lock_state();
            state.connect_observers.push(tx);
            state.connection = ConnectionState::Connecting;
        }

        debug!("Sending CONNECT to worker");
        let posted = match worker.as_ref() {
            Some(active) => active.handle.post(WorkerCommand::Connect {
                endpoint: endpoint.to_string(),
            }),
            None => Err(SessionError::WorkerUnavailable),
        };
        if let Err(e) = posted {
            let mut state = self.lock_state();
            state.connect_observers.clear();
            state.connection = ConnectionState::Idle;
            state.record_error(e.to_string());
            if let Some(dead) = worker.take() {
                dead.terminate();
            }
            return Err(e);
        }

        Ok(rx)
    }

    fn spawn_worker(&self) -> Result<ActiveWorker, SessionError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SessionError::WorkerInit(e.to_string()))?;

        let mut handle = self.transport.spawn()?;
        let events = handle
            .take_events()
            .ok_or_else(|| SessionError::WorkerInit("worker event stream already taken".to_string()))?;

        let pump = runtime.spawn(dispatcher::pump(Arc::clone(&self.state), events));

        Ok(ActiveWorker { handle, pump })
    }

    /// Ask the worker to disconnect and mark the session idle right away.
    ///
    /// The local state is optimistic: no `DISCONNECTED` confirmation is
    /// awaited.
    pub fn disconnect(&self) {
        info!("disconnect called");

        if let Some(active) = self.lock_worker().as_ref() {
            match active.handle.post(WorkerCommand::Disconnect) {
                Ok(()) => debug!("DISCONNECT sent to worker"),
                Err(e) => warn!("Could not send DISCONNECT: {}", e),
            }
        }

        self.lock_state().connection = ConnectionState::Idle;
    }

    /// Disconnect, release the worker and return the session to its
    /// initial state.
    ///
    /// Any `connect` or `wait_for_completion` still waiting fails with
    /// [`SessionError::WorkerGone`]: the results it was waiting on are gone.
    pub fn cleanup(&self) {
        info!("cleanup called");

        self.disconnect();

        if let Some(active) = self.lock_worker().take() {
            active.terminate();
        }

        let mut state = self.lock_state();
        state.connect_observers.clear();
        state.abandoned_connects = 0;
        state.completion.abandon();
        state.reset();
    }

    // ------------------------------------------------------------------
    // Chunk accounting
    // ------------------------------------------------------------------

    /// Hand one chunk to the transport.
    ///
    /// Succeeds once the chunk is queued for the worker, not when the server
    /// has acknowledged it. Fails without touching the counters when no
    /// worker exists or the session is not connected.
    pub fn send_chunk(&self, chunk: Vec<u8>) -> Result<(), SessionError> {
        let worker = self.lock_worker();
        let mut state = self.lock_state();

        let Some(active) = worker.as_ref() else {
            return Err(reject(&mut state, SessionError::WorkerUnavailable));
        };

        if !state.is_connected() {
            return Err(reject(&mut state, SessionError::NotConnected));
        }

        let bytes = chunk.len();
        active
            .handle
            .post(WorkerCommand::SendChunk { buffer: chunk })
            .map_err(|e| reject(&mut state, e))?;

        state.completion.record_sent();
        debug!(
            "Queued audio chunk ({} bytes). Total sent: {}",
            bytes,
            state.completion.sent()
        );

        Ok(())
    }

    /// Wait until every sent chunk has a result.
    ///
    /// Resolves immediately if that already holds. Any number of callers may
    /// wait at once; all are released together.
    pub async fn wait_for_completion(&self) -> Result<(), SessionError> {
        let waiter = self.lock_state().completion.register();

        match waiter {
            None => {
                info!("All transcriptions already received");
                Ok(())
            }
            Some(rx) => {
                info!("Waiting for remaining transcriptions");
                rx.await.map_err(|_| SessionError::WorkerGone)
            }
        }
    }

    /// [`wait_for_completion`](Self::wait_for_completion) bounded by a
    /// caller-supplied deadline.
    pub async fn wait_for_completion_with_deadline(
        &self,
        deadline: Duration,
    ) -> Result<(), SessionError> {
        with_deadline(deadline, self.wait_for_completion()).await
    }

    // ------------------------------------------------------------------
    // Finalization
    // ------------------------------------------------------------------

    /// Wait for all outstanding results, then disconnect.
    ///
    /// Never returns if a chunk's result never arrives; use
    /// [`finalize_with_deadline`](Self::finalize_with_deadline) to bound it.
    pub async fn finalize(&self) -> Result<(), SessionError> {
        info!("finalize called");

        self.wait_for_completion().await?;
        info!("All transcriptions received");

        self.disconnect();
        Ok(())
    }

    /// [`finalize`](Self::finalize) with a bounded wait. If the deadline
    /// passes the session stays connected and the caller decides what next.
    pub async fn finalize_with_deadline(&self, deadline: Duration) -> Result<(), SessionError> {
        info!("finalize called (deadline {:?})", deadline);

        self.wait_for_completion_with_deadline(deadline).await?;
        info!("All transcriptions received");

        self.disconnect();
        Ok(())
    }

    /// Clear text, counters and error. The worker is left running.
    pub fn reset(&self) {
        self.lock_state().reset();
    }

    // ------------------------------------------------------------------
    // Observable state
    // ------------------------------------------------------------------

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock_state().snapshot()
    }

    pub fn transcript(&self) -> Vec<TranscriptFragment> {
        self.lock_state().fragments.clone()
    }

    pub fn transcription(&self) -> String {
        self.lock_state().transcription()
    }

    pub fn is_connected(&self) -> bool {
        self.lock_state().is_connected()
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock_state().last_error.clone()
    }

    /// Whether a transport worker is currently owned by this session
    pub fn has_worker(&self) -> bool {
        self.lock_worker().is_some()
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        lock(&self.state)
    }

    fn lock_worker(&self) -> MutexGuard<'_, Option<ActiveWorker>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reject(&self, err: SessionError) -> SessionError {
        reject(&mut self.lock_state(), err)
    }
}

impl Drop for SessionCoordinator {
    fn drop(&mut self) {
        let worker = self
            .worker
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(active) = worker.take() {
            active.terminate();
        }
    }
}

fn reject(state: &mut SessionState, err: SessionError) -> SessionError {
    error!("{}", err);
    state.record_error(err.to_string());
    err
}

async fn with_deadline<T>(
    deadline: Duration,
    fut: impl Future<Output = Result<T, SessionError>>,
) -> Result<T, SessionError> {
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| SessionError::DeadlineElapsed(deadline))?
}
