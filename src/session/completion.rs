//! Chunk accounting
//!
//! Results are correlated with chunks by count only: the batch is complete
//! once `received >= sent`. Waiters queue up while it is not, and all of them
//! are released together the first time the condition holds.

use tokio::sync::oneshot;
use tracing::debug;

#[derive(Debug, Default)]
pub struct CompletionTracker {
    sent: u64,
    received: u64,
    waiters: Vec<oneshot::Sender<()>>,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn record_sent(&mut self) {
        self.sent += 1;
    }

    pub fn record_received(&mut self) {
        self.received += 1;
    }

    pub fn is_complete(&self) -> bool {
        self.received >= self.sent
    }

    /// Number of waiters still queued
    pub fn pending_waiters(&self) -> usize {
        self.waiters.len()
    }

    /// Queue a waiter, or return `None` when the batch is already complete.
    pub fn register(&mut self) -> Option<oneshot::Receiver<()>> {
        if self.is_complete() {
            return None;
        }

        // Waiters abandoned by their caller (e.g. a deadline) are dead weight.
        self.waiters.retain(|w| !w.is_closed());

        let (tx, rx) = oneshot::channel();
        self.waiters.push(tx);
        Some(rx)
    }

    /// Release every queued waiter if the batch is complete.
    ///
    /// Returns how many waiters were released. Each waiter is fired once and
    /// removed, so repeated calls never release the same waiter twice.
    pub fn check(&mut self) -> usize {
        if !self.is_complete() || self.waiters.is_empty() {
            return 0;
        }

        let waiters = std::mem::take(&mut self.waiters);
        let count = waiters.len();
        for waiter in waiters {
            let _ = waiter.send(());
        }

        debug!(
            "Completion reached ({}/{}), released {} waiter(s)",
            self.received, self.sent, count
        );
        count
    }

    /// Drop every queued waiter without releasing it. Their receivers see
    /// the channel close instead of completion.
    pub fn abandon(&mut self) -> usize {
        let count = self.waiters.len();
        self.waiters.clear();
        if count > 0 {
            debug!("Abandoned {} completion waiter(s)", count);
        }
        count
    }

    /// Zero both counters. Queued waiters are released since an empty batch
    /// is complete.
    pub fn reset(&mut self) {
        self.sent = 0;
        self.received = 0;
        self.check();
    }
}
