//! FIFO per-cell waiter completions.
//!
//! Each coordinate owns an independent queue of one-shot completions. A flip that
//! finds a cell controlled by someone else enqueues itself here and awaits the
//! returned receiver after releasing the board's monitor; `wake_all` later
//! splices the whole queue out at once so every waiter re-races for the cell.

use std::collections::{HashMap, VecDeque};

use core_cell::Coordinate;
use tokio::sync::oneshot;

/// Registry of pending flip resumptions, keyed by the coordinate a waiter is
/// blocked on.
#[derive(Debug, Default)]
pub struct WaiterRegistry {
    queues: HashMap<Coordinate, VecDeque<oneshot::Sender<()>>>,
}

impl WaiterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a fresh completion to `coord`'s FIFO and returns the half the
    /// caller should await. Entries only exist between this call and the
    /// matching `wake_all`.
    pub fn enqueue(&mut self, coord: Coordinate) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.queues.entry(coord).or_default().push_back(tx);
        tracing::trace!(%coord, "waiter enqueued");
        rx
    }

    /// Releases and removes every completion queued for `coord`, in enqueue
    /// order. A send failure just means the waiter's future was already
    /// dropped; that is not this registry's concern.
    pub fn wake_all(&mut self, coord: Coordinate) {
        if let Some(queue) = self.queues.remove(&coord) {
            tracing::trace!(%coord, count = queue.len(), "waking queued waiters");
            for tx in queue {
                let _ = tx.send(());
            }
        }
    }
}
