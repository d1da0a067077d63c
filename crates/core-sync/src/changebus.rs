//! One-shot broadcast used to wake observers on a visible board mutation.
//!
//! Unlike [`crate::waiter::WaiterRegistry`], this isn't keyed by coordinate: any
//! publish wakes every currently-subscribed observer, regardless of what changed.
//! Observers that miss a publish (because they subscribed after it fired) simply
//! see the next one; nothing is buffered.

use tokio::sync::oneshot;

#[derive(Debug, Default)]
pub struct ChangeBus {
    subscribers: Vec<oneshot::Sender<()>>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers interest in the next publish. The caller should release the
    /// board's monitor before awaiting the returned receiver.
    pub fn subscribe(&mut self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Wakes and drains every current subscriber.
    pub fn publish(&mut self) {
        tracing::trace!(subscribers = self.subscribers.len(), "publishing change");
        for tx in self.subscribers.drain(..) {
            let _ = tx.send(());
        }
    }
}
