// ── Reactive store streams ──
//
// Async subscription types for consuming store changes.

use std::sync::Arc;

use tokio::sync::watch;

/// An async subscription to one store.
///
/// Provides point-in-time snapshot access and change notification via
/// [`changed()`](Self::changed). Rapid successive updates may be coalesced;
/// use a callback subscription when every intermediate value matters.
pub struct StoreStream<T: Send + Sync + 'static> {
    current: Arc<T>,
    receiver: watch::Receiver<Arc<T>>,
}

impl<T: Send + Sync + 'static> StoreStream<T> {
    pub(crate) fn new(receiver: watch::Receiver<Arc<T>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Get the snapshot captured at creation time (or at the last `changed`).
    pub fn current(&self) -> &Arc<T> {
        &self.current
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` if the store has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<T>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }
}
