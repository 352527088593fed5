// ── Observable single-value container ──
//
// Holds one value behind an `Arc`, replaces it wholesale on `set`, and
// pushes every replacement to callback subscribers synchronously plus a
// `watch` channel for async consumers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::watch;

use crate::stream::StoreStream;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Shared<T> {
    value: Arc<T>,
    next_id: u64,
    subscribers: Vec<(u64, Callback<T>)>,
}

/// A reactive container for a single value.
///
/// Cloning is cheap and yields another handle to the same value.
///
/// Callback subscribers see every update exactly once, in the order the
/// updates were applied: `set` holds the container lock while notifying.
/// A callback must therefore not call back into the same container.
/// [`watch`](Self::watch) streams only guarantee the latest value.
pub struct Observable<T: Send + Sync + 'static> {
    shared: Arc<Mutex<Shared<T>>>,
    watch: Arc<watch::Sender<Arc<T>>>,
}

impl<T: Send + Sync + 'static> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            watch: Arc::clone(&self.watch),
        }
    }
}

impl<T: Default + Send + Sync + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Send + Sync + 'static> Observable<T> {
    pub fn new(initial: T) -> Self {
        let value = Arc::new(initial);
        let (watch, _) = watch::channel(Arc::clone(&value));

        Self {
            shared: Arc::new(Mutex::new(Shared {
                value,
                next_id: 0,
                subscribers: Vec::new(),
            })),
            watch: Arc::new(watch),
        }
    }

    /// Current value (cheap `Arc` clone).
    pub fn get(&self) -> Arc<T> {
        Arc::clone(&self.lock().value)
    }

    /// Replace the held value and notify every subscriber.
    pub fn set(&self, value: T) {
        let mut shared = self.lock();
        self.replace(&mut shared, Arc::new(value));
    }

    /// Derive the next value from the current one and apply it as a `set`.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let mut shared = self.lock();
        let next = f(&shared.value);
        self.replace(&mut shared, Arc::new(next));
    }

    /// Register `callback`, invoke it once with the current value, and keep
    /// invoking it on every later update until the returned
    /// [`Subscription`] is dropped.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let callback: Callback<T> = Arc::new(callback);

        let mut shared = self.lock();
        let id = shared.next_id;
        shared.next_id += 1;
        callback(&shared.value);
        shared.subscribers.push((id, callback));
        drop(shared);

        let weak: Weak<Mutex<Shared<T>>> = Arc::downgrade(&self.shared);
        Subscription::new(move || {
            if let Some(shared) = weak.upgrade() {
                let mut shared = shared.lock().unwrap_or_else(PoisonError::into_inner);
                shared.subscribers.retain(|(sid, _)| *sid != id);
            }
        })
    }

    /// Number of live callback subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Async view of the value (latest-value semantics).
    pub fn watch(&self) -> StoreStream<T> {
        StoreStream::new(self.watch.subscribe())
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, Shared<T>> {
        // A panicking subscriber must not wedge the store for everyone else.
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn replace(&self, shared: &mut Shared<T>, value: Arc<T>) {
        shared.value = Arc::clone(&value);
        // `send_replace` updates unconditionally, even with zero receivers.
        self.watch.send_replace(Arc::clone(&value));
        for (_, callback) in &shared.subscribers {
            callback(&value);
        }
    }
}

// ── Subscription ─────────────────────────────────────────────────────

/// Unsubscribe capability returned by [`Observable::subscribe`].
///
/// Dropping it unsubscribes; so does [`unsubscribe`](Self::unsubscribe).
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
