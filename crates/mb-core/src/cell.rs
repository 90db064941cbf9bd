//! Observable value cell.
//!
//! Holds the current value behind an `Arc`, replaces it wholesale on every
//! write, and calls subscribers synchronously with the new value. Readers get
//! a cheap `Arc` snapshot that never changes under them.
//!
//! Writes are serialized end to end: a writer holds the write lock across the
//! swap and the notification, so subscribers see values in the order they were
//! stored and the last callback always carries the current value. The value
//! lock itself is released before notifying, so a callback may read the cell.
//! It must not write the cell it is observing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Inner<T> {
    /// Held from swap through notify.
    write: Mutex<()>,
    value: Mutex<Arc<T>>,
    subscribers: Mutex<Vec<(u64, Callback<T>)>>,
    next_id: AtomicU64,
}

/// A shared, observable value. Cloning shares the same underlying cell.
pub struct ObservableCell<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for ObservableCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Default> Default for ObservableCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

fn lock<U>(m: &Mutex<U>) -> MutexGuard<'_, U> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T> ObservableCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                write: Mutex::new(()),
                value: Mutex::new(Arc::new(value)),
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Current snapshot.
    pub fn get(&self) -> Arc<T> {
        Arc::clone(&lock(&self.inner.value))
    }

    /// Replace the whole value and notify subscribers.
    pub fn set(&self, value: T) {
        self.try_update(|_| Some((value, ())));
    }

    /// Read the latest value and replace it in one step.
    ///
    /// No other writer can slip in between the read and the write, which is
    /// what continuations resuming after an await rely on.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> Arc<T> {
        let _write = lock(&self.inner.write);
        let next = {
            let mut slot = lock(&self.inner.value);
            let next = Arc::new(f(&slot));
            *slot = Arc::clone(&next);
            next
        };
        self.notify(&next);
        next
    }

    /// Like [`update`](Self::update), but `f` may decline the write by
    /// returning `None`, in which case nobody is notified.
    pub fn try_update<R>(&self, f: impl FnOnce(&T) -> Option<(T, R)>) -> Option<R> {
        let _write = lock(&self.inner.write);
        let (next, out) = {
            let mut slot = lock(&self.inner.value);
            let (value, out) = f(&slot)?;
            let next = Arc::new(value);
            *slot = Arc::clone(&next);
            (next, out)
        };
        self.notify(&next);
        Some(out)
    }

    /// Register a callback fired synchronously on every write.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription
    where
        T: Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let callback: Callback<T> = Arc::new(callback);
        lock(&self.inner.subscribers).push((id, callback));
        let weak: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        Subscription {
            unsubscribe: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    lock(&inner.subscribers).retain(|(sid, _)| *sid != id);
                }
            })),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner.subscribers).len()
    }

    fn notify(&self, value: &T) {
        let callbacks: Vec<Callback<T>> = lock(&self.inner.subscribers)
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for cb in callbacks {
            cb(value);
        }
    }
}

/// Handle returned by [`ObservableCell::subscribe`]. Unsubscribes on drop.
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(f) = self.unsubscribe.take() {
            f();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}
