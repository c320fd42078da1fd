use futures::Stream;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Identity of a registered subscriber, unique for the registry's lifetime
pub type SubscriberId = u64;

/// Delivery side of one subscriber, as seen by the dispatcher
#[derive(Debug, Clone)]
pub struct Subscriber<T> {
    pub id: SubscriberId,
    pub sender: mpsc::Sender<T>,
}

/// Set of live subscribers and their bounded delivery queues.
///
/// Membership is only touched under one lock, and never with I/O in the
/// critical section. A subscriber's queue closes once it is unregistered
/// and any outstanding snapshots are dropped. Once closed, the registry
/// admits no new subscribers.
pub struct SubscriberRegistry<T> {
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<T>>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    capacity: usize,
}

impl<T: Send + 'static> SubscriberRegistry<T> {
    /// Create a registry whose subscribers buffer at most `capacity` records
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            capacity: capacity.max(1),
        }
    }

    /// Register a new subscriber.
    ///
    /// The returned handle yields records in publish order and unregisters
    /// itself when dropped. After [`close`](Self::close) the handle is
    /// never registered and its stream ends immediately.
    pub fn register(self: &Arc<Self>) -> SubscriberHandle<T> {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let total = {
            let mut subscribers = self.subscribers.lock();
            if self.closed.load(Ordering::Acquire) {
                None
            } else {
                subscribers.insert(id, tx);
                Some(subscribers.len())
            }
        };

        match total {
            Some(total) => info!(subscriber_id = id, total, "Subscriber registered"),
            None => debug!(subscriber_id = id, "Registry closed, subscriber refused"),
        }

        SubscriberHandle {
            id,
            receiver: rx,
            registry: Arc::clone(self),
        }
    }

    /// Remove a subscriber, releasing the registry's end of its queue.
    ///
    /// Returns false when it was already gone; calling this more than once
    /// for the same id is harmless.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let (removed, total) = {
            let mut subscribers = self.subscribers.lock();
            let removed = subscribers.remove(&id);
            (removed, subscribers.len())
        };

        match removed {
            Some(_sender) => {
                info!(subscriber_id = id, total, "Subscriber unregistered");
                true
            }
            None => {
                debug!(subscriber_id = id, "Subscriber already unregistered");
                false
            }
        }
    }

    /// Stop admitting subscribers and remove every current one, returning
    /// how many were removed.
    ///
    /// Each subscriber's stream ends once it drains what it already holds.
    pub fn close(&self) -> usize {
        let removed: Vec<_> = {
            let mut subscribers = self.subscribers.lock();
            self.closed.store(true, Ordering::Release);
            subscribers.drain().collect()
        };
        if !removed.is_empty() {
            info!(count = removed.len(), "All subscribers unregistered");
        }
        removed.len()
    }

    /// Consistent copy of current membership for delivery outside the lock
    pub fn snapshot(&self) -> Vec<Subscriber<T>> {
        self.subscribers
            .lock()
            .iter()
            .map(|(id, sender)| Subscriber {
                id: *id,
                sender: sender.clone(),
            })
            .collect()
    }

    /// Number of registered subscribers
    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.lock().is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().contains_key(&id)
    }

    /// Per-subscriber queue capacity
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Receiving end of one subscriber.
///
/// Yields `None` once the subscriber has been evicted and its buffered
/// records are drained. Dropping the handle unregisters the subscriber and
/// discards anything still buffered.
pub struct SubscriberHandle<T: Send + 'static> {
    id: SubscriberId,
    receiver: mpsc::Receiver<T>,
    registry: Arc<SubscriberRegistry<T>>,
}

impl<T: Send + 'static> SubscriberHandle<T> {
    #[must_use]
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next record
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// Take a record if one is already buffered
    pub fn try_recv(&mut self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// Whether the subscriber is still registered
    pub fn is_registered(&self) -> bool {
        self.registry.contains(self.id)
    }
}

impl<T: Send + 'static> Stream for SubscriberHandle<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.receiver.poll_recv(cx)
    }
}

impl<T: Send + 'static> Drop for SubscriberHandle<T> {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
    }
}

impl<T: Send + 'static> std::fmt::Debug for SubscriberHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
