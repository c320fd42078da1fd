use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::registry::SubscriberRegistry;

/// Outcome of one publish
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers the record was queued for
    pub delivered: usize,
    /// Subscribers evicted because their queue was full
    pub evicted: usize,
}

/// Delivers records to every registered subscriber without waiting on any.
///
/// A subscriber whose queue is full is evicted immediately rather than
/// retried; one that stalls must not hold up the caller or the others.
pub struct BroadcastDispatcher<T> {
    registry: Arc<SubscriberRegistry<T>>,
}

impl<T> Clone for BroadcastDispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T: Clone + Send + 'static> BroadcastDispatcher<T> {
    #[must_use]
    pub const fn new(registry: Arc<SubscriberRegistry<T>>) -> Self {
        Self { registry }
    }

    #[must_use]
    pub const fn registry(&self) -> &Arc<SubscriberRegistry<T>> {
        &self.registry
    }

    /// Queue a copy of `record` for every current subscriber.
    ///
    /// Never blocks and never fails; per-subscriber problems are logged
    /// and reflected in the returned report.
    pub fn publish(&self, record: &T) -> PublishReport {
        let mut report = PublishReport::default();

        for subscriber in self.registry.snapshot() {
            match subscriber.sender.try_send(record.clone()) {
                Ok(()) => {
                    report.delivered += 1;
                }
                Err(TrySendError::Full(_)) => {
                    warn!(
                        subscriber_id = subscriber.id,
                        capacity = self.registry.capacity(),
                        "Subscriber queue full, evicting"
                    );
                    if self.registry.unregister(subscriber.id) {
                        report.evicted += 1;
                    }
                }
                Err(TrySendError::Closed(_)) => {
                    // Receiver dropped but its cleanup has not run yet
                    debug!(subscriber_id = subscriber.id, "Subscriber queue closed");
                    self.registry.unregister(subscriber.id);
                }
            }
        }

        if report.delivered > 0 || report.evicted > 0 {
            debug!(
                delivered = report.delivered,
                evicted = report.evicted,
                "Broadcast complete"
            );
        }

        report
    }
}
