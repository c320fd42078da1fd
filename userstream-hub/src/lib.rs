//! Live subscriber registry and non-blocking broadcast
//!
//! A single [`SubscriberRegistry`] is shared between the producer side
//! (which publishes through a [`BroadcastDispatcher`]) and every open
//! connection (each holding a [`SubscriberHandle`]). Publishing never waits
//! on a subscriber: one whose bounded queue is full is evicted on the spot.

pub mod dispatcher;
pub mod registry;

pub use dispatcher::{BroadcastDispatcher, PublishReport};
pub use registry::{Subscriber, SubscriberHandle, SubscriberId, SubscriberRegistry};
