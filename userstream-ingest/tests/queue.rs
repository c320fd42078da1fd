//! Producer to consumer round trip through a live Redis stream

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use userstream_core::{
    cache::{KeyBuilder, UserCache},
    config::QueueConfig,
    models::User,
    service::PayloadCipher,
};
use userstream_hub::{BroadcastDispatcher, SubscriberRegistry};
use userstream_ingest::{IngestPipeline, QueueConsumer, QueueProducer, RecordStore};

const KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

struct AcceptAll;

#[async_trait]
impl RecordStore for AcceptAll {
    async fn insert(&self, _user: &User) -> userstream_core::Result<()> {
        Ok(())
    }
}

#[tokio::test]
#[ignore] // Requires Redis
async fn test_enqueued_users_reach_subscribers_in_order() {
    let client = redis::Client::open("redis://127.0.0.1:6379").unwrap();
    let cipher = PayloadCipher::from_key_str(KEY).unwrap();
    let config = QueueConfig {
        stream_key: format!("userstream:test:{}", std::process::id()),
        group: "test".to_string(),
        consumer: "test-consumer".to_string(),
        block_ms: 200,
        ..Default::default()
    };

    let registry = Arc::new(SubscriberRegistry::<User>::new(16));
    let mut subscriber = registry.register();

    let pipeline = IngestPipeline::new(
        Arc::new(cipher.clone()),
        Arc::new(AcceptAll),
        Arc::new(UserCache::new(
            None,
            100,
            Duration::from_secs(60),
            0,
            KeyBuilder::new("test:"),
        )),
        BroadcastDispatcher::new(Arc::clone(&registry)),
    );

    let token = CancellationToken::new();
    let consumer = QueueConsumer::new(client.clone(), &config, Arc::new(pipeline), token.clone());
    let task = tokio::spawn(consumer.run());

    let producer = QueueProducer::new(client, &config, cipher);
    let users: Vec<User> = (1..=3).map(User::new).collect();
    assert_eq!(producer.enqueue_all(&users).await.unwrap(), 3);

    for expected in 1..=3 {
        let user = tokio::time::timeout(Duration::from_secs(5), subscriber.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.id, expected);
    }

    token.cancel();
    task.await.unwrap();
}
