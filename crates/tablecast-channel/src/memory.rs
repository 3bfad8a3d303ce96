// Copyright (c) 2024 - 2026 Tablecast contributors.
// All rights reserved.
//
// Use of this software is governed by the Apache License, Version 2.0
// included in the LICENSE file.

//! In-process channel transport for tests and local development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::watch;

use tablecast_types::config::BrokerOptions;

use crate::{ChannelError, ChannelPublisher, ChannelRecord, ChannelSubscriber, ChannelTransport};

#[derive(Default)]
struct Shared {
    topics: Mutex<HashMap<String, Arc<TopicLog>>>,
}

impl Shared {
    fn topic(&self, name: &str) -> Arc<TopicLog> {
        Arc::clone(self.topics.lock().entry(name.to_owned()).or_default())
    }
}

struct TopicLog {
    records: Mutex<Vec<ChannelRecord>>,
    tail: watch::Sender<usize>,
}

impl Default for TopicLog {
    fn default() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            tail: watch::Sender::new(0),
        }
    }
}

/// Ordered in-process transport: every topic is an unbounded append-only log
/// and every subscriber tracks its own read position, starting at the log's
/// beginning. Clones share the same topics.
#[derive(Clone, Default)]
pub struct MemoryChannel {
    shared: Arc<Shared>,
    publishers_created: Arc<AtomicUsize>,
    subscribers_created: Arc<AtomicUsize>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of publisher handles this transport has ever created.
    pub fn publishers_created(&self) -> usize {
        self.publishers_created.load(Ordering::SeqCst)
    }

    /// Number of subscriber handles this transport has ever created.
    pub fn subscribers_created(&self) -> usize {
        self.subscribers_created.load(Ordering::SeqCst)
    }
}

impl ChannelTransport for MemoryChannel {
    type Publisher = MemoryPublisher;
    type Subscriber = MemorySubscriber;

    fn create_publisher(&self, _options: &BrokerOptions) -> Result<MemoryPublisher, ChannelError> {
        self.publishers_created.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryPublisher {
            shared: Arc::clone(&self.shared),
        })
    }

    fn create_subscriber(
        &self,
        _options: &BrokerOptions,
    ) -> Result<MemorySubscriber, ChannelError> {
        self.subscribers_created.fetch_add(1, Ordering::SeqCst);
        Ok(MemorySubscriber {
            shared: Arc::clone(&self.shared),
            positions: Mutex::new(HashMap::new()),
        })
    }
}

pub struct MemoryPublisher {
    shared: Arc<Shared>,
}

#[async_trait]
impl ChannelPublisher for MemoryPublisher {
    async fn publish(&self, topic: &str, key: &str, payload: Bytes) -> Result<(), ChannelError> {
        let log = self.shared.topic(topic);
        let tail = {
            let mut records = log.records.lock();
            records.push(ChannelRecord {
                topic: topic.to_owned(),
                key: Some(key.to_owned()),
                payload: Some(payload),
            });
            records.len()
        };
        log.tail.send_replace(tail);
        Ok(())
    }

    async fn close(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

pub struct MemorySubscriber {
    shared: Arc<Shared>,
    positions: Mutex<HashMap<String, usize>>,
}

impl MemorySubscriber {
    fn take_available(&self, topic: &str, log: &TopicLog) -> Vec<ChannelRecord> {
        let records = log.records.lock();
        let mut positions = self.positions.lock();
        let Some(position) = positions.get_mut(topic) else {
            return Vec::new();
        };
        let batch = records[*position..].to_vec();
        *position = records.len();
        batch
    }
}

#[async_trait]
impl ChannelSubscriber for MemorySubscriber {
    async fn subscribe(&self, topic: &str) -> Result<(), ChannelError> {
        self.positions.lock().entry(topic.to_owned()).or_insert(0);
        Ok(())
    }

    async fn poll(
        &self,
        topic: &str,
        max_wait: Duration,
    ) -> Result<Vec<ChannelRecord>, ChannelError> {
        if !self.positions.lock().contains_key(topic) {
            return Err(ChannelError::NotSubscribed(topic.to_owned()));
        }

        let log = self.shared.topic(topic);
        let mut tail = log.tail.subscribe();
        let deadline = tokio::time::Instant::now() + max_wait;

        loop {
            let batch = self.take_available(topic, &log);
            if !batch.is_empty() {
                return Ok(batch);
            }
            match tokio::time::timeout_at(deadline, tail.changed()).await {
                Ok(Ok(())) => continue,
                // Sender dropped or wait is up; either way nothing new arrives
                // within this poll.
                Ok(Err(_)) | Err(_) => return Ok(Vec::new()),
            }
        }
    }

    async fn close(&self) -> Result<(), ChannelError> {
        self.positions.lock().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> BrokerOptions {
        BrokerOptions {
            brokers: vec!["in-memory".to_owned()],
            additional_options: Default::default(),
        }
    }

    fn payload(value: &'static str) -> Bytes {
        Bytes::from_static(value.as_bytes())
    }

    #[tokio::test]
    async fn delivers_records_in_publish_order() {
        let transport = MemoryChannel::new();
        let publisher = transport.create_publisher(&options()).unwrap();
        let subscriber = transport.create_subscriber(&options()).unwrap();

        publisher.publish("adv", "A", payload("1")).await.unwrap();
        publisher.publish("adv", "B", payload("2")).await.unwrap();
        publisher.publish("adv", "C", payload("3")).await.unwrap();

        subscriber.subscribe("adv").await.unwrap();
        let batch = subscriber
            .poll("adv", Duration::from_millis(10))
            .await
            .unwrap();

        let keys: Vec<_> = batch.iter().map(|r| r.key.clone().unwrap()).collect();
        assert_eq!(keys, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn poll_skips_already_delivered_records() {
        let transport = MemoryChannel::new();
        let publisher = transport.create_publisher(&options()).unwrap();
        let subscriber = transport.create_subscriber(&options()).unwrap();
        subscriber.subscribe("adv").await.unwrap();

        publisher.publish("adv", "A", payload("1")).await.unwrap();
        let first = subscriber
            .poll("adv", Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(first.len(), 1);

        publisher.publish("adv", "B", payload("2")).await.unwrap();
        let second = subscriber
            .poll("adv", Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].key.as_deref(), Some("B"));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_returns_empty_once_the_wait_is_up() {
        let transport = MemoryChannel::new();
        let subscriber = transport.create_subscriber(&options()).unwrap();
        subscriber.subscribe("adv").await.unwrap();

        let batch = subscriber.poll("adv", Duration::from_secs(5)).await.unwrap();
        assert!(batch.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn poll_wakes_on_records_published_mid_wait() {
        let transport = MemoryChannel::new();
        let publisher = transport.create_publisher(&options()).unwrap();
        let subscriber = transport.create_subscriber(&options()).unwrap();
        subscriber.subscribe("adv").await.unwrap();

        let poll = tokio::spawn(async move {
            subscriber.poll("adv", Duration::from_secs(30)).await
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        publisher.publish("adv", "A", payload("1")).await.unwrap();

        let batch = poll.await.unwrap().unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].key.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn resubscribing_keeps_the_read_position() {
        let transport = MemoryChannel::new();
        let publisher = transport.create_publisher(&options()).unwrap();
        let subscriber = transport.create_subscriber(&options()).unwrap();

        subscriber.subscribe("adv").await.unwrap();
        publisher.publish("adv", "A", payload("1")).await.unwrap();
        subscriber
            .poll("adv", Duration::from_millis(10))
            .await
            .unwrap();

        subscriber.subscribe("adv").await.unwrap();
        let batch = subscriber
            .poll("adv", Duration::from_millis(10))
            .await
            .unwrap();
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn polling_an_unsubscribed_topic_fails() {
        let transport = MemoryChannel::new();
        let subscriber = transport.create_subscriber(&options()).unwrap();
        let result = subscriber.poll("adv", Duration::from_millis(10)).await;
        assert!(matches!(result, Err(ChannelError::NotSubscribed(_))));
    }

    #[tokio::test]
    async fn subscribers_read_the_log_independently() {
        let transport = MemoryChannel::new();
        let publisher = transport.create_publisher(&options()).unwrap();
        let first = transport.create_subscriber(&options()).unwrap();
        let second = transport.create_subscriber(&options()).unwrap();

        publisher.publish("adv", "A", payload("1")).await.unwrap();
        first.subscribe("adv").await.unwrap();
        second.subscribe("adv").await.unwrap();

        assert_eq!(
            first.poll("adv", Duration::from_millis(10)).await.unwrap().len(),
            1
        );
        assert_eq!(
            second.poll("adv", Duration::from_millis(10)).await.unwrap().len(),
            1
        );
    }
}
