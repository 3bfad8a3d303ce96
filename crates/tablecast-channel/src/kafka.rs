// Copyright (c) 2024 - 2026 Tablecast contributors.
// All rights reserved.
//
// Use of this software is governed by the Apache License, Version 2.0
// included in the LICENSE file.

//! Channel transport backed by a Kafka cluster.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use rdkafka::consumer::{Consumer, DefaultConsumerContext, StreamConsumer};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use rdkafka::{ClientConfig, Message};
use tracing::debug;

use tablecast_types::config::BrokerOptions;

use crate::{ChannelError, ChannelPublisher, ChannelRecord, ChannelSubscriber, ChannelTransport};

type MessageConsumer = StreamConsumer<DefaultConsumerContext>;

/// Builds channel handles over rdkafka clients.
///
/// Every node must observe the full row stream, so subscribers default to a
/// fresh consumer group reading from the earliest offset; a restarted node
/// replays the topic and rebuilds its caches from scratch.
#[derive(Debug, Default)]
pub struct KafkaChannel;

impl KafkaChannel {
    pub fn new() -> Self {
        Self
    }

    fn client_config(options: &BrokerOptions) -> ClientConfig {
        let mut client_config = ClientConfig::default();
        client_config.set("metadata.broker.list", options.brokers.join(","));
        for (k, v) in options.additional_options.clone() {
            client_config.set(k, v);
        }
        client_config
    }
}

impl ChannelTransport for KafkaChannel {
    type Publisher = KafkaPublisher;
    type Subscriber = KafkaSubscriber;

    fn create_publisher(&self, options: &BrokerOptions) -> Result<KafkaPublisher, ChannelError> {
        let client_config = Self::client_config(options);
        debug!(
            "Creating Kafka producer with configuration {:?}",
            client_config
        );
        let producer = client_config.create().map_err(ChannelError::transport)?;
        Ok(KafkaPublisher { producer })
    }

    fn create_subscriber(
        &self,
        options: &BrokerOptions,
    ) -> Result<KafkaSubscriber, ChannelError> {
        let mut client_config = Self::client_config(options);
        if client_config.get("group.id").is_none() {
            // A group shared between nodes would split the stream across
            // them; every node needs all of it.
            client_config.set("group.id", format!("tablecast-{}", uuid::Uuid::new_v4()));
        }
        if client_config.get("auto.offset.reset").is_none() {
            client_config.set("auto.offset.reset", "earliest");
        }
        debug!(
            "Creating Kafka consumer with configuration {:?}",
            client_config
        );
        let consumer: MessageConsumer = client_config.create().map_err(ChannelError::transport)?;
        Ok(KafkaSubscriber {
            consumer,
            subscriptions: Mutex::new(BTreeSet::new()),
            pending: Mutex::new(HashMap::new()),
        })
    }
}

pub struct KafkaPublisher {
    producer: FutureProducer,
}

#[async_trait]
impl ChannelPublisher for KafkaPublisher {
    async fn publish(&self, topic: &str, key: &str, payload: Bytes) -> Result<(), ChannelError> {
        let record = FutureRecord::to(topic).key(key).payload(payload.as_ref());
        self.producer
            .send(record, Timeout::Never)
            .await
            .map_err(|(err, _)| ChannelError::transport(err))?;
        Ok(())
    }

    async fn close(&self) -> Result<(), ChannelError> {
        self.producer
            .flush(Timeout::Never)
            .map_err(ChannelError::transport)
    }
}

/// One consumer serves every namespace in the process. Records the consumer
/// hands back for other topics are parked per topic and served by the next
/// poll for that topic.
pub struct KafkaSubscriber {
    consumer: MessageConsumer,
    subscriptions: Mutex<BTreeSet<String>>,
    pending: Mutex<HashMap<String, VecDeque<ChannelRecord>>>,
}

impl KafkaSubscriber {
    fn drain_pending(&self, topic: &str) -> Vec<ChannelRecord> {
        match self.pending.lock().get_mut(topic) {
            Some(queue) => queue.drain(..).collect(),
            None => Vec::new(),
        }
    }
}

#[async_trait]
impl ChannelSubscriber for KafkaSubscriber {
    async fn subscribe(&self, topic: &str) -> Result<(), ChannelError> {
        let topics: Vec<String> = {
            let mut subscriptions = self.subscriptions.lock();
            if !subscriptions.insert(topic.to_owned()) {
                return Ok(());
            }
            subscriptions.iter().cloned().collect()
        };
        // rdkafka replaces the subscription wholesale, so pass the full set
        // to keep the other namespaces' topics attached.
        let topics: Vec<&str> = topics.iter().map(|x| &**x).collect();
        if let Err(err) = self.consumer.subscribe(&topics) {
            self.subscriptions.lock().remove(topic);
            return Err(ChannelError::transport(err));
        }
        debug!("Kafka consumer now subscribed to {:?}", topics);
        Ok(())
    }

    async fn poll(
        &self,
        topic: &str,
        max_wait: Duration,
    ) -> Result<Vec<ChannelRecord>, ChannelError> {
        if !self.subscriptions.lock().contains(topic) {
            return Err(ChannelError::NotSubscribed(topic.to_owned()));
        }

        let mut batch = self.drain_pending(topic);
        let deadline = tokio::time::Instant::now() + max_wait;

        loop {
            // Wait out the deadline while the batch is empty; once records
            // are in hand, only drain what is already delivered.
            let wait_until = if batch.is_empty() {
                deadline
            } else {
                tokio::time::Instant::now()
            };
            match tokio::time::timeout_at(wait_until, self.consumer.recv()).await {
                Ok(Ok(message)) => {
                    let record = ChannelRecord {
                        topic: message.topic().to_owned(),
                        key: message
                            .key()
                            .map(|key| String::from_utf8_lossy(key).into_owned()),
                        payload: message.payload().map(Bytes::copy_from_slice),
                    };
                    if record.topic == topic {
                        batch.push(record);
                    } else {
                        self.pending
                            .lock()
                            .entry(record.topic.clone())
                            .or_default()
                            .push_back(record);
                    }
                }
                Ok(Err(err)) => return Err(ChannelError::transport(err)),
                Err(_) => return Ok(batch),
            }
        }
    }

    async fn close(&self) -> Result<(), ChannelError> {
        self.consumer.unsubscribe();
        self.subscriptions.lock().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_config_carries_broker_list_and_extra_options() {
        let options = BrokerOptions {
            brokers: vec!["broker-1:9092".to_owned(), "broker-2:9092".to_owned()],
            additional_options: HashMap::from([(
                "security.protocol".to_owned(),
                "SASL_SSL".to_owned(),
            )]),
        };

        let config = KafkaChannel::client_config(&options);
        assert_eq!(
            config.get("metadata.broker.list"),
            Some("broker-1:9092,broker-2:9092")
        );
        assert_eq!(config.get("security.protocol"), Some("SASL_SSL"));
    }
}
