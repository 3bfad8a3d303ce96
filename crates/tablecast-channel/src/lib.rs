// Copyright (c) 2024 - 2026 Tablecast contributors.
// All rights reserved.
//
// Use of this software is governed by the Apache License, Version 2.0
// included in the LICENSE file.

//! The channel seam between leaders and followers: a durable, ordered
//! publish-subscribe transport plus the process-wide manager owning its two
//! handles.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use tablecast_types::config::BrokerOptions;
use tablecast_types::errors::GenericError;

mod manager;
mod memory;

#[cfg(feature = "kafka")]
mod kafka;

pub use manager::BrokerChannelManager;
pub use memory::{MemoryChannel, MemoryPublisher, MemorySubscriber};

#[cfg(feature = "kafka")]
pub use kafka::{KafkaChannel, KafkaPublisher, KafkaSubscriber};

/// One record delivered from a channel topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRecord {
    pub topic: String,
    pub key: Option<String>,
    pub payload: Option<Bytes>,
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("channel transport error: {0}")]
    Transport(#[source] GenericError),
    #[error("not subscribed to topic '{0}'")]
    NotSubscribed(String),
}

impl ChannelError {
    pub fn transport(err: impl Into<GenericError>) -> Self {
        ChannelError::Transport(err.into())
    }
}

/// Outbound half of a channel. Handles are shared across namespace cycles,
/// so implementations must tolerate concurrent publishes.
#[async_trait]
pub trait ChannelPublisher: Send + Sync {
    /// Publishes one keyed record and waits until the transport has accepted
    /// it. Records published to the same topic are delivered in publish
    /// order.
    async fn publish(&self, topic: &str, key: &str, payload: Bytes) -> Result<(), ChannelError>;

    /// Flushes buffered records and releases the publisher.
    async fn close(&self) -> Result<(), ChannelError>;
}

/// Inbound half of a channel.
#[async_trait]
pub trait ChannelSubscriber: Send + Sync {
    /// Adds a topic to the subscription set. Subscribing to an already
    /// subscribed topic is a no-op, so callers may subscribe on every cycle.
    async fn subscribe(&self, topic: &str) -> Result<(), ChannelError>;

    /// Waits up to `max_wait` for records newly delivered on `topic` and
    /// returns them in delivery order. Returns as soon as at least one record
    /// is available, or empty once the wait is up.
    async fn poll(
        &self,
        topic: &str,
        max_wait: Duration,
    ) -> Result<Vec<ChannelRecord>, ChannelError>;

    /// Drops all subscriptions and releases the subscriber.
    async fn close(&self) -> Result<(), ChannelError>;
}

/// Factory for the two process-wide channel handles.
pub trait ChannelTransport: Send + Sync + 'static {
    type Publisher: ChannelPublisher + 'static;
    type Subscriber: ChannelSubscriber + 'static;

    fn create_publisher(&self, options: &BrokerOptions) -> Result<Self::Publisher, ChannelError>;

    fn create_subscriber(&self, options: &BrokerOptions)
        -> Result<Self::Subscriber, ChannelError>;
}
