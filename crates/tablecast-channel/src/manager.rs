// Copyright (c) 2024 - 2026 Tablecast contributors.
// All rights reserved.
//
// Use of this software is governed by the Apache License, Version 2.0
// included in the LICENSE file.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::debug;

use tablecast_types::config::BrokerOptions;

use crate::{ChannelError, ChannelPublisher, ChannelSubscriber, ChannelTransport};

/// Owns the process-wide channel handles.
///
/// Exactly one publisher and one subscriber are created per manager, on first
/// use, no matter how many namespace cycles race on them. The first caller's
/// broker options win; later callers share the handle. Constructed once by
/// the host and passed by reference into every cycle.
pub struct BrokerChannelManager<T: ChannelTransport> {
    transport: T,
    publisher: OnceCell<Arc<T::Publisher>>,
    subscriber: OnceCell<Arc<T::Subscriber>>,
}

impl<T: ChannelTransport> BrokerChannelManager<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            publisher: OnceCell::new(),
            subscriber: OnceCell::new(),
        }
    }

    /// Returns the process-wide publisher, creating it on first use.
    pub async fn publisher(
        &self,
        options: &BrokerOptions,
    ) -> Result<Arc<T::Publisher>, ChannelError> {
        self.publisher
            .get_or_try_init(|| async {
                debug!("Creating the process-wide channel publisher");
                Ok(Arc::new(self.transport.create_publisher(options)?))
            })
            .await
            .map(Arc::clone)
    }

    /// Returns the process-wide subscriber, creating it on first use.
    pub async fn subscriber(
        &self,
        options: &BrokerOptions,
    ) -> Result<Arc<T::Subscriber>, ChannelError> {
        self.subscriber
            .get_or_try_init(|| async {
                debug!("Creating the process-wide channel subscriber");
                Ok(Arc::new(self.transport.create_subscriber(options)?))
            })
            .await
            .map(Arc::clone)
    }

    /// Releases whichever handles were created: flushes and closes the
    /// publisher, unsubscribes and closes the subscriber. Safe to call when
    /// neither exists, and after cycles have drained.
    pub async fn stop(&self) -> Result<(), ChannelError> {
        if let Some(publisher) = self.publisher.get() {
            publisher.close().await?;
        }
        if let Some(subscriber) = self.subscriber.get() {
            subscriber.close().await?;
        }
        debug!("Channel manager stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use googletest::prelude::*;

    use crate::memory::MemoryChannel;

    fn options() -> BrokerOptions {
        BrokerOptions {
            brokers: vec!["in-memory".to_owned()],
            additional_options: Default::default(),
        }
    }

    #[test_log::test(tokio::test)]
    async fn concurrent_first_use_creates_one_handle_of_each() -> Result<()> {
        let transport = MemoryChannel::new();
        let manager = Arc::new(BrokerChannelManager::new(transport.clone()));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move {
                    let publisher = manager.publisher(&options()).await?;
                    let subscriber = manager.subscriber(&options()).await?;
                    Ok::<_, ChannelError>((publisher, subscriber))
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_that!(transport.publishers_created(), eq(1));
        assert_that!(transport.subscribers_created(), eq(1));
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn stop_without_handles_is_a_noop() {
        let manager = BrokerChannelManager::new(MemoryChannel::new());
        manager.stop().await.unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn stop_releases_created_handles() -> Result<()> {
        let transport = MemoryChannel::new();
        let manager = BrokerChannelManager::new(transport.clone());

        manager.publisher(&options()).await?;
        manager.stop().await?;

        assert_that!(transport.publishers_created(), eq(1));
        assert_that!(transport.subscribers_created(), eq(0));
        Ok(())
    }
}
