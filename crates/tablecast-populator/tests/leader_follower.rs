// Copyright (c) 2024 - 2026 Tablecast contributors.
// All rights reserved.
//
// Use of this software is governed by the Apache License, Version 2.0
// included in the LICENSE file.

//! End-to-end round trips between a leader node and a follower node sharing
//! one in-memory channel.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use googletest::prelude::*;

use tablecast_channel::{
    BrokerChannelManager, ChannelPublisher, ChannelTransport, MemoryChannel,
};
use tablecast_populator::{CachePopulator, RowSink, SourceError, TableSource};
use tablecast_types::config::{BrokerOptions, BrokerOptionsBuilder, PopulatorOptions};
use tablecast_types::wire::RowEnvelope;
use tablecast_types::{
    MillisSinceEpoch, Namespace, NamespaceCache, NamespaceDescriptor, NamespaceRole,
};

struct FixedTableSource {
    last_modified: i64,
    rows: Vec<RowEnvelope>,
}

#[async_trait]
impl TableSource for FixedTableSource {
    async fn last_modified(
        &self,
        _table: &str,
        _ts_column: &str,
    ) -> Result<Option<MillisSinceEpoch>, SourceError> {
        Ok(Some(MillisSinceEpoch::new(self.last_modified)))
    }

    async fn scan_rows(
        &self,
        _query: &str,
        _last_modified: MillisSinceEpoch,
        sink: &mut (dyn RowSink + Send),
    ) -> Result<usize, SourceError> {
        for row in &self.rows {
            sink.accept(row.clone()).await.map_err(SourceError::new)?;
        }
        Ok(self.rows.len())
    }
}

fn broker() -> BrokerOptions {
    BrokerOptionsBuilder::default()
        .brokers(vec!["local".to_owned()])
        .build()
        .unwrap()
}

fn descriptor(topic: &str, role: NamespaceRole) -> NamespaceDescriptor {
    NamespaceDescriptor {
        table: topic.to_owned(),
        columns: vec!["id".to_owned(), "name".to_owned(), "updated_at".to_owned()],
        primary_key_column: "id".to_owned(),
        ts_column: "updated_at".to_owned(),
        role,
        cache_enabled: true,
        broker: Some(broker()),
        topic: topic.to_owned(),
    }
}

fn row(id: &str, name: &str, ts: i64) -> RowEnvelope {
    let mut row = RowEnvelope::new();
    row.insert("id", id.into());
    row.insert("name", name.into());
    row.insert("updated_at", MillisSinceEpoch::new(ts).into());
    row
}

fn node(
    transport: &MemoryChannel,
    source: FixedTableSource,
) -> CachePopulator<MemoryChannel> {
    CachePopulator::new(
        Arc::new(source),
        Arc::new(BrokerChannelManager::new(transport.clone())),
        PopulatorOptions::default(),
    )
}

#[test_log::test(tokio::test)]
async fn replicates_a_table_to_a_follower_cache() -> Result<()> {
    let transport = MemoryChannel::default();
    let rows = vec![row("A", "acme", 100), row("B", "initech", 200)];

    // Two nodes looking at the same table, one leader and one follower.
    let leader = node(
        &transport,
        FixedTableSource {
            last_modified: 200,
            rows: rows.clone(),
        },
    );
    let follower = node(
        &transport,
        FixedTableSource {
            last_modified: 200,
            rows: rows.clone(),
        },
    );

    let leader_ns = Namespace::new(descriptor("advertiser", NamespaceRole::Leader));
    let follower_ns = Namespace::new(descriptor("advertiser", NamespaceRole::Follower));
    let leader_cache = NamespaceCache::default();
    let follower_cache = NamespaceCache::default();

    let version = leader
        .populate("advertiser", &leader_ns, None, &leader_cache)
        .await?;
    assert_that!(version.as_deref(), some(eq("200")));

    let version = follower
        .populate("advertiser", &follower_ns, None, &follower_cache)
        .await?;
    assert_that!(version.as_deref(), some(eq("200")));

    // Both nodes now hold the same rows.
    assert_eq!(leader_cache.len(), follower_cache.len());
    for entry in leader_cache.iter() {
        assert_eq!(
            follower_cache.get(entry.key()).map(|found| found.value().clone()),
            Some(entry.value().clone())
        );
    }

    // Passing the returned marker back gates the next cycle entirely.
    let version = follower
        .populate("advertiser", &follower_ns, Some("200"), &follower_cache)
        .await?;
    assert_that!(version.as_deref(), some(eq("200")));

    // Each node created exactly one handle for all of its cycles.
    assert_eq!(transport.publishers_created(), 1);
    assert_eq!(transport.subscribers_created(), 1);

    leader.stop().await?;
    follower.stop().await?;
    Ok(())
}

#[test_log::test(tokio::test)]
async fn concurrent_namespace_cycles_share_the_channel_handles() -> Result<()> {
    let transport = MemoryChannel::default();

    // Seed two namespace topics the way remote leaders would.
    let publisher = transport.create_publisher(&broker())?;
    publisher
        .publish("advertiser", "A", row("A", "acme", 100).encode()?)
        .await?;
    publisher
        .publish("campaign", "C", row("C", "launch", 300).encode()?)
        .await?;

    let populator = Arc::new(node(
        &transport,
        FixedTableSource {
            last_modified: 400,
            rows: vec![],
        },
    ));

    let mut cycles = Vec::new();
    for topic in ["advertiser", "campaign"] {
        let populator = populator.clone();
        cycles.push(tokio::spawn(async move {
            let namespace = Namespace::new(descriptor(topic, NamespaceRole::Follower));
            let cache = NamespaceCache::default();
            let version = populator.populate(topic, &namespace, None, &cache).await?;
            Ok::<_, tablecast_populator::Error>((version, cache))
        }));
    }

    for cycle in cycles {
        let (version, cache) = cycle.await??;
        assert!(version.is_some());
        assert_eq!(cache.len(), 1);
    }

    // Concurrent first use still yields a single subscriber handle.
    assert_eq!(transport.subscribers_created(), 1);
    Ok(())
}
