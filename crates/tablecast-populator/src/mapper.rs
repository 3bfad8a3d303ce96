// Copyright (c) 2024 - 2026 Tablecast contributors.
// All rights reserved.
//
// Use of this software is governed by the Apache License, Version 2.0
// included in the LICENSE file.

use async_trait::async_trait;
use metrics::counter;

use tablecast_channel::ChannelPublisher;
use tablecast_types::errors::GenericError;
use tablecast_types::wire::RowEnvelope;
use tablecast_types::{NamespaceCache, NamespaceDescriptor};

use crate::metric_definitions::TABLECAST_ROWS_PUBLISHED;
use crate::source::RowSink;

#[derive(Debug, thiserror::Error)]
#[error("scanned row carries no value under primary-key column '{column}'")]
struct MissingPrimaryKey {
    column: String,
}

/// Row sink driven by the leader's table scan. Every row is encoded and
/// published keyed by its rendered primary key; rows are also written through
/// to the local cache when one is attached.
pub struct PublishingRowMapper<'a, P: ?Sized> {
    publisher: &'a P,
    descriptor: &'a NamespaceDescriptor,
    cache: Option<&'a NamespaceCache>,

    rows_published_counter: metrics::Counter,
}

impl<'a, P: ChannelPublisher + ?Sized> PublishingRowMapper<'a, P> {
    pub fn new(
        publisher: &'a P,
        descriptor: &'a NamespaceDescriptor,
        cache: Option<&'a NamespaceCache>,
    ) -> Self {
        Self {
            publisher,
            cache,
            rows_published_counter: counter!(
                TABLECAST_ROWS_PUBLISHED,
                "topic" => descriptor.topic.clone()
            ),
            descriptor,
        }
    }
}

#[async_trait]
impl<P: ChannelPublisher + ?Sized> RowSink for PublishingRowMapper<'_, P> {
    async fn accept(&mut self, row: RowEnvelope) -> Result<(), GenericError> {
        // A scanned row without a primary key means the projection itself is
        // broken; fail the extraction rather than publish an unkeyed record.
        let key = match row.get(&self.descriptor.primary_key_column) {
            Some(value) if !value.is_null() => value.render(),
            _ => {
                return Err(MissingPrimaryKey {
                    column: self.descriptor.primary_key_column.clone(),
                }
                .into());
            }
        };

        let payload = row.encode()?;
        self.publisher
            .publish(&self.descriptor.topic, &key, payload)
            .await?;
        self.rows_published_counter.increment(1);

        if let Some(cache) = self.cache {
            cache.insert(key, row.render_columns(&self.descriptor.columns));
        }

        Ok(())
    }
}
