// Copyright (c) 2024 - 2026 Tablecast contributors.
// All rights reserved.
//
// Use of this software is governed by the Apache License, Version 2.0
// included in the LICENSE file.

use tracing::{debug, info};

use tablecast_channel::ChannelPublisher;
use tablecast_types::{MillisSinceEpoch, Namespace, NamespaceCache, VersionMarker};

use crate::error::Error;
use crate::mapper::PublishingRowMapper;
use crate::source::TableSource;

/// Leader path: projects the source table and republishes every row onto the
/// namespace topic. Rows are keyed by primary key, so republishing the whole
/// table is idempotent for every consumer.
pub(crate) struct LeaderExtractor<'a, P: ?Sized> {
    publisher: &'a P,
    source: &'a dyn TableSource,
}

impl<'a, P: ChannelPublisher + ?Sized> LeaderExtractor<'a, P> {
    pub(crate) fn new(publisher: &'a P, source: &'a dyn TableSource) -> Self {
        Self { publisher, source }
    }

    /// Drives one extraction. Fails loudly if any row cannot be read,
    /// encoded or published; on success the namespace watermark advances to
    /// `last_db_update` and the new version marker is returned.
    pub(crate) async fn run(
        &self,
        namespace: &Namespace,
        last_db_update: MillisSinceEpoch,
        cache: Option<&NamespaceCache>,
    ) -> Result<VersionMarker, Error> {
        let descriptor = &namespace.descriptor;
        let query = format!(
            "SELECT {} FROM {}",
            descriptor.columns.join(","),
            descriptor.table
        );
        debug!(table = %descriptor.table, %query, "Extracting namespace table");

        let mut mapper = PublishingRowMapper::new(self.publisher, descriptor, cache);
        let rows = self
            .source
            .scan_rows(&query, last_db_update, &mut mapper)
            .await?;

        namespace.state.watermark.observe(last_db_update);
        info!(
            rows,
            topic = %descriptor.topic,
            "Republished table snapshot"
        );
        Ok(VersionMarker::new(last_db_update))
    }
}
