// Copyright (c) 2024 - 2026 Tablecast contributors.
// All rights reserved.
//
// Use of this software is governed by the Apache License, Version 2.0
// included in the LICENSE file.

use std::sync::Arc;

use tracing::{debug, info_span, Instrument};

use tablecast_channel::{BrokerChannelManager, ChannelTransport};
use tablecast_types::config::PopulatorOptions;
use tablecast_types::{Namespace, NamespaceCache, NamespaceRole, VersionMarker};

use crate::error::Error;
use crate::follower::FollowerApplier;
use crate::leader::LeaderExtractor;
use crate::metric_definitions;
use crate::source::TableSource;

/// Drives refresh cycles for replicated lookup namespaces.
///
/// One populator serves every namespace on the node; channel handles are
/// shared through the [`BrokerChannelManager`] and created on first use. The
/// caller owns the schedule and invokes [`Self::populate`] once per cycle.
pub struct CachePopulator<T: ChannelTransport> {
    source: Arc<dyn TableSource>,
    channels: Arc<BrokerChannelManager<T>>,
    options: PopulatorOptions,
}

impl<T: ChannelTransport> CachePopulator<T> {
    pub fn new(
        source: Arc<dyn TableSource>,
        channels: Arc<BrokerChannelManager<T>>,
        options: PopulatorOptions,
    ) -> Self {
        metric_definitions::describe_metrics();
        Self {
            source,
            channels,
            options,
        }
    }

    /// Runs one refresh cycle for `namespace` and returns the version marker
    /// the caller should persist and pass back as `last_version` on the next
    /// cycle.
    ///
    /// No-op cycles echo `last_version` back unchanged. On error the caller
    /// must keep its previous marker; nothing was advanced.
    pub async fn populate(
        &self,
        id: &str,
        namespace: &Namespace,
        last_version: Option<&str>,
        cache: &NamespaceCache,
    ) -> Result<Option<String>, Error> {
        let descriptor = &namespace.descriptor;
        let span = info_span!(
            "populate_namespace",
            namespace = %id,
            role = %descriptor.role,
        );
        async {
            let Some(broker) = descriptor.broker.as_ref() else {
                return Err(Error::MissingBrokerConfig(id.to_owned()));
            };
            let last_check = VersionMarker::parse_or_floor(last_version)?;

            // A disabled follower cache has nothing to apply records to, so
            // the cycle ends before any database or channel work.
            if !descriptor.cache_enabled && !descriptor.role.is_leader() {
                debug!("Namespace cache disabled, echoing the last checked version");
                return Ok(Some(last_check.to_string()));
            }

            let last_db_update = self
                .source
                .last_modified(&descriptor.table, &descriptor.ts_column)
                .await?;

            if let Some(last_db_update) = last_db_update {
                if VersionMarker::new(last_db_update) <= last_check {
                    debug!(%last_db_update, "Source table unchanged, nothing to refresh");
                    namespace.state.watermark.observe(last_db_update);
                    return Ok(last_version.map(str::to_owned));
                }
            }

            match descriptor.role {
                NamespaceRole::Leader => {
                    // Publishing a snapshot bound to an unknown timestamp
                    // would hand out a version marker that can never gate.
                    let last_db_update = last_db_update
                        .ok_or_else(|| Error::UnknownLastModified(descriptor.table.clone()))?;
                    let publisher = self.channels.publisher(broker).await?;
                    let extractor =
                        LeaderExtractor::new(publisher.as_ref(), self.source.as_ref());
                    let version = extractor
                        .run(
                            namespace,
                            last_db_update,
                            descriptor.cache_enabled.then_some(cache),
                        )
                        .await?;
                    Ok(Some(version.to_string()))
                }
                NamespaceRole::Follower => {
                    let subscriber = self.channels.subscriber(broker).await?;
                    let applier =
                        FollowerApplier::new(subscriber.as_ref(), self.options.poll_wait.into());
                    let version = applier.run(namespace, cache).await?;
                    Ok(Some(version.to_string()))
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Releases the shared channel handles. Call once, after in-flight cycles
    /// have drained; later cycles would recreate the handles on demand.
    pub async fn stop(&self) -> Result<(), Error> {
        self.channels.stop().await?;
        Ok(())
    }
}
