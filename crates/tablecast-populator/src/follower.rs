// Copyright (c) 2024 - 2026 Tablecast contributors.
// All rights reserved.
//
// Use of this software is governed by the Apache License, Version 2.0
// included in the LICENSE file.

use std::time::Duration;

use metrics::counter;
use tracing::{debug, warn};

use tablecast_channel::{ChannelRecord, ChannelSubscriber};
use tablecast_types::wire::{RowEnvelope, WireError};
use tablecast_types::{
    MillisSinceEpoch, Namespace, NamespaceCache, NamespaceDescriptor, NamespaceState,
    VersionMarker,
};

use crate::error::Error;
use crate::metric_definitions::{TABLECAST_ROWS_APPLIED, TABLECAST_ROWS_SKIPPED};

/// Per-record failures on the apply path. These are never fatal to the
/// batch; the offending record is skipped, counted and logged.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("record carries no key")]
    MissingKey,
    #[error("record carries no payload")]
    MissingPayload,
    #[error(transparent)]
    Decode(#[from] WireError),
    #[error("decoded row carries no value under primary-key column '{0}'")]
    MissingPrimaryKey(String),
    #[error("value under timestamp column '{0}' is not integer milliseconds")]
    InvalidTimestamp(String),
}

/// Outcome of applying one polled batch to the local cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub applied: usize,
    pub skipped: usize,
}

/// Follower path: drains the namespace topic and applies each record to the
/// local cache, tracking the newest update timestamp seen so far.
pub(crate) struct FollowerApplier<'a, S: ?Sized> {
    subscriber: &'a S,
    poll_wait: Duration,
}

impl<'a, S: ChannelSubscriber + ?Sized> FollowerApplier<'a, S> {
    pub(crate) fn new(subscriber: &'a S, poll_wait: Duration) -> Self {
        Self {
            subscriber,
            poll_wait,
        }
    }

    /// Polls one batch and applies it. Returns the namespace watermark as
    /// the new version marker, or "0" when no update timestamp has ever been
    /// observed.
    pub(crate) async fn run(
        &self,
        namespace: &Namespace,
        cache: &NamespaceCache,
    ) -> Result<VersionMarker, Error> {
        let descriptor = &namespace.descriptor;
        self.subscriber.subscribe(&descriptor.topic).await?;
        let records = self
            .subscriber
            .poll(&descriptor.topic, self.poll_wait)
            .await?;

        let report = apply_batch(descriptor, &namespace.state, cache, &records);
        counter!(TABLECAST_ROWS_APPLIED, "topic" => descriptor.topic.clone())
            .increment(report.applied as u64);
        counter!(TABLECAST_ROWS_SKIPPED, "topic" => descriptor.topic.clone())
            .increment(report.skipped as u64);
        debug!(
            applied = report.applied,
            skipped = report.skipped,
            topic = %descriptor.topic,
            "Applied channel batch"
        );

        Ok(namespace
            .state
            .watermark
            .get()
            .map(VersionMarker::new)
            .unwrap_or_else(|| VersionMarker::new(MillisSinceEpoch::UNIX_EPOCH)))
    }
}

/// Applies every record in the batch, isolating malformed records so one bad
/// message can never stall the namespace.
pub(crate) fn apply_batch(
    descriptor: &NamespaceDescriptor,
    state: &NamespaceState,
    cache: &NamespaceCache,
    records: &[ChannelRecord],
) -> BatchReport {
    let mut report = BatchReport::default();
    for record in records {
        match apply_record(descriptor, state, cache, record) {
            Ok(()) => report.applied += 1,
            Err(err) => {
                report.skipped += 1;
                warn!(
                    topic = %record.topic,
                    key = record.key.as_deref().unwrap_or(""),
                    "Skipping channel record: {err}"
                );
            }
        }
    }
    report
}

fn apply_record(
    descriptor: &NamespaceDescriptor,
    state: &NamespaceState,
    cache: &NamespaceCache,
    record: &ChannelRecord,
) -> Result<(), ApplyError> {
    if record.key.is_none() {
        return Err(ApplyError::MissingKey);
    }
    let Some(payload) = record.payload.as_ref() else {
        return Err(ApplyError::MissingPayload);
    };

    let row = RowEnvelope::decode(payload)?;

    // The cache key comes from the decoded row, not the record key; the two
    // agree for records produced by the leader.
    let key = match row.get(&descriptor.primary_key_column) {
        Some(value) if !value.is_null() => value.render(),
        _ => {
            return Err(ApplyError::MissingPrimaryKey(
                descriptor.primary_key_column.clone(),
            ));
        }
    };

    // Validate the update timestamp before mutating anything. A null value
    // is allowed and simply leaves the watermark alone.
    let update_ts = match row.get(&descriptor.ts_column) {
        Some(value) if !value.is_null() => Some(
            value
                .as_millis()
                .ok_or_else(|| ApplyError::InvalidTimestamp(descriptor.ts_column.clone()))?,
        ),
        _ => None,
    };

    if let Some(update_ts) = update_ts {
        state.watermark.observe(update_ts);
    }
    cache.insert(key, row.render_columns(&descriptor.columns));
    Ok(())
}
