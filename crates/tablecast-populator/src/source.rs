// Copyright (c) 2024 - 2026 Tablecast contributors.
// All rights reserved.
//
// Use of this software is governed by the Apache License, Version 2.0
// included in the LICENSE file.

use async_trait::async_trait;

use tablecast_types::errors::GenericError;
use tablecast_types::wire::RowEnvelope;
use tablecast_types::MillisSinceEpoch;

/// Relational source of namespace rows. Connection handling, dialects and
/// statement execution all live behind this seam; the populator only supplies
/// query text and consumes rows.
#[async_trait]
pub trait TableSource: Send + Sync {
    /// Returns the newest value of `ts_column` across `table`, or `None` when
    /// the source cannot tell (empty or unknown table).
    async fn last_modified(
        &self,
        table: &str,
        ts_column: &str,
    ) -> Result<Option<MillisSinceEpoch>, SourceError>;

    /// Runs the projection `query` and feeds every result row to `sink` in
    /// result-set order, stopping at the first sink error. Returns the number
    /// of rows fed through.
    ///
    /// `last_modified` is the change floor that triggered the scan. Sources
    /// may use it to narrow the read; re-reading the whole table is the
    /// expected default and the apply side stays correct either way.
    async fn scan_rows(
        &self,
        query: &str,
        last_modified: MillisSinceEpoch,
        sink: &mut (dyn RowSink + Send),
    ) -> Result<usize, SourceError>;
}

/// Per-row callback driven by [`TableSource::scan_rows`].
#[async_trait]
pub trait RowSink: Send {
    async fn accept(&mut self, row: RowEnvelope) -> Result<(), GenericError>;
}

#[derive(Debug, thiserror::Error)]
#[error("table source error: {0}")]
pub struct SourceError(#[from] GenericError);

impl SourceError {
    pub fn new(err: impl Into<GenericError>) -> Self {
        SourceError(err.into())
    }
}
