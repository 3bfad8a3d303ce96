// Copyright (c) 2024 - 2026 Tablecast contributors.
// All rights reserved.
//
// Use of this software is governed by the Apache License, Version 2.0
// included in the LICENSE file.

use tablecast_channel::ChannelError;
use tablecast_types::InvalidVersionMarker;

use crate::source::SourceError;

/// Cycle-level failures. Any of these means the cycle did not advance; the
/// caller keeps its previous version marker and retries on its own schedule.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("namespace '{0}' has no broker configuration")]
    MissingBrokerConfig(String),
    #[error(transparent)]
    InvalidVersion(#[from] InvalidVersionMarker),
    #[error("cannot determine the last-modified timestamp of table '{0}'")]
    UnknownLastModified(String),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Channel(#[from] ChannelError),
}
