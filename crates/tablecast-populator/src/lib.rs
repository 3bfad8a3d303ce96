// Copyright (c) 2024 - 2026 Tablecast contributors.
// All rights reserved.
//
// Use of this software is governed by the Apache License, Version 2.0
// included in the LICENSE file.

//! Leader/follower population of replicated lookup caches.
//!
//! Every node keeps an identical in-memory copy of a relational lookup table.
//! For each namespace exactly one node, the leader, reads the table and
//! republishes every row onto a durable ordered channel; all other nodes
//! consume that channel and apply the rows to their local caches. A version
//! marker derived from the table's newest update timestamp gates cycles so
//! unchanged tables cost nothing.

mod error;
mod follower;
mod leader;
mod mapper;
mod metric_definitions;
mod populator;
mod source;

pub use error::Error;
pub use follower::{ApplyError, BatchReport};
pub use mapper::PublishingRowMapper;
pub use populator::CachePopulator;
pub use source::{RowSink, SourceError, TableSource};
