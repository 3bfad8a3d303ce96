// Copyright (c) 2024 - 2026 Tablecast contributors.
// All rights reserved.
//
// Use of this software is governed by the Apache License, Version 2.0
// included in the LICENSE file.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::config::BrokerOptions;
use crate::watermark::Watermark;

/// Role a node plays for one namespace. Assigned externally and never
/// re-elected by this component.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "kebab-case")]
pub enum NamespaceRole {
    /// Reads the source table and republishes every row onto the channel.
    #[display("leader")]
    Leader,
    /// Consumes the channel and applies published rows to the local cache.
    #[display("follower")]
    Follower,
}

impl NamespaceRole {
    pub fn is_leader(&self) -> bool {
        matches!(self, NamespaceRole::Leader)
    }
}

/// # Namespace descriptor
///
/// Static configuration of one replicated lookup namespace. Immutable for the
/// lifetime of a refresh cycle; owned by the caller and passed by reference
/// into the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NamespaceDescriptor {
    /// Source table the leader projects.
    pub table: String,

    /// Columns to replicate, in the order cache rows store them.
    pub columns: Vec<String>,

    /// Column whose rendered value keys both channel records and cache rows.
    pub primary_key_column: String,

    /// Column carrying the row's last-update timestamp as integer
    /// milliseconds since the unix epoch.
    pub ts_column: String,

    /// Role this node plays for the namespace.
    pub role: NamespaceRole,

    /// When disabled on a follower, refresh cycles skip all channel and cache
    /// work. A leader still publishes but stops writing through to the local
    /// cache.
    pub cache_enabled: bool,

    /// Channel connection properties. Refresh cycles fail without them.
    pub broker: Option<BrokerOptions>,

    /// Channel topic carrying this namespace's row stream.
    pub topic: String,
}

/// Mutable per-namespace fields tracked across refresh cycles. Only ever
/// written through the monotonic timestamp merge.
#[derive(Debug, Default)]
pub struct NamespaceState {
    /// Newest row timestamp observed so far.
    pub watermark: Watermark,
}

/// A registered namespace: immutable descriptor plus runtime state. Lives for
/// the process lifetime, or until the host tears the populator down.
#[derive(Debug)]
pub struct Namespace {
    pub descriptor: NamespaceDescriptor,
    pub state: NamespaceState,
}

impl Namespace {
    pub fn new(descriptor: NamespaceDescriptor) -> Self {
        Self {
            descriptor,
            state: NamespaceState::default(),
        }
    }
}

/// Local cache for one namespace: primary-key value to the row's column
/// values in descriptor order. Entries are replaced wholesale on update; rows
/// deleted from the source table are never removed here.
pub type NamespaceCache = DashMap<String, Vec<String>>;
