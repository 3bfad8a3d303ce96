// Copyright (c) 2024 - 2026 Tablecast contributors.
// All rights reserved.
//
// Use of this software is governed by the Apache License, Version 2.0
// included in the LICENSE file.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

/// # Broker options
///
/// Connection options for the channel broker backing a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_builder::Builder)]
#[serde(rename_all = "kebab-case")]
pub struct BrokerOptions {
    /// # Servers
    ///
    /// Initial list of brokers (host or host:port).
    pub brokers: Vec<String>,

    /// # Additional options
    ///
    /// Free floating list of broker client options, in the same form rdkafka
    /// accepts them.
    #[serde(flatten, skip_serializing_if = "HashMap::is_empty")]
    #[builder(default)]
    pub additional_options: HashMap<String, String>,
}

/// # Populator options
///
/// Tuning knobs shared by every namespace's refresh cycles.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PopulatorOptions {
    /// # Poll wait
    ///
    /// Bound on how long a follower cycle waits for newly published records
    /// before applying what it has.
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub poll_wait: humantime::Duration,
}

impl Default for PopulatorOptions {
    fn default() -> Self {
        Self {
            poll_wait: Duration::from_secs(10).into(),
        }
    }
}
