// Copyright (c) 2024 - 2026 Tablecast contributors.
// All rights reserved.
//
// Use of this software is governed by the Apache License, Version 2.0
// included in the LICENSE file.

use std::fmt;
use std::str::FromStr;

use crate::time::MillisSinceEpoch;

/// Checkpoint a caller persists between refresh cycles: the database
/// timestamp its cache reflects, rendered as integer milliseconds since the
/// unix epoch. Totally ordered by numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionMarker(MillisSinceEpoch);

impl VersionMarker {
    /// Stands in for "never refreshed". Any real table timestamp compares
    /// newer, and the value still renders back to the caller as a plain
    /// decimal string.
    pub const FLOOR: VersionMarker = VersionMarker(MillisSinceEpoch::new(i64::MIN / 2));

    pub const fn new(timestamp: MillisSinceEpoch) -> Self {
        VersionMarker(timestamp)
    }

    pub fn timestamp(&self) -> MillisSinceEpoch {
        self.0
    }

    /// Parses the caller-held version string, falling back to [`Self::FLOOR`]
    /// when the caller holds none.
    pub fn parse_or_floor(value: Option<&str>) -> Result<Self, InvalidVersionMarker> {
        value
            .map(str::parse)
            .transpose()
            .map(|parsed| parsed.unwrap_or(Self::FLOOR))
    }
}

impl From<MillisSinceEpoch> for VersionMarker {
    fn from(value: MillisSinceEpoch) -> Self {
        Self::new(value)
    }
}

impl FromStr for VersionMarker {
    type Err = InvalidVersionMarker;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        input
            .parse::<i64>()
            .map(|millis| VersionMarker(MillisSinceEpoch::new(millis)))
            .map_err(|_| InvalidVersionMarker(input.to_owned()))
    }
}

impl fmt::Display for VersionMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_i64())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("malformed version marker '{0}', expected integer milliseconds since the unix epoch")]
pub struct InvalidVersionMarker(String);
