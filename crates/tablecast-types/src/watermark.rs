// Copyright (c) 2024 - 2026 Tablecast contributors.
// All rights reserved.
//
// Use of this software is governed by the Apache License, Version 2.0
// included in the LICENSE file.

use parking_lot::Mutex;

use crate::time::MillisSinceEpoch;
use crate::Merge;

/// Timestamps merge by keeping the newest value. A stale or equal candidate
/// leaves the current value untouched, so the merged value never regresses.
impl Merge for Option<MillisSinceEpoch> {
    fn merge(&mut self, other: Self) -> bool {
        let Some(candidate) = other else {
            return false;
        };
        match self {
            Some(current) if *current >= candidate => false,
            _ => {
                *self = Some(candidate);
                true
            }
        }
    }
}

/// Newest row timestamp a namespace has observed across refresh cycles.
///
/// Shared between the cycle that advances it and whoever reads it back as the
/// namespace's version; all writes go through the monotonic merge rule.
#[derive(Debug, Default)]
pub struct Watermark(Mutex<Option<MillisSinceEpoch>>);

impl Watermark {
    /// Merges a candidate timestamp into the watermark. Returns true if the
    /// watermark advanced.
    pub fn observe(&self, candidate: MillisSinceEpoch) -> bool {
        self.0.lock().merge(Some(candidate))
    }

    pub fn get(&self) -> Option<MillisSinceEpoch> {
        *self.0.lock()
    }
}
