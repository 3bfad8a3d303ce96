// Copyright (c) 2024 - 2026 Tablecast contributors.
// All rights reserved.
//
// Use of this software is governed by the Apache License, Version 2.0
// included in the LICENSE file.

/// Optional to have but adds description/help message in the prometheus endpoint
use metrics::{describe_counter, Unit};

pub const TABLECAST_ROWS_PUBLISHED: &str = "tablecast.populator.rows_published.total";
pub const TABLECAST_ROWS_APPLIED: &str = "tablecast.populator.rows_applied.total";
pub const TABLECAST_ROWS_SKIPPED: &str = "tablecast.populator.rows_skipped.total";

pub(crate) fn describe_metrics() {
    describe_counter!(
        TABLECAST_ROWS_PUBLISHED,
        Unit::Count,
        "Number of rows published to the broker channel by leader cycles"
    );
    describe_counter!(
        TABLECAST_ROWS_APPLIED,
        Unit::Count,
        "Number of channel records applied to the local namespace cache"
    );
    describe_counter!(
        TABLECAST_ROWS_SKIPPED,
        Unit::Count,
        "Number of malformed channel records skipped during apply"
    );
}
