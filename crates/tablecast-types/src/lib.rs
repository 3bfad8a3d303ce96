// Copyright (c) 2024 - 2026 Tablecast contributors.
// All rights reserved.
//
// Use of this software is governed by the Apache License, Version 2.0
// included in the LICENSE file.

//! This crate contains the core types shared by the tablecast components.

mod namespace;
mod time;
mod version;
mod watermark;

pub mod config;
pub mod errors;
pub mod wire;

pub use namespace::*;
pub use time::MillisSinceEpoch;
pub use version::*;
pub use watermark::*;

/// Trait for merging two attributes
pub trait Merge {
    /// Return true if the value was mutated as a result of the merge
    fn merge(&mut self, other: Self) -> bool;
}
