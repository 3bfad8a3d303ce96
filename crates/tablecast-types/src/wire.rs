// Copyright (c) 2024 - 2026 Tablecast contributors.
// All rights reserved.
//
// Use of this software is governed by the Apache License, Version 2.0
// included in the LICENSE file.

//! Logical payload published per row.
//!
//! A row travels on the channel as a self-describing JSON object mapping
//! column name to value, e.g. `{"id":"A","name":"x","updated_at":1704067200000}`.
//! The JSON shapes are the wire contract: `null`, an integer (milliseconds
//! since the unix epoch, used by update-timestamp columns) or a string.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::time::MillisSinceEpoch;

/// One column's value as it travels on the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnValue {
    Null,
    Millis(MillisSinceEpoch),
    Text(String),
}

impl ColumnValue {
    /// Renders the value the way cache rows store it. Null values become the
    /// empty string.
    pub fn render(&self) -> String {
        match self {
            ColumnValue::Null => String::new(),
            ColumnValue::Millis(millis) => millis.as_i64().to_string(),
            ColumnValue::Text(text) => text.clone(),
        }
    }

    pub fn as_millis(&self) -> Option<MillisSinceEpoch> {
        match self {
            ColumnValue::Millis(millis) => Some(*millis),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }
}

impl From<&str> for ColumnValue {
    fn from(value: &str) -> Self {
        ColumnValue::Text(value.to_owned())
    }
}

impl From<String> for ColumnValue {
    fn from(value: String) -> Self {
        ColumnValue::Text(value)
    }
}

impl From<MillisSinceEpoch> for ColumnValue {
    fn from(value: MillisSinceEpoch) -> Self {
        ColumnValue::Millis(value)
    }
}

/// Column name to value mapping for one row.
///
/// Decoding accepts any JSON object; columns a descriptor does not declare
/// are kept in the map and ignored by the applier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowEnvelope {
    columns: BTreeMap<String, ColumnValue>,
}

impl RowEnvelope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: ColumnValue) {
        self.columns.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&ColumnValue> {
        self.columns.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Renders the declared columns in declaration order, defaulting columns
    /// missing from the map to the empty string. This is the shape cache
    /// rows are stored in.
    pub fn render_columns(&self, columns: &[String]) -> Vec<String> {
        columns
            .iter()
            .map(|column| {
                self.get(column)
                    .map(ColumnValue::render)
                    .unwrap_or_default()
            })
            .collect()
    }

    pub fn encode(&self) -> Result<Bytes, WireError> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    pub fn decode(payload: &[u8]) -> Result<Self, WireError> {
        Ok(serde_json::from_slice(payload)?)
    }
}

impl FromIterator<(String, ColumnValue)> for RowEnvelope {
    fn from_iter<T: IntoIterator<Item = (String, ColumnValue)>>(iter: T) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("malformed row payload: {0}")]
pub struct WireError(#[from] serde_json::Error);
