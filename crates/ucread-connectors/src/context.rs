//! The read context an orchestration host hands to an input manager.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::error::{ConnectorError, ConnectorResult};

/// Metadata attached to an output or an input by the host.
pub type Metadata = serde_json::Map<String, Value>;

/// Partition keys a read is scoped to.
pub type PartitionSubset = BTreeSet<String>;

#[derive(Debug, Clone, Default)]
pub struct InputContext {
    /// Metadata of the upstream output being read, if the host knows it.
    pub upstream_output: Option<Metadata>,
    /// Metadata of the current input.
    pub metadata: Metadata,
    /// Partitions in scope for this read, if the asset is partitioned.
    pub asset_partitions: Option<PartitionSubset>,
}

impl InputContext {
    pub fn new(upstream_output: Metadata) -> Self {
        Self {
            upstream_output: Some(upstream_output),
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_partitions<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.asset_partitions = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn has_asset_partitions(&self) -> bool {
        self.asset_partitions.is_some()
    }

    /// Upstream metadata overlaid with the current input's metadata.
    pub fn merged_metadata(&self) -> Metadata {
        let mut merged = self.upstream_output.clone().unwrap_or_default();
        for (key, value) in &self.metadata {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }
}

/// Fetch an optional string value. `null` counts as absent.
pub(crate) fn optional_str(metadata: &Metadata, key: &str) -> ConnectorResult<Option<String>> {
    match metadata.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ConnectorError::InvalidMetadata(format!(
            "'{}' must be a string, got {}",
            key, other
        ))),
    }
}

/// Fetch a required, non-empty string value.
pub(crate) fn required_str(metadata: &Metadata, key: &str) -> ConnectorResult<String> {
    match optional_str(metadata, key)? {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(ConnectorError::MissingMetadata(key.to_string())),
    }
}

/// Fetch an optional list of strings. `null` counts as empty.
pub(crate) fn string_list(metadata: &Metadata, key: &str) -> ConnectorResult<Vec<String>> {
    match metadata.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(ConnectorError::InvalidMetadata(format!(
                    "'{}' entries must be strings, got {}",
                    key, other
                ))),
            })
            .collect(),
        Some(other) => Err(ConnectorError::InvalidMetadata(format!(
            "'{}' must be a list of strings, got {}",
            key, other
        ))),
    }
}
