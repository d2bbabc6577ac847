//! Translation trees and the recursive merge used by the synchronizer.
//!
//! A translation file is a nested mapping whose leaves are message strings.
//! Keys are kept in a `BTreeMap` so that serialised output is stable across
//! runs.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Mapping from translation key to its (possibly nested) value.
pub type TranslationMap = BTreeMap<String, TranslationNode>;

/// A single value in a translation tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TranslationNode {
    Leaf(String),
    Branch(TranslationMap),
}

impl TranslationNode {
    pub fn leaf(value: impl Into<String>) -> Self {
        TranslationNode::Leaf(value.into())
    }
}

/// Errors raised while converting a YAML document into a translation tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("top-level document must be a mapping, found {0}")]
    NotAMapping(&'static str),

    #[error("unsupported {kind} value at '{path}'")]
    UnsupportedValue { path: String, kind: &'static str },

    #[error("unsupported {kind} key under '{path}'")]
    UnsupportedKey { path: String, kind: &'static str },
}

/// Merge `overrides` into `base`.
///
/// When both sides hold a branch for the same key the branches are merged
/// recursively; in every other collision the value from `overrides` wins.
/// Keys present on only one side are kept as they are.
pub fn merge_recursive(base: TranslationMap, overrides: TranslationMap) -> TranslationMap {
    let mut merged = base;

    for (key, value) in overrides {
        let combined = match (merged.remove(&key), value) {
            (Some(TranslationNode::Branch(left)), TranslationNode::Branch(right)) => {
                TranslationNode::Branch(merge_recursive(left, right))
            }
            (_, value) => value,
        };
        merged.insert(key, combined);
    }

    merged
}

/// Convert a parsed YAML document into a translation map.
///
/// An empty document (`null`) is an empty map. Scalars are stringified,
/// `null` leaves become empty strings, sequences and tagged values are
/// rejected.
pub fn from_yaml(document: Value) -> Result<TranslationMap, TreeError> {
    match document {
        Value::Null => Ok(TranslationMap::new()),
        Value::Mapping(mapping) => convert_mapping(mapping, ""),
        other => Err(TreeError::NotAMapping(kind_of(&other))),
    }
}

fn convert_mapping(mapping: serde_yaml::Mapping, parent: &str) -> Result<TranslationMap, TreeError> {
    let mut map = TranslationMap::new();

    for (key, value) in mapping {
        let key = scalar_to_string(&key).ok_or_else(|| TreeError::UnsupportedKey {
            path: parent.to_string(),
            kind: kind_of(&key),
        })?;
        let path = if parent.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", parent, key)
        };

        let node = match value {
            Value::Mapping(children) => TranslationNode::Branch(convert_mapping(children, &path)?),
            Value::Null => TranslationNode::Leaf(String::new()),
            other => match scalar_to_string(&other) {
                Some(text) => TranslationNode::Leaf(text),
                None => {
                    return Err(TreeError::UnsupportedValue {
                        path,
                        kind: kind_of(&other),
                    })
                }
            },
        };
        map.insert(key, node);
    }

    Ok(map)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged",
    }
}
