//! Configuration merge logic
//!
//! Every source produces a flat layer of `key -> value` pairs. Layers are
//! folded left to right:
//! - Keys compare case-insensitively
//! - Later layers override earlier ones (value and spelling)
//! - An absent value (`None`) still overrides
//!
//! Hierarchy is expressed in the key itself, segments joined by `:`.

use serde_json::Value;
use std::collections::BTreeMap;

/// Separator between key segments (`Logging:Level`).
pub const KEY_DELIMITER: &str = ":";

/// One source's contribution, in the order the source produced it.
pub type Layer = Vec<(String, Option<String>)>;

/// A merged key with the index of the source that supplied it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: Option<String>,
    pub source: usize,
}

/// Result of folding all layers.
#[derive(Debug, Clone, Default)]
pub struct MergedSettings {
    entries: BTreeMap<String, Entry>,
}

/// Lookup form of a key.
pub fn normalize_key(key: &str) -> String {
    key.to_lowercase()
}

/// Join a parent path and a child segment.
pub fn combine_key(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{}{}{}", parent, KEY_DELIMITER, child)
    }
}

impl MergedSettings {
    /// Apply one layer on top of what is already merged.
    pub fn overlay(&mut self, layer: Layer, source: usize) {
        for (key, value) in layer {
            self.entries
                .insert(normalize_key(&key), Entry { key, value, source });
        }
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.get(&normalize_key(key))
    }

    /// Entries ordered by normalised key.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Merge layers in order (first is base, last has highest precedence)
pub fn merge_layers(layers: Vec<Layer>) -> MergedSettings {
    layers
        .into_iter()
        .enumerate()
        .fold(MergedSettings::default(), |mut merged, (index, layer)| {
            merged.overlay(layer, index);
            merged
        })
}

/// Flatten a JSON value into `:`-joined keys.
///
/// Objects recurse by key, arrays by index. Scalars become their JSON text
/// (strings unquoted) and `null` becomes `None`. Empty objects and arrays
/// contribute nothing.
pub fn flatten_value(value: &Value) -> Layer {
    let mut layer = Vec::new();
    flatten_into(value, String::new(), false, &mut layer);
    layer
}

/// Like [`flatten_value`], but an empty object or array is kept as a key
/// with no value so the section still exists after flattening.
pub fn flatten_sections(value: &Value) -> Layer {
    let mut layer = Vec::new();
    flatten_into(value, String::new(), true, &mut layer);
    layer
}

fn flatten_into(value: &Value, path: String, keep_empty: bool, layer: &mut Layer) {
    match value {
        Value::Object(map) if map.is_empty() && keep_empty => layer.push((path, None)),
        Value::Array(items) if items.is_empty() && keep_empty => layer.push((path, None)),
        Value::Object(map) => {
            for (key, child) in map {
                flatten_into(child, combine_key(&path, key), keep_empty, layer);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(child, combine_key(&path, &index.to_string()), keep_empty, layer);
            }
        }
        Value::Null => layer.push((path, None)),
        Value::String(s) => layer.push((path, Some(s.clone()))),
        Value::Bool(b) => layer.push((path, Some(b.to_string()))),
        Value::Number(n) => layer.push((path, Some(n.to_string()))),
    }
}
