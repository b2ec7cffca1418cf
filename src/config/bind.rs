//! Binding merged configuration onto typed values
//!
//! The flat `a:b:c` keys are rebuilt into a tree and exposed to serde as a
//! self-describing document in which every leaf is a string. Scalars are
//! parsed on demand, struct fields match keys case-insensitively, and
//! sequences read numbered children (`items:0`, `items:1`, ...).

use serde::de::{self, DeserializeOwned, DeserializeSeed, Deserializer as _, IntoDeserializer, Visitor};
use serde::Serialize;
use std::collections::BTreeMap;

use super::error::BindError;
use super::merge::{combine_key, flatten_sections, normalize_key, Layer, KEY_DELIMITER};

/// One key segment and everything beneath it.
#[derive(Debug, Clone, Default)]
pub(crate) struct Node {
    name: String,
    value: Option<String>,
    children: BTreeMap<String, Node>,
}

impl Node {
    /// Set `key` to `value`, creating intermediate sections.
    ///
    /// An absent value never clears one that is already set.
    pub(crate) fn insert(&mut self, key: &str, value: Option<String>) {
        let mut node = self;
        if !key.is_empty() {
            for segment in key.split(KEY_DELIMITER) {
                node = node
                    .children
                    .entry(normalize_key(segment))
                    .or_insert_with(Node::default);
                node.name = segment.to_string();
            }
        }
        if value.is_some() {
            node.value = value;
        }
    }

    pub(crate) fn extend(&mut self, layer: Layer) {
        for (key, value) in layer {
            self.insert(&key, value);
        }
    }

    /// The section at `key`, if any part of the configuration lives there.
    pub(crate) fn find(&self, key: &str) -> Option<&Node> {
        if key.is_empty() {
            return Some(self);
        }
        key.split(KEY_DELIMITER)
            .try_fold(self, |node, segment| node.children.get(&normalize_key(segment)))
    }

    /// Copy `other`'s values and sections over this node.
    fn overlay(&mut self, other: &Node) {
        if other.value.is_some() {
            self.value = other.value.clone();
        }
        for (key, child) in &other.children {
            let node = self.children.entry(key.clone()).or_default();
            node.name = child.name.clone();
            node.overlay(child);
        }
    }

    fn is_blank(&self) -> bool {
        self.children.is_empty() && self.value.as_deref().map_or(true, str::is_empty)
    }
}

/// Flatten the current state of `instance` so it can serve as the lowest
/// layer of a bind.
///
/// Empty collections are kept as blank sections, so a field that no key
/// configures still deserializes to its current (empty) value.
pub(crate) fn snapshot<T: Serialize>(instance: &T) -> Result<Layer, BindError> {
    let value = serde_json::to_value(instance).map_err(|e| BindError::Snapshot(e.to_string()))?;
    Ok(flatten_sections(&value))
}

/// Deserialize `T` from the section rooted at `node`.
pub(crate) fn from_node<T: DeserializeOwned>(node: &Node, path: &str) -> Result<T, BindError> {
    T::deserialize(NodeDeserializer {
        node,
        path: path.to_string(),
    })
}

/// Deserialize `T` from the section at `key`, falling back to the default
/// when nothing (or only an empty string) is configured there.
///
/// A configured section is laid over `T::default()`, so fields it leaves
/// out keep their default.
pub(crate) fn value_or_default<T>(root: &Node, key: &str) -> Result<T, BindError>
where
    T: Serialize + DeserializeOwned + Default,
{
    match root.find(key) {
        Some(node) if !node.is_blank() => {
            let mut base = Node::default();
            base.extend(snapshot(&T::default())?);
            base.overlay(node);
            from_node(&base, key)
        }
        _ => Ok(T::default()),
    }
}

struct NodeDeserializer<'a> {
    node: &'a Node,
    path: String,
}

impl<'a> NodeDeserializer<'a> {
    fn scalar(&self, expected: &'static str) -> Result<&'a str, BindError> {
        if !self.node.children.is_empty() {
            return Err(BindError::UnexpectedShape {
                key: self.path.clone(),
                found: "a section",
                expected,
            });
        }
        self.node
            .value
            .as_deref()
            .ok_or_else(|| BindError::UnexpectedShape {
                key: self.path.clone(),
                found: "absent",
                expected,
            })
    }

    fn invalid(&self, value: &str, expected: &'static str) -> BindError {
        BindError::InvalidValue {
            key: self.path.clone(),
            value: value.to_string(),
            expected,
        }
    }

    fn child_path(&self, node: &Node) -> String {
        combine_key(&self.path, &node.name)
    }
}

macro_rules! deserialize_parsed {
    ($method:ident, $visit:ident, $ty:ty, $expected:expr) => {
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
            let raw = self.scalar($expected)?;
            let parsed = raw
                .trim()
                .parse::<$ty>()
                .map_err(|_| self.invalid(raw, $expected))?;
            visitor.$visit(parsed)
        }
    };
}

impl<'de, 'a> de::Deserializer<'de> for NodeDeserializer<'a> {
    type Error = BindError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        if !self.node.children.is_empty() {
            return self.deserialize_map(visitor);
        }
        match self.node.value.as_deref() {
            Some(value) => visitor.visit_str(value),
            None => visitor.visit_none(),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        let raw = self.scalar("a boolean")?;
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("true") {
            visitor.visit_bool(true)
        } else if trimmed.eq_ignore_ascii_case("false") {
            visitor.visit_bool(false)
        } else {
            Err(self.invalid(raw, "a boolean"))
        }
    }

    deserialize_parsed!(deserialize_i8, visit_i8, i8, "an i8");
    deserialize_parsed!(deserialize_i16, visit_i16, i16, "an i16");
    deserialize_parsed!(deserialize_i32, visit_i32, i32, "an i32");
    deserialize_parsed!(deserialize_i64, visit_i64, i64, "an i64");
    deserialize_parsed!(deserialize_u8, visit_u8, u8, "a u8");
    deserialize_parsed!(deserialize_u16, visit_u16, u16, "a u16");
    deserialize_parsed!(deserialize_u32, visit_u32, u32, "a u32");
    deserialize_parsed!(deserialize_u64, visit_u64, u64, "a u64");
    deserialize_parsed!(deserialize_f32, visit_f32, f32, "an f32");
    deserialize_parsed!(deserialize_f64, visit_f64, f64, "an f64");

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        let raw = self.scalar("a character")?;
        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => visitor.visit_char(c),
            _ => Err(self.invalid(raw, "a character")),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        if !self.node.children.is_empty() {
            return Err(BindError::UnexpectedShape {
                key: self.path,
                found: "a section",
                expected: "a string",
            });
        }
        visitor.visit_str(self.node.value.as_deref().unwrap_or(""))
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        let raw = self.scalar("bytes")?;
        visitor.visit_bytes(raw.as_bytes())
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        if self.node.is_blank() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, BindError> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, BindError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        if self.node.children.is_empty() && !self.node.is_blank() {
            return Err(BindError::UnexpectedShape {
                key: self.path,
                found: "a single value",
                expected: "a sequence",
            });
        }

        let mut indexed: Vec<(usize, &'a Node)> = self
            .node
            .children
            .values()
            .filter_map(|child| child.name.parse::<usize>().ok().map(|i| (i, child)))
            .collect();
        indexed.sort_by_key(|(i, _)| *i);

        let items = indexed
            .into_iter()
            .map(|(_, child)| (child, self.child_path(child)))
            .collect::<Vec<_>>();

        visitor.visit_seq(NodeSeqAccess {
            items: items.into_iter(),
        })
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, BindError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, BindError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        let entries = self
            .node
            .children
            .values()
            .map(|child| (child.name.clone(), child, self.child_path(child)))
            .collect::<Vec<_>>();

        visitor.visit_map(NodeMapAccess {
            entries: entries.into_iter(),
            pending: None,
        })
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, BindError> {
        if self.node.children.is_empty() && !self.node.is_blank() {
            return Err(BindError::UnexpectedShape {
                key: self.path,
                found: "a single value",
                expected: "a section",
            });
        }

        let entries = self
            .node
            .children
            .values()
            .map(|child| {
                let key = fields
                    .iter()
                    .find(|field| field.eq_ignore_ascii_case(&child.name))
                    .map(|field| field.to_string())
                    .unwrap_or_else(|| child.name.clone());
                (key, child, self.child_path(child))
            })
            .collect::<Vec<_>>();

        visitor.visit_map(NodeMapAccess {
            entries: entries.into_iter(),
            pending: None,
        })
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, BindError> {
        let raw = self.scalar("an enum variant name")?;
        visitor.visit_enum(raw.to_string().into_deserializer())
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_unit()
    }
}

struct NodeSeqAccess<'a> {
    items: std::vec::IntoIter<(&'a Node, String)>,
}

impl<'de, 'a> de::SeqAccess<'de> for NodeSeqAccess<'a> {
    type Error = BindError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, BindError> {
        match self.items.next() {
            Some((node, path)) => seed.deserialize(NodeDeserializer { node, path }).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

struct NodeMapAccess<'a> {
    entries: std::vec::IntoIter<(String, &'a Node, String)>,
    pending: Option<(&'a Node, String)>,
}

impl<'de, 'a> de::MapAccess<'de> for NodeMapAccess<'a> {
    type Error = BindError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, BindError> {
        match self.entries.next() {
            Some((key, node, path)) => {
                self.pending = Some((node, path));
                seed.deserialize(key.into_deserializer()).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, BindError> {
        match self.pending.take() {
            Some((node, path)) => seed.deserialize(NodeDeserializer { node, path }),
            None => Err(BindError::Message(
                "map value requested before its key".to_string(),
            )),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}
