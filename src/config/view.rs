//! Merged configuration view with provenance
//!
//! The view is immutable once built. Lookups are case-insensitive and
//! nested keys use `:` (`Publish:Feed`).

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::bind::{self, Node};
use super::error::BindError;
use super::merge::{normalize_key, MergedSettings, KEY_DELIMITER};
use super::source::SourceInfo;

/// Schema version of [`ConfigReport`]
pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Keys that contain secrets and should be redacted in reports
const SECRET_KEYS: &[&str] = &[
    "password",
    "token",
    "secret",
    "private_key",
    "api_key",
    "apikey",
    "credential",
];

/// Placeholder written over redacted values
pub const REDACTED: &str = "[REDACTED]";

/// The merged result of every configuration source.
#[derive(Debug, Clone)]
pub struct ConfigurationView {
    settings: MergedSettings,
    sources: Vec<SourceInfo>,
    loaded_at: DateTime<Utc>,
}

/// One reported key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportEntry {
    pub key: String,
    pub value: Option<String>,
    /// Index into `sources`
    pub source: usize,
}

/// Serializable snapshot of a view, secrets redacted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigReport {
    pub schema_version: u32,
    pub loaded_at: DateTime<Utc>,
    pub sources: Vec<SourceInfo>,
    pub entries: Vec<ReportEntry>,
    pub redactions: Vec<String>,
}

impl ConfigurationView {
    pub(crate) fn new(settings: MergedSettings, sources: Vec<SourceInfo>) -> Self {
        Self {
            settings,
            sources,
            loaded_at: Utc::now(),
        }
    }

    /// Raw value for `key`. `None` when the key is missing or has no value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.settings.get(key).and_then(|e| e.value.as_deref())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.settings.get(key).is_some()
    }

    /// Typed value for `key`, or `T::default()` when nothing is configured.
    ///
    /// Sections are supported, so `get_value::<Vec<String>>("Tags")` reads
    /// `Tags:0`, `Tags:1`, ...
    pub fn get_value<T>(&self, key: &str) -> Result<T, BindError>
    where
        T: Serialize + DeserializeOwned + Default,
    {
        bind::value_or_default(&self.tree(), key)
    }

    /// A view over the keys below `key`, with the prefix removed.
    pub fn section(&self, key: &str) -> ConfigurationView {
        let prefix: Vec<String> = key.split(KEY_DELIMITER).map(normalize_key).collect();
        let mut settings = MergedSettings::default();

        for entry in self.settings.iter() {
            let mut segments = entry.key.splitn(prefix.len() + 1, KEY_DELIMITER);
            let matches = prefix
                .iter()
                .all(|want| segments.next().map(normalize_key).as_ref() == Some(want));
            if let (true, Some(child)) = (matches, segments.next()) {
                settings.overlay(vec![(child.to_string(), entry.value.clone())], entry.source);
            }
        }

        Self {
            settings,
            sources: self.sources.clone(),
            loaded_at: self.loaded_at,
        }
    }

    /// Keys in their configured spelling.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.settings.iter().map(|e| e.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// The source that supplied the winning value for `key`.
    pub fn origin_of(&self, key: &str) -> Option<&SourceInfo> {
        self.settings
            .get(key)
            .and_then(|e| self.sources.get(e.source))
    }

    /// Contributing sources in precedence order (last wins).
    pub fn sources(&self) -> &[SourceInfo] {
        &self.sources
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Overwrite every field of `instance` that has a matching key.
    ///
    /// Fields without a matching key keep their current value. Names match
    /// case-insensitively, nested structs bind from `Parent:Child` keys.
    pub fn bind<T>(&self, instance: &mut T) -> Result<(), BindError>
    where
        T: Serialize + DeserializeOwned,
    {
        let mut root = Node::default();
        root.extend(bind::snapshot(instance)?);
        for entry in self.settings.iter() {
            root.insert(&entry.key, entry.value.clone());
        }

        *instance = bind::from_node(&root, "")?;
        Ok(())
    }

    /// Bind onto `T::default()`.
    pub fn bind_new<T>(&self) -> Result<T, BindError>
    where
        T: Default + Serialize + DeserializeOwned,
    {
        let mut instance = T::default();
        self.bind(&mut instance)?;
        Ok(instance)
    }

    fn tree(&self) -> Node {
        let mut root = Node::default();
        for entry in self.settings.iter() {
            root.insert(&entry.key, entry.value.clone());
        }
        root
    }

    /// Snapshot for display, with secret-looking keys redacted.
    pub fn to_report(&self) -> ConfigReport {
        let mut redactions = Vec::new();
        let entries = self
            .settings
            .iter()
            .map(|entry| {
                let mut value = entry.value.clone();
                if value.is_some() && is_secret_key(&entry.key) {
                    value = Some(REDACTED.to_string());
                    redactions.push(entry.key.clone());
                }
                ReportEntry {
                    key: entry.key.clone(),
                    value,
                    source: entry.source,
                }
            })
            .collect();

        ConfigReport {
            schema_version: REPORT_SCHEMA_VERSION,
            loaded_at: self.loaded_at,
            sources: self.sources.clone(),
            entries,
            redactions,
        }
    }

    /// Serialize the redacted report
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_report())
    }
}

fn is_secret_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    SECRET_KEYS.iter().any(|s| lower.contains(s))
}
