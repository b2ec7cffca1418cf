//! Configuration sources
//!
//! Each source yields one flat [`Layer`]. Sources are registered on a
//! [`ConfigurationBuilder`](super::ConfigurationBuilder) and loaded in
//! registration order when the builder is finalised.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::error::ConfigError;
use super::merge::{flatten_value, normalize_key, Layer, KEY_DELIMITER};

/// Default settings file, relative to the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "build-settings.json";

/// Kind of a contributing source
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceOrigin {
    Memory,
    File,
    Environment,
    CommandLine,
}

/// A contributing source with provenance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceInfo {
    /// Origin of this source
    pub origin: SourceOrigin,

    /// File path (file sources only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of the raw file bytes (only when the file was read)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl SourceInfo {
    fn new(origin: SourceOrigin) -> Self {
        Self {
            origin,
            path: None,
            digest: None,
        }
    }
}

/// A source's layer together with its provenance.
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub layer: Layer,
    pub info: SourceInfo,
}

/// Something that contributes keys to the merged configuration.
pub trait ConfigSource {
    fn origin(&self) -> SourceOrigin;

    fn load(&self) -> Result<LoadedSource, ConfigError>;
}

/// In-memory defaults.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    values: Layer,
}

impl InMemorySource {
    /// Values may be `None` to register a key with no value.
    pub fn new<I>(values: I) -> Self
    where
        I: IntoIterator<Item = (String, Option<String>)>,
    {
        Self {
            values: values.into_iter().collect(),
        }
    }

    /// Convenience for plain string pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(pairs.into_iter().map(|(k, v)| (k.into(), Some(v.into()))))
    }
}

impl ConfigSource for InMemorySource {
    fn origin(&self) -> SourceOrigin {
        SourceOrigin::Memory
    }

    fn load(&self) -> Result<LoadedSource, ConfigError> {
        Ok(LoadedSource {
            layer: self.values.clone(),
            info: SourceInfo::new(SourceOrigin::Memory),
        })
    }
}

/// A JSON settings file.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
    optional: bool,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>, optional: bool) -> Self {
        Self {
            path: path.into(),
            optional,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for JsonFileSource {
    fn origin(&self) -> SourceOrigin {
        SourceOrigin::File
    }

    fn load(&self) -> Result<LoadedSource, ConfigError> {
        let mut info = SourceInfo::new(SourceOrigin::File);
        info.path = Some(self.path.to_string_lossy().to_string());

        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound && self.optional => {
                tracing::debug!(path = %self.path.display(), "settings file not found, skipping");
                return Ok(LoadedSource {
                    layer: Vec::new(),
                    info,
                });
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        info.digest = Some(hex::encode(hasher.finalize()));

        let value: Value = serde_json::from_slice(&bytes).map_err(|source| ConfigError::Json {
            path: self.path.clone(),
            source,
        })?;
        if !value.is_object() {
            return Err(ConfigError::NotAnObject(self.path.clone()));
        }

        // null in a settings file reads back as an empty string
        let layer: Layer = flatten_value(&value)
            .into_iter()
            .map(|(key, value)| (key, Some(value.unwrap_or_default())))
            .collect();

        tracing::debug!(path = %self.path.display(), keys = layer.len(), "loaded settings file");
        Ok(LoadedSource { layer, info })
    }
}

/// Process environment variables.
///
/// `__` in a variable name is read as the key delimiter, so
/// `Logging__Level` sets `Logging:Level`.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentSource {
    prefix: Option<String>,
    vars: Option<Vec<(String, String)>>,
}

impl EnvironmentSource {
    /// Read every variable of the current process.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a fixed set of variables instead of the process environment.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            prefix: None,
            vars: Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }

    /// Only keep variables starting with `prefix` (case-insensitive) and
    /// strip it from the key.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    fn snapshot(&self) -> Vec<(String, String)> {
        match &self.vars {
            Some(vars) => vars.clone(),
            None => std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }
}

fn strip_prefix_ignore_case<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    let head = key.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        key.get(prefix.len()..)
    } else {
        None
    }
}

impl ConfigSource for EnvironmentSource {
    fn origin(&self) -> SourceOrigin {
        SourceOrigin::Environment
    }

    fn load(&self) -> Result<LoadedSource, ConfigError> {
        let layer: Layer = self
            .snapshot()
            .into_iter()
            .filter_map(|(key, value)| {
                let key = match &self.prefix {
                    Some(prefix) => strip_prefix_ignore_case(&key, prefix)?.to_string(),
                    None => key,
                };
                Some((key.replace("__", KEY_DELIMITER), Some(value)))
            })
            .filter(|(key, _)| !key.is_empty())
            .collect();

        Ok(LoadedSource {
            layer,
            info: SourceInfo::new(SourceOrigin::Environment),
        })
    }
}

/// Script arguments from the command line.
///
/// Accepted forms: `--key=value`, `/key=value`, `-key=value`, `key=value`,
/// and the split forms `--key value`, `/key value`, `-key value`. Tokens in
/// `switch_mappings` (e.g. `-v` -> `--verbosity`) are renamed before the key
/// is extracted.
#[derive(Debug, Clone, Default)]
pub struct CommandLineSource {
    args: Vec<String>,
    switch_mappings: Vec<(String, String)>,
}

impl CommandLineSource {
    pub fn new(args: Vec<String>, switch_mappings: Vec<(String, String)>) -> Self {
        Self {
            args,
            switch_mappings,
        }
    }
}

/// Check switch mappings and index them by lowercased switch.
///
/// Mapped values have their leading dashes stripped: they name the key.
pub fn validate_switch_mappings(
    mappings: &[(String, String)],
) -> Result<HashMap<String, String>, ConfigError> {
    let mut validated = HashMap::new();

    for (switch, target) in mappings {
        if !switch.starts_with('-') {
            return Err(ConfigError::InvalidSwitchMapping(switch.clone()));
        }
        let key = normalize_key(switch);
        if validated.contains_key(&key) {
            return Err(ConfigError::DuplicateSwitchMapping(switch.clone()));
        }
        validated.insert(key, target.trim_start_matches('-').to_string());
    }

    Ok(validated)
}

/// Turn script arguments into key/value pairs.
pub fn parse_command_line(args: &[String], mappings: &HashMap<String, String>) -> Layer {
    let mut layer = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let (normalized, key_start) = if arg.starts_with("--") {
            (arg.clone(), 2)
        } else if arg.starts_with('-') {
            (arg.clone(), 1)
        } else if let Some(rest) = arg.strip_prefix('/') {
            (format!("--{}", rest), 2)
        } else {
            (arg.clone(), 0)
        };

        match normalized.find('=') {
            None => {
                if key_start == 0 {
                    tracing::debug!(token = %arg, "ignoring command-line token without a key");
                    continue;
                }

                let key = match mappings.get(&normalize_key(&normalized)) {
                    Some(mapped) => mapped.clone(),
                    None => normalized[key_start..].to_string(),
                };
                if key.is_empty() {
                    continue;
                }

                match iter.next() {
                    Some(value) => layer.push((key, Some(value.clone()))),
                    None => tracing::debug!(key = %key, "command-line switch has no value"),
                }
            }
            Some(separator) => {
                let key = match mappings.get(&normalize_key(&normalized[..separator])) {
                    Some(mapped) => mapped.clone(),
                    None => normalized[key_start.min(separator)..separator].to_string(),
                };
                if key.is_empty() {
                    continue;
                }

                layer.push((key, Some(normalized[separator + 1..].to_string())));
            }
        }
    }

    layer
}

impl ConfigSource for CommandLineSource {
    fn origin(&self) -> SourceOrigin {
        SourceOrigin::CommandLine
    }

    fn load(&self) -> Result<LoadedSource, ConfigError> {
        let mappings = validate_switch_mappings(&self.switch_mappings)?;

        Ok(LoadedSource {
            layer: parse_command_line(&self.args, &mappings),
            info: SourceInfo::new(SourceOrigin::CommandLine),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn mappings(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn value_of<'a>(layer: &'a Layer, key: &str) -> Option<&'a str> {
        layer
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }

    #[test]
    fn test_in_memory_keeps_null_values() {
        let source = InMemorySource::new(vec![
            ("number".to_string(), Some("100".to_string())),
            ("null".to_string(), None),
        ]);
        let loaded = source.load().unwrap();

        assert_eq!(loaded.layer.len(), 2);
        assert_eq!(loaded.layer[1], ("null".to_string(), None));
        assert_eq!(loaded.info.origin, SourceOrigin::Memory);
    }

    #[test]
    fn test_in_memory_from_pairs() {
        let loaded = InMemorySource::from_pairs([("Target", "Default"), ("Configuration", "Release")])
            .load()
            .unwrap();

        assert_eq!(value_of(&loaded.layer, "Target"), Some("Default"));
        assert_eq!(value_of(&loaded.layer, "Configuration"), Some("Release"));
        assert!(loaded.info.path.is_none());
    }

    #[test]
    fn test_json_file_flattens_and_digests() {
        let mut temp = NamedTempFile::new().unwrap();
        write!(
            temp,
            r#"{{"Key2": 100, "nested": {{"name": "x"}}, "list": [1, 2], "nothing": null}}"#
        )
        .unwrap();

        let loaded = JsonFileSource::new(temp.path(), true).load().unwrap();

        assert_eq!(value_of(&loaded.layer, "Key2"), Some("100"));
        assert_eq!(value_of(&loaded.layer, "nested:name"), Some("x"));
        assert_eq!(value_of(&loaded.layer, "list:1"), Some("2"));
        assert_eq!(value_of(&loaded.layer, "nothing"), Some(""));
        assert_eq!(loaded.info.digest.as_ref().map(|d| d.len()), Some(64));
    }

    #[test]
    fn test_missing_optional_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonFileSource::new(dir.path().join(DEFAULT_SETTINGS_FILE), true);
        let loaded = source.load().unwrap();

        assert!(loaded.layer.is_empty());
        assert!(loaded.info.digest.is_none());
        assert!(loaded.info.path.is_some());
    }

    #[test]
    fn test_missing_required_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonFileSource::new(dir.path().join("absent.json"), false);
        assert!(matches!(source.load(), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_corrupt_json_propagates() {
        let mut temp = NamedTempFile::new().unwrap();
        write!(temp, "{{ not json").unwrap();

        let result = JsonFileSource::new(temp.path(), true).load();
        assert!(matches!(result, Err(ConfigError::Json { .. })));
    }

    #[test]
    fn test_json_top_level_must_be_object() {
        let mut temp = NamedTempFile::new().unwrap();
        write!(temp, "[1, 2, 3]").unwrap();

        let result = JsonFileSource::new(temp.path(), true).load();
        assert!(matches!(result, Err(ConfigError::NotAnObject(_))));
    }

    #[test]
    fn test_environment_double_underscore() {
        let source = EnvironmentSource::from_vars(vec![("Logging__Level", "Debug"), ("Key3", "Env3")]);
        let loaded = source.load().unwrap();

        assert_eq!(value_of(&loaded.layer, "Logging:Level"), Some("Debug"));
        assert_eq!(value_of(&loaded.layer, "Key3"), Some("Env3"));
        assert_eq!(loaded.info.origin, SourceOrigin::Environment);
    }

    #[test]
    fn test_environment_prefix_filter() {
        let source = EnvironmentSource::from_vars(vec![
            ("BUILD_Target", "Pack"),
            ("build_Configuration", "Release"),
            ("PATH", "/usr/bin"),
            ("BUILD_", "empty key"),
        ])
        .with_prefix("BUILD_");
        let loaded = source.load().unwrap();

        assert_eq!(loaded.layer.len(), 2);
        assert_eq!(value_of(&loaded.layer, "Target"), Some("Pack"));
        assert_eq!(value_of(&loaded.layer, "Configuration"), Some("Release"));
    }

    #[test]
    fn test_command_line_inline_forms() {
        let layer = parse_command_line(
            &args(&["--a=1", "/b=2", "-c=3", "d=4"]),
            &HashMap::new(),
        );
        assert_eq!(value_of(&layer, "a"), Some("1"));
        assert_eq!(value_of(&layer, "b"), Some("2"));
        assert_eq!(value_of(&layer, "c"), Some("3"));
        assert_eq!(value_of(&layer, "d"), Some("4"));
    }

    #[test]
    fn test_command_line_split_forms() {
        let layer = parse_command_line(
            &args(&["--Key4", "Command4", "/target", "Pack", "-arg2", "True"]),
            &HashMap::new(),
        );
        assert_eq!(value_of(&layer, "Key4"), Some("Command4"));
        assert_eq!(value_of(&layer, "target"), Some("Pack"));
        assert_eq!(value_of(&layer, "arg2"), Some("True"));
    }

    #[test]
    fn test_command_line_skips_bare_and_trailing() {
        let layer = parse_command_line(&args(&["stray", "--a=1", "--last"]), &HashMap::new());
        assert_eq!(layer, vec![("a".to_string(), Some("1".to_string()))]);
    }

    #[test]
    fn test_command_line_value_keeps_equals() {
        let layer = parse_command_line(&args(&["--define=A=B"]), &HashMap::new());
        assert_eq!(value_of(&layer, "define"), Some("A=B"));
    }

    #[test]
    fn test_switch_mapping_applies() {
        let validated = validate_switch_mappings(&mappings(&[("-v", "--verbosity")])).unwrap();

        let inline = parse_command_line(&args(&["-v=X"]), &validated);
        let long = parse_command_line(&args(&["--verbosity=X"]), &HashMap::new());
        assert_eq!(inline, long);

        let split = parse_command_line(&args(&["-V", "Y"]), &validated);
        assert_eq!(value_of(&split, "verbosity"), Some("Y"));
    }

    #[test]
    fn test_switch_mapping_must_start_with_dash() {
        let result = validate_switch_mappings(&mappings(&[("v", "--verbosity")]));
        assert!(matches!(result, Err(ConfigError::InvalidSwitchMapping(_))));
    }

    #[test]
    fn test_switch_mapping_duplicates_rejected() {
        let result = validate_switch_mappings(&mappings(&[("-v", "--verbosity"), ("-V", "--version")]));
        assert!(matches!(result, Err(ConfigError::DuplicateSwitchMapping(_))));
    }

    #[test]
    fn test_command_line_source_reports_bad_mappings_on_load() {
        let source = CommandLineSource::new(args(&["--a=1"]), mappings(&[("x", "--y")]));
        assert!(source.load().is_err());
    }
}
