//! Configuration errors

use std::fmt;
use std::path::PathBuf;

/// Errors raised while assembling a configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON settings file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Settings file {0} must contain a JSON object at the top level")]
    NotAnObject(PathBuf),

    #[error("Switch mapping '{0}' is invalid: keys must start with '-' or '--'")]
    InvalidSwitchMapping(String),

    #[error("Switch mapping '{0}' is defined more than once")]
    DuplicateSwitchMapping(String),

    #[error(transparent)]
    Bind(#[from] BindError),
}

/// Errors raised while binding configuration values onto a typed value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    #[error("Cannot convert '{value}' at '{key}' to {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },

    #[error("Configuration at '{key}' is {found}, expected {expected}")]
    UnexpectedShape {
        key: String,
        found: &'static str,
        expected: &'static str,
    },

    #[error("Failed to serialize current value before binding: {0}")]
    Snapshot(String),

    #[error("{0}")]
    Message(String),
}

impl serde::de::Error for BindError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        BindError::Message(msg.to_string())
    }
}
