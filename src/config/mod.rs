//! Layered configuration
//!
//! Sources are merged in the order they are registered, later sources
//! overriding earlier ones key by key:
//! 1. In-memory defaults
//! 2. JSON settings file (optional)
//! 3. Environment variables
//! 4. Command-line script arguments

mod bind;
mod builder;
mod error;
mod merge;
mod source;
mod view;

pub use builder::ConfigurationBuilder;
pub use error::{BindError, ConfigError};
pub use merge::{merge_layers, Entry, Layer, MergedSettings, KEY_DELIMITER};
pub use source::{
    parse_command_line, validate_switch_mappings, CommandLineSource, ConfigSource,
    EnvironmentSource, InMemorySource, JsonFileSource, LoadedSource, SourceInfo, SourceOrigin,
    DEFAULT_SETTINGS_FILE,
};
pub use view::{ConfigReport, ConfigurationView, ReportEntry, REDACTED};
