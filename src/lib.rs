//! scriptconf - layered configuration for build scripts
//!
//! Merges in-memory defaults, a JSON settings file, environment variables
//! and command-line arguments into one configuration, after filtering out
//! the arguments that belong to the host build tool.

pub mod config;
pub mod loader;
pub mod logging;
pub mod session;

pub use config::{BindError, ConfigError, ConfigurationBuilder, ConfigurationView};
pub use loader::{load_configuration, DefaultStrategy, SourceSetup};
pub use scriptconf_args::{classify, ClassificationResult};
pub use session::{ConfigurationSession, LoadState};
