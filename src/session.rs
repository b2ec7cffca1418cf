//! Configuration session
//!
//! Holds the raw command line and the most recently loaded configuration
//! for one build-script run. A session starts unloaded; each load replaces
//! the previous configuration.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::{ConfigError, ConfigurationView};
use crate::loader::{load_configuration, DefaultStrategy, SourceSetup};

/// Load state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loaded,
}

/// Configuration for one build-script run.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationSession {
    raw_args: Vec<String>,
    configuration: Option<ConfigurationView>,
}

impl ConfigurationSession {
    /// Session over an explicit command line; `raw_args[0]` is normally the
    /// script path.
    pub fn new<I, S>(raw_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            raw_args: raw_args.into_iter().map(Into::into).collect(),
            configuration: None,
        }
    }

    /// Session over this process's arguments, without the executable.
    pub fn from_process_args() -> Self {
        Self::new(std::env::args().skip(1))
    }

    pub fn raw_args(&self) -> &[String] {
        &self.raw_args
    }

    pub fn state(&self) -> LoadState {
        match self.configuration {
            Some(_) => LoadState::Loaded,
            None => LoadState::Unloaded,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.configuration.is_some()
    }

    /// The loaded configuration, if any.
    pub fn current_configuration(&self) -> Option<&ConfigurationView> {
        self.configuration.as_ref()
    }

    /// Load with a custom source setup. On error the previous configuration
    /// is kept.
    pub fn load_configuration<S: SourceSetup>(
        &mut self,
        setup: S,
    ) -> Result<&ConfigurationView, ConfigError> {
        let view = load_configuration(setup, &self.raw_args)?;
        tracing::debug!(keys = view.len(), sources = view.sources().len(), "configuration loaded");

        Ok(&*self.configuration.insert(view))
    }

    /// Load with the default sources and bind a new `T`.
    pub fn get_configuration<T>(&mut self) -> Result<T, ConfigError>
    where
        T: Default + Serialize + DeserializeOwned,
    {
        self.get_configuration_with(DefaultStrategy::new())
    }

    /// Load with `strategy` and bind a new `T`.
    pub fn get_configuration_with<T, S>(&mut self, strategy: S) -> Result<T, ConfigError>
    where
        T: Default + Serialize + DeserializeOwned,
        S: SourceSetup,
    {
        let mut instance = T::default();
        self.get_configuration_into(&mut instance, strategy)?;
        Ok(instance)
    }

    /// Load with `setup` and bind onto an existing instance.
    pub fn get_configuration_into<T, S>(&mut self, instance: &mut T, setup: S) -> Result<(), ConfigError>
    where
        T: Serialize + DeserializeOwned,
        S: SourceSetup,
    {
        self.load_configuration(setup)?;
        self.bind_configuration(instance)
    }

    /// Bind the loaded configuration onto `instance`.
    ///
    /// Does nothing while the session is unloaded.
    pub fn bind_configuration<T>(&self, instance: &mut T) -> Result<(), ConfigError>
    where
        T: Serialize + DeserializeOwned,
    {
        match self.current_configuration() {
            Some(view) => Ok(view.bind(instance)?),
            None => {
                tracing::debug!("no configuration loaded, nothing to bind");
                Ok(())
            }
        }
    }

    /// Bind the loaded configuration onto `T::default()`.
    pub fn bind_configuration_new<T>(&self) -> Result<T, ConfigError>
    where
        T: Default + Serialize + DeserializeOwned,
    {
        let mut instance = T::default();
        self.bind_configuration(&mut instance)?;
        Ok(instance)
    }
}
