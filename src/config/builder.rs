//! Configuration builder
//!
//! Collects sources in precedence order (first is lowest) and merges them
//! into a [`ConfigurationView`].

use std::path::PathBuf;

use super::error::ConfigError;
use super::merge::merge_layers;
use super::source::{
    CommandLineSource, ConfigSource, EnvironmentSource, InMemorySource, JsonFileSource,
};
use super::view::ConfigurationView;

/// Ordered list of configuration sources.
#[derive(Default)]
pub struct ConfigurationBuilder {
    sources: Vec<Box<dyn ConfigSource>>,
}

impl ConfigurationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source above everything added so far.
    pub fn add_source<S: ConfigSource + 'static>(&mut self, source: S) -> &mut Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn add_in_memory<I>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = (String, Option<String>)>,
    {
        self.add_source(InMemorySource::new(values))
    }

    pub fn add_json_file(&mut self, path: impl Into<PathBuf>, optional: bool) -> &mut Self {
        self.add_source(JsonFileSource::new(path, optional))
    }

    pub fn add_environment_variables(&mut self) -> &mut Self {
        self.add_source(EnvironmentSource::new())
    }

    pub fn add_command_line(
        &mut self,
        args: &[String],
        switch_mappings: &[(String, String)],
    ) -> &mut Self {
        self.add_source(CommandLineSource::new(
            args.to_vec(),
            switch_mappings.to_vec(),
        ))
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Load every source and merge them.
    ///
    /// The first source error aborts the build.
    pub fn build(&self) -> Result<ConfigurationView, ConfigError> {
        let mut layers = Vec::with_capacity(self.sources.len());
        let mut infos = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            let loaded = source.load()?;
            tracing::debug!(
                origin = ?source.origin(),
                keys = loaded.layer.len(),
                "loaded configuration source"
            );
            layers.push(loaded.layer);
            infos.push(loaded.info);
        }

        Ok(ConfigurationView::new(merge_layers(layers), infos))
    }
}

impl std::fmt::Debug for ConfigurationBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let origins: Vec<_> = self.sources.iter().map(|s| s.origin()).collect();
        f.debug_struct("ConfigurationBuilder")
            .field("sources", &origins)
            .finish()
    }
}
