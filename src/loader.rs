//! Configuration loading for build scripts
//!
//! Splits the raw command line, reports tokens that cannot be used, and
//! hands the script arguments to a source setup that fills a
//! [`ConfigurationBuilder`].

use std::collections::HashSet;
use std::path::PathBuf;

use scriptconf_args::{classify, short_switch_mappings};

use crate::config::{
    ConfigError, ConfigurationBuilder, ConfigurationView, EnvironmentSource, InMemorySource,
    DEFAULT_SETTINGS_FILE,
};

/// Name used in the diagnostic for ignored tokens.
pub const COMMAND_LINE_PARSER: &str = "the command-line configuration source";

/// Registers sources on a builder, given the script arguments.
pub trait SourceSetup {
    fn configure(self, builder: &mut ConfigurationBuilder, script_args: &[String]);
}

impl<F> SourceSetup for F
where
    F: FnOnce(&mut ConfigurationBuilder, &[String]),
{
    fn configure(self, builder: &mut ConfigurationBuilder, script_args: &[String]) {
        self(builder, script_args)
    }
}

/// Classify `raw_args`, then build a configuration from the sources `setup`
/// registers. Host arguments never reach the setup.
pub fn load_configuration<S, A>(setup: S, raw_args: &[A]) -> Result<ConfigurationView, ConfigError>
where
    S: SourceSetup,
    A: AsRef<str>,
{
    let classified = classify(raw_args);

    for arg in &classified.invalid_args {
        tracing::info!(
            "{} is not in the correct format for {} and has been ignored.",
            arg,
            COMMAND_LINE_PARSER
        );
    }
    tracing::debug!(
        host = classified.host_args.len(),
        script = classified.script_args.len(),
        "classified command line"
    );

    let mut builder = ConfigurationBuilder::new();
    setup.configure(&mut builder, &classified.script_args);
    builder.build()
}

/// The standard source stack: in-memory defaults, the JSON settings file,
/// environment variables, then the command line.
#[derive(Debug, Clone, Default)]
pub struct DefaultStrategy {
    defaults: Vec<(String, Option<String>)>,
    switch_mappings: Vec<(String, String)>,
    settings_path: Option<PathBuf>,
    environment: Option<EnvironmentSource>,
}

impl DefaultStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// In-memory values with the lowest precedence.
    pub fn with_defaults<I, K, V>(mut self, defaults: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.defaults
            .extend(defaults.into_iter().map(|(k, v)| (k.into(), Some(v.into()))));
        self
    }

    /// In-memory values that may be explicitly empty.
    pub fn with_optional_defaults<I>(mut self, defaults: I) -> Self
    where
        I: IntoIterator<Item = (String, Option<String>)>,
    {
        self.defaults.extend(defaults);
        self
    }

    /// Extra command-line switch mappings (`-t` -> `--target`).
    pub fn with_switch_mappings<I, K, V>(mut self, mappings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.switch_mappings
            .extend(mappings.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Settings file to read instead of `build-settings.json`.
    pub fn with_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    /// Environment source to use instead of the process environment.
    pub fn with_environment(mut self, environment: EnvironmentSource) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn settings_path(&self) -> PathBuf {
        self.settings_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE))
    }

    /// Caller mappings followed by the host short-name aliases; an alias
    /// never replaces a caller mapping for the same switch.
    pub fn effective_switch_mappings(&self) -> Vec<(String, String)> {
        let mut seen: HashSet<String> = self
            .switch_mappings
            .iter()
            .map(|(switch, _)| switch.to_lowercase())
            .collect();
        let mut mappings = self.switch_mappings.clone();

        for (switch, target) in short_switch_mappings() {
            if seen.insert(switch.to_lowercase()) {
                mappings.push((switch, target));
            }
        }
        mappings
    }
}

impl SourceSetup for DefaultStrategy {
    fn configure(self, builder: &mut ConfigurationBuilder, script_args: &[String]) {
        let settings_path = self.settings_path();
        let mappings = self.effective_switch_mappings();

        builder
            .add_source(InMemorySource::new(self.defaults))
            .add_json_file(settings_path, true)
            .add_source(self.environment.unwrap_or_default())
            .add_command_line(script_args, &mappings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceOrigin;
    use std::fs;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl CapturedLog {
        fn lines(&self) -> Vec<String> {
            let bytes = self.0.lock().unwrap();
            String::from_utf8_lossy(&bytes)
                .lines()
                .map(|line| line.trim().to_string())
                .filter(|line| !line.is_empty())
                .collect()
        }
    }

    impl io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLog {
        type Writer = CapturedLog;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    fn isolated(dir: &tempfile::TempDir) -> DefaultStrategy {
        DefaultStrategy::new()
            .with_settings_path(dir.path().join(DEFAULT_SETTINGS_FILE))
            .with_environment(EnvironmentSource::from_vars(Vec::<(String, String)>::new()))
    }

    #[test]
    fn test_setup_receives_only_script_args() {
        let mut seen = Vec::new();
        let view = load_configuration(
            |_: &mut ConfigurationBuilder, args: &[String]| seen = args.to_vec(),
            &argv(&["build.cake", "--verbosity=diagnostic", "--target", "Pack", "bad.token"]),
        )
        .unwrap();

        assert_eq!(seen, argv(&["--target", "Pack"]));
        assert!(view.is_empty());
    }

    #[test]
    fn test_invalid_tokens_logged_once_each() {
        let log = CapturedLog::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(log.clone())
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .without_time()
            .with_level(false)
            .with_target(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            load_configuration(
                |_: &mut ConfigurationBuilder, _: &[String]| {},
                &argv(&["build.cake", "bad.token", "--target", "Pack", "also/bad"]),
            )
            .unwrap();
        });

        assert_eq!(
            log.lines(),
            vec![
                "bad.token is not in the correct format for the command-line configuration source and has been ignored.",
                "also/bad is not in the correct format for the command-line configuration source and has been ignored.",
            ]
        );
    }

    #[test]
    fn test_valid_command_line_logs_nothing() {
        let log = CapturedLog::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(log.clone())
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            load_configuration(
                |_: &mut ConfigurationBuilder, _: &[String]| {},
                &argv(&["build.cake", "--target=Pack"]),
            )
            .unwrap();
        });

        assert!(log.lines().is_empty());
    }

    #[test]
    fn test_optional_defaults_keep_empty_keys() {
        let dir = tempfile::tempdir().unwrap();
        let strategy = isolated(&dir).with_optional_defaults(vec![
            ("Target".to_string(), Some("Default".to_string())),
            ("Feed".to_string(), None),
        ]);
        let view = load_configuration(strategy, &Vec::<String>::new()).unwrap();

        assert_eq!(view.get("target"), Some("Default"));
        assert!(view.contains_key("feed"));
        assert_eq!(view.get("feed"), None);
    }

    #[test]
    fn test_no_args_no_sources() {
        let view = load_configuration(|_: &mut ConfigurationBuilder, _: &[String]| {}, &Vec::<String>::new())
            .unwrap();
        assert!(view.is_empty());
    }

    #[test]
    fn test_default_strategy_precedence() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(DEFAULT_SETTINGS_FILE),
            r#"{"Key2": 100, "Key3": "File3", "Key4": "File4"}"#,
        )
        .unwrap();

        let strategy = isolated(&dir)
            .with_defaults(vec![
                ("Key1", "Default1"),
                ("Key2", "Default2"),
                ("Key3", "Default3"),
                ("Key4", "Default4"),
            ])
            .with_environment(EnvironmentSource::from_vars(vec![
                ("Key3", "Environment3"),
                ("Key4", "Environment4"),
            ]));

        let view = load_configuration(strategy, &argv(&["--Key4=Command4"])).unwrap();

        assert_eq!(view.get("Key1"), Some("Default1"));
        assert_eq!(view.get_value::<i32>("Key2").unwrap(), 100);
        assert_eq!(view.get("Key3"), Some("Environment3"));
        assert_eq!(view.get("Key4"), Some("Command4"));
        assert_eq!(view.origin_of("Key4").unwrap().origin, SourceOrigin::CommandLine);
    }

    #[test]
    fn test_default_strategy_missing_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let view = load_configuration(isolated(&dir), &argv(&["arg1", "arg2"])).unwrap();

        assert!(view.is_empty());
        assert_eq!(view.sources().len(), 4);
        assert!(view.sources()[1].digest.is_none());
    }

    #[test]
    fn test_default_strategy_corrupt_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DEFAULT_SETTINGS_FILE), "{ oops").unwrap();

        let result = load_configuration(isolated(&dir), &Vec::<String>::new());
        assert!(matches!(result, Err(ConfigError::Json { .. })));
    }

    #[test]
    fn test_alias_mappings_do_not_override_caller() {
        let strategy = DefaultStrategy::new().with_switch_mappings(vec![("-V", "--Verbose")]);
        let mappings = strategy.effective_switch_mappings();

        assert!(mappings.contains(&("-V".to_string(), "--Verbose".to_string())));
        assert!(!mappings.iter().any(|(s, _)| s == "-v"));
        assert!(mappings.contains(&("-d".to_string(), "--debug".to_string())));
        assert_eq!(mappings.len(), 5);
    }

    #[test]
    fn test_short_alias_expands_in_command_line_source() {
        let dir = tempfile::tempdir().unwrap();
        let mut builder = ConfigurationBuilder::new();
        isolated(&dir).configure(&mut builder, &argv(&["-v=X"]));
        let view = builder.build().unwrap();

        assert_eq!(view.get("verbosity"), Some("X"));
        assert_eq!(view.get("v"), None);
    }

    #[test]
    fn test_switch_from_classifier_reads_true() {
        let dir = tempfile::tempdir().unwrap();
        let view = load_configuration(isolated(&dir), &argv(&["--fast", "--target=Pack"])).unwrap();

        assert!(view.get_value::<bool>("fast").unwrap());
        assert_eq!(view.get("target"), Some("Pack"));
    }

    #[test]
    fn test_settings_path_default() {
        assert_eq!(
            DefaultStrategy::new().settings_path(),
            PathBuf::from("build-settings.json")
        );
    }
}
