//! scriptconf CLI
//!
//! Entry point for the `scriptconf` command-line tool.

use clap::{Parser, Subcommand};
use scriptconf::config::{ConfigurationView, SourceOrigin};
use scriptconf::logging::init_tracing;
use scriptconf::{classify, load_configuration, DefaultStrategy};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "scriptconf")]
#[command(about = "Layered build-script configuration", version)]
struct Cli {
    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a build-script command line into host, script and invalid arguments
    Classify {
        /// Output in JSON format
        #[arg(long)]
        json: bool,

        /// The build-script command line (after --)
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Show the merged configuration for a build-script command line
    Show {
        /// Settings file (default: build-settings.json)
        #[arg(long, short = 's')]
        settings: Option<PathBuf>,

        /// In-memory default, KEY=VALUE (repeatable)
        #[arg(long = "default", short = 'D', value_parser = parse_pair)]
        defaults: Vec<(String, String)>,

        /// Switch mapping, -SHORT=--LONG (repeatable)
        #[arg(long = "map", short = 'm', value_parser = parse_pair, allow_hyphen_values = true)]
        mappings: Vec<(String, String)>,

        /// Only print this key and where it came from
        #[arg(long, short = 'k')]
        key: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,

        /// The build-script command line (after --)
        #[arg(last = true)]
        args: Vec<String>,
    },
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Classify { json, args } => run_classify(json, args),
        Commands::Show {
            settings,
            defaults,
            mappings,
            key,
            json,
            args,
        } => {
            let mut strategy = DefaultStrategy::new()
                .with_defaults(defaults)
                .with_switch_mappings(mappings);
            if let Some(path) = settings {
                strategy = strategy.with_settings_path(path);
            }
            run_show(strategy, key, json, args);
        }
    }
}

fn run_classify(json: bool, args: Vec<String>) {
    let result = classify(&args);

    if json {
        match result.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
    } else {
        println!("{}", result.to_human());
    }

    if !result.invalid_args.is_empty() {
        process::exit(2);
    }
}

fn run_show(strategy: DefaultStrategy, key: Option<String>, json: bool, args: Vec<String>) {
    let view = match load_configuration(strategy, &args) {
        Ok(view) => view,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    match key {
        Some(key) => show_key(&view, &key, json),
        None => show_all(&view, json),
    }
}

fn show_key(view: &ConfigurationView, key: &str, json: bool) {
    let value = view.get(key);
    let origin = view.origin_of(key).map(|s| s.origin);

    if json {
        let output = serde_json::json!({
            "key": key,
            "value": value,
            "origin": origin,
        });
        println!("{}", output);
    } else {
        match (value, origin) {
            (Some(v), Some(o)) => println!("{} = {} ({})", key, v, origin_label(o)),
            (None, Some(o)) => println!("{} has no value ({})", key, origin_label(o)),
            _ => println!("{} is not set", key),
        }
    }

    if !view.contains_key(key) {
        process::exit(1);
    }
}

fn show_all(view: &ConfigurationView, json: bool) {
    if json {
        match view.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    let report = view.to_report();
    println!("Sources (lowest precedence first):");
    for (index, source) in report.sources.iter().enumerate() {
        match (&source.path, &source.digest) {
            (Some(path), Some(digest)) => {
                println!("  {}. {} {} (sha256 {})", index, origin_label(source.origin), path, digest)
            }
            (Some(path), None) => {
                println!("  {}. {} {} (not found)", index, origin_label(source.origin), path)
            }
            _ => println!("  {}. {}", index, origin_label(source.origin)),
        }
    }

    if report.entries.is_empty() {
        println!("\nNo configuration values.");
        return;
    }

    println!("\nValues ({} total):", report.entries.len());
    for entry in &report.entries {
        let origin = report
            .sources
            .get(entry.source)
            .map(|s| origin_label(s.origin))
            .unwrap_or("?");
        match &entry.value {
            Some(value) => println!("  {} = {}  [{}]", entry.key, value, origin),
            None => println!("  {} (no value)  [{}]", entry.key, origin),
        }
    }
}

fn origin_label(origin: SourceOrigin) -> &'static str {
    match origin {
        SourceOrigin::Memory => "defaults",
        SourceOrigin::File => "settings file",
        SourceOrigin::Environment => "environment",
        SourceOrigin::CommandLine => "command line",
    }
}
