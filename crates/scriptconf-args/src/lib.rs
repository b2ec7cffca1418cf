//! Build-script command line classifier.
//!
//! Splits raw arguments into the ones the host build tool consumes, the ones
//! meant for the script's configuration, and tokens that are not valid
//! arguments at all. Classification never fails: malformed tokens are
//! collected, not reported as errors.

mod parser;
mod result;

pub use parser::{is_script_path, parse_token, ParsedToken, SCRIPT_EXTENSIONS};
pub use result::{ArgumentTarget, ClassificationResult};

/// Long names of arguments consumed by the host build tool.
pub const KNOWN_HOST_ARGUMENTS: &[&str] = &[
    "verbosity",
    "showdescription",
    "dryrun",
    "noop",
    "whatif",
    "help",
    "version",
    "debug",
    "mono",
    "nuget_useinprocessclient",
    "nuget_source",
    "paths_tools",
    "paths_addins",
    "paths_modules",
    "settings_skipverification",
    "nuget_loaddependencies",
    "roslyn_nugetsource",
];

/// Host short names and the long names they stand for.
pub const SHORT_NAME_ALIASES: &[(&str, &str)] = &[
    ("v", "verbosity"),
    ("s", "showdescription"),
    ("?", "help"),
    ("ver", "version"),
    ("d", "debug"),
];

/// Value appended after a switch that has no value of its own.
pub const SWITCH_VALUE: &str = "True";

/// Whether `name` (already normalised to its long form) belongs to the host.
///
/// Matching is exact and case-sensitive.
pub fn is_host_argument(name: &str) -> bool {
    KNOWN_HOST_ARGUMENTS.contains(&name)
}

/// Long name for a host short name, if it is one.
pub fn long_name_for(short: &str) -> Option<&'static str> {
    SHORT_NAME_ALIASES
        .iter()
        .find(|(s, _)| *s == short)
        .map(|(_, long)| *long)
}

/// Every short alias as a command-line switch mapping `-<short>` -> `--<long>`.
pub fn short_switch_mappings() -> Vec<(String, String)> {
    SHORT_NAME_ALIASES
        .iter()
        .map(|(short, long)| (format!("-{}", short), format!("--{}", long)))
        .collect()
}

/// Classify a raw command line.
///
/// `args[0]` is skipped when it looks like the build script path. Every
/// other token is matched against the argument grammar; matching tokens have
/// short names replaced by long names and are routed to the host or script
/// list. A token without an inline value looks exactly one token ahead: if
/// the next token is itself a well-formed argument, the current token is a
/// switch and `"True"` is appended after it; otherwise the next token is its
/// value and is consumed.
pub fn classify<S: AsRef<str>>(args: &[S]) -> ClassificationResult {
    let mut result = ClassificationResult::default();
    let mut i = 0;

    while i < args.len() {
        let raw = args[i].as_ref();

        if i == 0 && is_script_path(raw) {
            i += 1;
            continue;
        }

        let token = match parse_token(raw) {
            Some(t) => t,
            None => {
                result.invalid_args.push(raw.to_string());
                i += 1;
                continue;
            }
        };

        let (name, normalized) = match long_name_for(&token.name) {
            Some(long) => (long.to_string(), token.with_name(long)),
            None => (token.name.clone(), raw.to_string()),
        };

        let target = if is_host_argument(&name) {
            ArgumentTarget::Host
        } else {
            ArgumentTarget::Script
        };
        let list = result.list_mut(target);
        list.push(normalized);

        if token.has_inline_value() {
            i += 1;
            continue;
        }

        match args.get(i + 1).map(|next| next.as_ref()) {
            Some(next) if parse_token(next).is_none() => {
                // split argument: the next token is this one's value
                list.push(next.to_string());
                i += 2;
            }
            _ => {
                list.push(SWITCH_VALUE.to_string());
                i += 1;
            }
        }
    }

    result
}
