//! Build-script argument token parser.
//!
//! A token is an optional prefix (`--`, `-` or `/`), a name made of ASCII
//! word characters, and an optional `=value` where the value is also a word.
//! Tokens without a prefix are only accepted when they carry an inline value.

use regex_lite::Regex;
use std::sync::OnceLock;

/// Token grammar shared by classification and look-ahead.
const TOKEN_PATTERN: &str = r"^(?P<prefix>--|-|/)?(?P<name>\w+)(?:=(?P<value>\w+))?$";

/// File suffixes recognised as the build script path in position 0.
pub const SCRIPT_EXTENSIONS: &[&str] = &[".cake", ".csx"];

fn token_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(TOKEN_PATTERN).expect("token pattern is a valid regex"))
}

/// One raw argument broken into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedToken {
    /// `--`, `-`, `/` or empty.
    pub prefix: String,

    /// Bare argument name.
    pub name: String,

    /// Inline value after `=`, if any.
    pub value: Option<String>,
}

impl ParsedToken {
    /// True when the token already carries its value (`name=value`).
    pub fn has_inline_value(&self) -> bool {
        self.value.is_some()
    }

    /// Rebuild the token text with `name` swapped for `new_name`.
    ///
    /// Prefix and inline value are preserved.
    pub fn with_name(&self, new_name: &str) -> String {
        match &self.value {
            Some(value) => format!("{}{}={}", self.prefix, new_name, value),
            None => format!("{}{}", self.prefix, new_name),
        }
    }

    /// The token text as it was matched.
    pub fn to_token(&self) -> String {
        self.with_name(&self.name)
    }
}

/// Parse a single raw argument.
///
/// Returns `None` when the argument is not well-formed. A bare word such as
/// `arg1` or `true` is not an argument on its own; it can only appear as the
/// value of a preceding split argument.
pub fn parse_token(raw: &str) -> Option<ParsedToken> {
    let caps = token_regex().captures(raw)?;

    let prefix = caps.name("prefix").map(|m| m.as_str()).unwrap_or("");
    let name = caps.name("name")?.as_str();
    let value = caps.name("value").map(|m| m.as_str().to_string());

    if prefix.is_empty() && value.is_none() {
        return None;
    }

    Some(ParsedToken {
        prefix: prefix.to_string(),
        name: name.to_string(),
        value,
    })
}

/// Whether `raw` names the build script itself.
pub fn is_script_path(raw: &str) -> bool {
    SCRIPT_EXTENSIONS.iter().any(|ext| raw.ends_with(ext))
}
