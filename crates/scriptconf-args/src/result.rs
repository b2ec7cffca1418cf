//! Classification result types.

use serde::{Deserialize, Serialize};

/// Destination of a classified argument.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentTarget {
    /// Consumed by the build tool itself.
    Host,
    /// Passed through to the script's configuration.
    Script,
}

/// Result of splitting a build-script command line.
///
/// `host_args` and `script_args` keep insertion order: a name token is
/// always directly followed by its value token (either the split value or a
/// synthesized `"True"` for switches), unless it carried an inline value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassificationResult {
    /// Arguments recognised as the host build tool's own.
    pub host_args: Vec<String>,

    /// Arguments meant for the script.
    pub script_args: Vec<String>,

    /// Tokens that did not match the argument grammar, verbatim.
    pub invalid_args: Vec<String>,
}

impl ClassificationResult {
    /// True when all three lists are empty.
    pub fn is_empty(&self) -> bool {
        self.host_args.is_empty() && self.script_args.is_empty() && self.invalid_args.is_empty()
    }

    pub(crate) fn list_mut(&mut self, target: ArgumentTarget) -> &mut Vec<String> {
        match target {
            ArgumentTarget::Host => &mut self.host_args,
            ArgumentTarget::Script => &mut self.script_args,
        }
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable summary, one bucket per line.
    pub fn to_human(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!("Host arguments:   {}", render(&self.host_args)));
        lines.push(format!("Script arguments: {}", render(&self.script_args)));
        lines.push(format!("Invalid tokens:   {}", render(&self.invalid_args)));
        lines.join("\n")
    }
}

fn render(args: &[String]) -> String {
    if args.is_empty() {
        "(none)".to_string()
    } else {
        args.join(" ")
    }
}
