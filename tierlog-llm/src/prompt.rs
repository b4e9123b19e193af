//! Few-shot prompt for the LLM tier.
//!
//! The prompt is a fixed list of labelled example logs followed by an
//! instruction suffix that ends with the message to classify. Each example
//! is rendered as `Log: ...\nCategory: ...`, pieces are joined by a blank
//! line, and the whole thing is sent as a single user message.
//!
//! The built-in prompt targets LegacyCRM logs. A replacement can be loaded
//! from TOML:
//!
//! ```toml
//! suffix = """Classify this log: {log}
//! Category:"""
//!
//! [[examples]]
//! log = "Escalation rule execution failed for ticket ID 3242."
//! category = "Workflow Error"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::LlmError;

/// Template applied to every example.
pub const EXAMPLE_TEMPLATE: &str = "Log: {log}\nCategory: {category}";

/// Separator placed between examples and before the suffix.
pub const EXAMPLE_SEPARATOR: &str = "\n\n";

/// Instruction suffix; `{log}` is replaced by the message being classified.
pub const SUFFIX: &str = "Classify the following LegacyCRM log message into one of these categories:
    (1) Workflow Error
    (2) Deprecation Warning
    If it does not fit either category, return 'Unclassified'.
    Return only the category name.

    Log: {log}
    Category:";

/// Built-in examples, in prompt order.
pub const DEFAULT_EXAMPLES: &[(&str, &str)] = &[
    (
        "Lead conversion failed for prospect ID 7842 during workflow execution.",
        "Workflow Error",
    ),
    (
        "Customer follow-up process for lead ID 5621 failed due to workflow misconfiguration.",
        "Workflow Error",
    ),
    (
        "Escalation rule execution failed for ticket ID 3242.",
        "Workflow Error",
    ),
    (
        "API endpoint 'getCustomerDetails' is deprecated. Please use 'fetchCustomerInfo' instead.",
        "Deprecation Warning",
    ),
    (
        "The 'ExportToCSV' feature is outdated. Please use the new export tool.",
        "Deprecation Warning",
    ),
    (
        "Support for legacy authentication methods will be removed in the next release.",
        "Deprecation Warning",
    ),
];

/// Replace each `{key}` in `template` with its value.
///
/// Substitution is a single left-to-right pass: text inserted for one
/// placeholder is never scanned again, and unknown placeholders are left
/// as they are.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let hit = after.find('}').and_then(|close| {
            let key = &after[..close];
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, close))
        });
        match hit {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

// ---------------------------------------------------------------------------
// FewShotPrompt
// ---------------------------------------------------------------------------

/// One labelled example shown to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FewShotExample {
    /// Example log message.
    pub log: String,
    /// Category the model should answer for it.
    pub category: String,
}

impl FewShotExample {
    /// Build an example.
    #[must_use]
    pub fn new(log: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            log: log.into(),
            category: category.into(),
        }
    }
}

/// Examples plus suffix; renders the full classification prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FewShotPrompt {
    /// Instruction suffix containing `{log}`.
    pub suffix: String,
    /// Examples, in prompt order.
    #[serde(default)]
    pub examples: Vec<FewShotExample>,
}

impl FewShotPrompt {
    /// The compiled-in LegacyCRM prompt.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            suffix: SUFFIX.to_string(),
            examples: DEFAULT_EXAMPLES
                .iter()
                .map(|(log, category)| FewShotExample::new(*log, *category))
                .collect(),
        }
    }

    /// Parse a prompt from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] if the TOML is malformed or the
    /// suffix has no `{log}` placeholder.
    pub fn from_toml(content: &str) -> Result<Self, LlmError> {
        let prompt: Self = toml::from_str(content)
            .map_err(|e| LlmError::ConfigError(format!("invalid prompt file: {e}")))?;
        if !prompt.suffix.contains("{log}") {
            return Err(LlmError::ConfigError(
                "prompt suffix must contain a {log} placeholder".into(),
            ));
        }
        Ok(prompt)
    }

    /// Load a prompt from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LlmError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| LlmError::ConfigError(format!("failed to read {}: {e}", path.display())))?;
        let prompt = Self::from_toml(&content)?;
        info!(path = %path.display(), examples = prompt.examples.len(), "loaded few-shot prompt");
        Ok(prompt)
    }

    /// Render the prompt for `log`.
    #[must_use]
    pub fn render(&self, log: &str) -> String {
        let suffix = render_template(&self.suffix, &[("log", log)]);
        self.examples
            .iter()
            .map(|example| {
                render_template(
                    EXAMPLE_TEMPLATE,
                    &[("log", example.log.as_str()), ("category", example.category.as_str())],
                )
            })
            .chain(std::iter::once(suffix))
            .filter(|piece| !piece.is_empty())
            .collect::<Vec<_>>()
            .join(EXAMPLE_SEPARATOR)
    }
}

impl Default for FewShotPrompt {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_template_replaces_known_keys() {
        let out = render_template("Log: {log}\nCategory: {category}", &[
            ("log", "disk full"),
            ("category", "Resource"),
        ]);
        assert_eq!(out, "Log: disk full\nCategory: Resource");
    }

    #[test]
    fn render_template_is_single_pass() {
        let out = render_template("Log: {log} / {category}", &[
            ("log", "value is {category}"),
            ("category", "X"),
        ]);
        assert_eq!(out, "Log: value is {category} / X");
    }

    #[test]
    fn render_template_keeps_unknown_and_unbalanced_braces() {
        let out = render_template("{ {log} {other} {", &[("log", "m")]);
        assert_eq!(out, "{ m {other} {");
    }

    #[test]
    fn builtin_has_six_examples_in_order() {
        let prompt = FewShotPrompt::builtin();
        assert_eq!(prompt.examples.len(), 6);
        assert_eq!(prompt.examples[0].category, "Workflow Error");
        assert_eq!(prompt.examples[5].category, "Deprecation Warning");
    }

    #[test]
    fn rendered_prompt_layout() {
        let text = FewShotPrompt::builtin().render("System reboot initiated by user 12345.");
        assert!(text.starts_with(
            "Log: Lead conversion failed for prospect ID 7842 during workflow execution.\nCategory: Workflow Error\n\nLog: Customer follow-up"
        ));
        assert!(text.contains(
            "Category: Deprecation Warning\n\nClassify the following LegacyCRM log message"
        ));
        assert!(text.ends_with("    Log: System reboot initiated by user 12345.\n    Category:"));
        assert_eq!(text.matches("Log: ").count(), 7);
    }

    #[test]
    fn braces_in_message_are_not_expanded() {
        let text = FewShotPrompt::builtin().render("template {category} leaked");
        assert!(text.contains("Log: template {category} leaked\n    Category:"));
    }

    #[test]
    fn no_examples_renders_suffix_only() {
        let prompt = FewShotPrompt {
            examples: Vec::new(),
            suffix: "Classify: {log}".into(),
        };
        assert_eq!(prompt.render("x"), "Classify: x");
    }

    #[test]
    fn from_toml_parses_examples_and_suffix() {
        let prompt = FewShotPrompt::from_toml(
            r#"
suffix = "Log: {log}\nCategory:"

[[examples]]
log = "Disk quota exceeded on /var"
category = "Resource Exhaustion"
"#,
        )
        .expect("parse");
        assert_eq!(prompt.examples.len(), 1);
        assert_eq!(
            prompt.render("OOMKilled"),
            "Log: Disk quota exceeded on /var\nCategory: Resource Exhaustion\n\nLog: OOMKilled\nCategory:"
        );
    }

    #[test]
    fn from_toml_requires_log_placeholder() {
        let err = FewShotPrompt::from_toml(r#"suffix = "Category:""#).expect_err("should fail");
        assert!(matches!(err, LlmError::ConfigError(_)));
    }

    #[test]
    fn from_file_missing_is_config_error() {
        let err = FewShotPrompt::from_file("/nonexistent/tierlog/prompt.toml").expect_err("fail");
        assert!(matches!(err, LlmError::ConfigError(_)));
    }

    #[test]
    fn from_file_round_trips_builtin() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("prompt.toml");
        let text = toml::to_string(&FewShotPrompt::builtin()).expect("serialize");
        std::fs::write(&path, text).expect("write");
        let loaded = FewShotPrompt::from_file(&path).expect("load");
        assert_eq!(loaded, FewShotPrompt::builtin());
    }
}
