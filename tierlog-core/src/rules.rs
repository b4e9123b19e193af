//! Tier 1: deterministic pattern rules.
//!
//! Rules are tried in declaration order and the first match wins, so the
//! rule set is an ordered `Vec` rather than a keyed map.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Built-in rules, in match order.
const BUILTIN_RULES: &[(&str, &str)] = &[
    (r"User User\d+ logged (in|out).", "User Action"),
    (r"Backup (started|ended) at .*", "System Notification"),
    (r"Backup completed successfully.", "System Notification"),
    (r"System updated to version .*", "System Notification"),
    (r"File .* uploaded successfully by user .*", "System Notification"),
    (r"Disk cleanup completed successfully.", "System Notification"),
    (r"System reboot initiated by user .*", "System Notification"),
    (r"Account with ID .* created by .*", "User Action"),
];

/// Uncompiled rule as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Regular expression, matched anywhere in the message.
    pub pattern: String,
    /// Category assigned when the pattern matches.
    pub label: String,
}

impl RuleSpec {
    /// Convenience constructor.
    #[must_use]
    pub fn new(pattern: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            label: label.into(),
        }
    }
}

/// A compiled (pattern, label) pair.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pattern: Regex,
    label: String,
}

impl PatternRule {
    /// Compile a rule.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TriageError::Config`] if the pattern is not a valid
    /// regular expression.
    pub fn new(pattern: &str, label: impl Into<String>) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            label: label.into(),
        })
    }

    /// The source pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// The category label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Substring-search match.
    #[must_use]
    pub fn matches(&self, message: &str) -> bool {
        self.pattern.is_match(message)
    }
}

/// Ordered rule set. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<PatternRule>,
}

impl RuleSet {
    /// The built-in rules.
    ///
    /// # Panics
    ///
    /// Never in practice: the built-in patterns are covered by tests.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn builtin() -> Self {
        let rules = BUILTIN_RULES
            .iter()
            .map(|(pattern, label)| PatternRule::new(pattern, *label).expect("built-in rule compiles"))
            .collect();
        Self { rules }
    }

    /// Compile caller-supplied rules, preserving their order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TriageError::Config`] on the first invalid pattern.
    pub fn from_specs(specs: &[RuleSpec]) -> Result<Self> {
        let rules = specs
            .iter()
            .map(|spec| PatternRule::new(&spec.pattern, spec.label.clone()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Append `other`'s rules after this set's rules.
    #[must_use]
    pub fn extend(mut self, other: RuleSet) -> Self {
        self.rules.extend(other.rules);
        self
    }

    /// Label of the first rule that matches, or `None` when nothing matches.
    #[must_use]
    pub fn match_label(&self, message: &str) -> Option<&str> {
        let hit = self.rules.iter().find(|rule| rule.matches(message));
        match hit {
            Some(rule) => {
                debug!(pattern = rule.pattern(), label = rule.label(), "rule matched");
                Some(rule.label())
            }
            None => None,
        }
    }

    /// Rules in match order.
    #[must_use]
    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
