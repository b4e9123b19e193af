//! Sample messages, grouped by the tier expected to handle them.

use tierlog_core::Tier;

/// Lines the built-in rules are written for (plus one they miss).
pub const REGEX_SAMPLES: &[&str] = &[
    "Backup completed successfully.",
    "Account with ID 1234 created by User1.",
    "Hey Bro, chill ya!",
];

/// Lines for the trained classifier.
pub const EMBEDDING_SAMPLES: &[&str] = &[
    "alpha.osapi_compute.wsgi.server - 12.10.11.1 - API returned 404 not found error",
    "GET /v2/3454/servers/detail HTTP/1.1 RCODE   404 len: 1583 time: 0.1878400",
    "System crashed due to drivers errors when restarting the server",
    "Hey bro, chill ya!",
    "Multiple login failures occurred on user 6454 account",
    "Server A790 was restarted unexpectedly during the process of data transfer",
];

/// LegacyCRM lines for the few-shot LLM prompt.
pub const LLM_SAMPLES: &[&str] = &[
    "Case escalation for ticket ID 7324 failed because the assigned support agent is no longer active.",
    "The 'ReportGenerator' module will be retired in version 4.0. Please migrate to the 'AdvancedAnalyticsSuite' by Dec 2025",
    "System reboot initiated by user 12345.",
];

/// Samples for `tier`.
#[must_use]
pub fn samples(tier: Tier) -> &'static [&'static str] {
    match tier {
        Tier::Regex => REGEX_SAMPLES,
        Tier::Embedding => EMBEDDING_SAMPLES,
        Tier::Llm => LLM_SAMPLES,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tierlog_core::RuleSet;

    #[test]
    fn regex_samples_hit_builtins_except_the_last() {
        let rules = RuleSet::builtin();
        assert_eq!(rules.match_label(REGEX_SAMPLES[0]), Some("System Notification"));
        assert_eq!(rules.match_label(REGEX_SAMPLES[1]), Some("User Action"));
        assert_eq!(rules.match_label(REGEX_SAMPLES[2]), None);
    }

    #[test]
    fn every_tier_has_samples() {
        for tier in Tier::all() {
            assert!(!samples(*tier).is_empty());
        }
    }
}
