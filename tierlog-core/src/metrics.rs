//! Router counters.
//!
//! Lock-free `AtomicU64` counters incremented on the classification path
//! and read on export. A snapshot renders as Prometheus text or JSON.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::types::Tier;

/// Atomic counters for router outcomes.
pub struct RouterCounters {
    /// Messages submitted to the router.
    pub messages: AtomicU64,
    /// Definitive labels from the rule tier.
    pub regex_hits: AtomicU64,
    /// Definitive labels from the embedding tier.
    pub embedding_hits: AtomicU64,
    /// Definitive labels from the LLM tier.
    pub llm_hits: AtomicU64,
    /// Messages that ended as "Unclassified".
    pub unclassified: AtomicU64,
    /// Calls that ended in an error.
    pub failures: AtomicU64,
}

impl RouterCounters {
    /// Create a new set of zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            messages: AtomicU64::new(0),
            regex_hits: AtomicU64::new(0),
            embedding_hits: AtomicU64::new(0),
            llm_hits: AtomicU64::new(0),
            unclassified: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_message(&self) {
        self.messages.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_hit(&self, tier: Tier) {
        let counter = match tier {
            Tier::Regex => &self.regex_hits,
            Tier::Embedding => &self.embedding_hits,
            Tier::Llm => &self.llm_hits,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unclassified(&self) {
        self.unclassified.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot all counters for export.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            messages: self.messages.load(Ordering::Relaxed),
            hits: [
                self.regex_hits.load(Ordering::Relaxed),
                self.embedding_hits.load(Ordering::Relaxed),
                self.llm_hits.load(Ordering::Relaxed),
            ],
            unclassified: self.unclassified.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for RouterCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot of counter values at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    /// Messages submitted.
    pub messages: u64,
    /// Hits by tier [regex, embedding, llm].
    pub hits: [u64; 3],
    /// Messages that ended as "Unclassified".
    pub unclassified: u64,
    /// Calls that ended in an error.
    pub failures: u64,
}

impl CounterSnapshot {
    /// Format as Prometheus-compatible text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        format!(
            "# HELP tierlog_messages_total Messages submitted for classification\n\
             # TYPE tierlog_messages_total counter\n\
             tierlog_messages_total {}\n\
             # HELP tierlog_tier_hits_total Labels produced by tier\n\
             # TYPE tierlog_tier_hits_total counter\n\
             tierlog_tier_hits_total{{tier=\"regex\"}} {}\n\
             tierlog_tier_hits_total{{tier=\"embedding\"}} {}\n\
             tierlog_tier_hits_total{{tier=\"llm\"}} {}\n\
             # HELP tierlog_unclassified_total Messages left unclassified\n\
             # TYPE tierlog_unclassified_total counter\n\
             tierlog_unclassified_total {}\n\
             # HELP tierlog_failures_total Classification calls that failed\n\
             # TYPE tierlog_failures_total counter\n\
             tierlog_failures_total {}\n",
            self.messages,
            self.hits[0],
            self.hits[1],
            self.hits[2],
            self.unclassified,
            self.failures,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
