use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered (base, quote) combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    pub base: String,
    pub quote: String,
}

impl CurrencyPair {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// What happened to a single pair during a sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PairOutcome {
    Success {
        inserted: u64,
        already_present: u64,
        rejected_entries: u64,
    },
    /// Provider answered without a meta or data section
    NoData,
    ProviderFailed { reason: String },
    /// Provider referenced a currency code the directory does not know
    ConfigError { reason: String },
    StoreFailed { reason: String },
}

impl PairOutcome {
    pub fn inserted(&self) -> u64 {
        match self {
            PairOutcome::Success { inserted, .. } => *inserted,
            _ => 0,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            PairOutcome::ProviderFailed { .. }
                | PairOutcome::ConfigError { .. }
                | PairOutcome::StoreFailed { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairReport {
    pub base: String,
    pub quote: String,
    #[serde(flatten)]
    pub outcome: PairOutcome,
}

/// Summary of one sync run, pairs listed in matrix order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub pairs: Vec<PairReport>,
}

impl SyncReport {
    pub fn total_inserted(&self) -> u64 {
        self.pairs.iter().map(|p| p.outcome.inserted()).sum()
    }

    pub fn failed_pairs(&self) -> usize {
        self.pairs.iter().filter(|p| p.outcome.is_failure()).count()
    }

    pub fn succeeded_pairs(&self) -> usize {
        self.pairs
            .iter()
            .filter(|p| matches!(p.outcome, PairOutcome::Success { .. }))
            .count()
    }

    /// True when there was at least one pair and none of them got through.
    pub fn all_failed(&self) -> bool {
        !self.pairs.is_empty() && self.failed_pairs() == self.pairs.len()
    }

    pub fn outcome_for(&self, base: &str, quote: &str) -> Option<&PairOutcome> {
        self.pairs
            .iter()
            .find(|p| p.base == base && p.quote == quote)
            .map(|p| &p.outcome)
    }

    /// One line per failed pair, used as the recorded job error.
    pub fn failure_summary(&self) -> Option<String> {
        let lines: Vec<String> = self
            .pairs
            .iter()
            .filter_map(|p| match &p.outcome {
                PairOutcome::ProviderFailed { reason }
                | PairOutcome::ConfigError { reason }
                | PairOutcome::StoreFailed { reason } => {
                    Some(format!("{}/{}: {}", p.base, p.quote, reason))
                }
                _ => None,
            })
            .collect();

        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}
