//! Cache metrics
//!
//! Counters are emitted through the `metrics` facade. Without an installed
//! recorder they are no-ops, so the library never requires an exporter.

use metrics::counter;

/// How a lookup was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    SemanticHit,
    ExactHit,
    Miss,
}

impl LookupOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SemanticHit => "semantic_hit",
            Self::ExactHit => "exact_hit",
            Self::Miss => "miss",
        }
    }
}

/// Why entries were evicted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    Expired,
    OverCapacity,
    Foreign,
}

impl EvictionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expired => "expired",
            Self::OverCapacity => "over_capacity",
            Self::Foreign => "foreign",
        }
    }
}

/// Record a finished lookup
pub fn record_lookup(outcome: LookupOutcome, fallback: bool) {
    let labels = [
        ("outcome", outcome.as_str().to_string()),
        ("fallback", fallback.to_string()),
    ];

    counter!("schema_cache_lookups_total", &labels).increment(1);
}

/// Record a stored entry
pub fn record_store(embedded: bool) {
    let labels = [("embedded", embedded.to_string())];

    counter!("schema_cache_stores_total", &labels).increment(1);
}

/// Record evicted entries
pub fn record_eviction(reason: EvictionReason, count: usize) {
    if count == 0 {
        return;
    }

    let labels = [("reason", reason.as_str().to_string())];

    counter!("schema_cache_evictions_total", &labels).increment(count as u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_values() {
        assert_eq!(LookupOutcome::SemanticHit.as_str(), "semantic_hit");
        assert_eq!(LookupOutcome::ExactHit.as_str(), "exact_hit");
        assert_eq!(LookupOutcome::Miss.as_str(), "miss");
        assert_eq!(EvictionReason::OverCapacity.as_str(), "over_capacity");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_lookup(LookupOutcome::Miss, true);
        record_store(false);
        record_eviction(EvictionReason::Expired, 3);
        record_eviction(EvictionReason::Foreign, 0);
    }
}
