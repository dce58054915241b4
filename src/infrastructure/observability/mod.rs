//! Observability infrastructure

mod metrics;

pub use metrics::{record_eviction, record_lookup, record_store, EvictionReason, LookupOutcome};
