use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failures surfaced by the analysis core. None of these are retried:
/// the computation is deterministic, so a retry would fail identically.
/// A failure aborts the snapshot for that entity; the caller decides
/// whether to skip it or abort the whole batch.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Evaluation time precedes an event it is supposed to measure.
    /// Computing against such a clock would yield negative durations.
    #[error(
        "temporal inconsistency for {entity}: event at {event_at} is later than evaluation time {eval_at}"
    )]
    TemporalInconsistency {
        entity: String,
        event_at: DateTime<Utc>,
        eval_at: DateTime<Utc>,
    },

    /// Events recorded in a causally impossible order, e.g. outreach
    /// before the application existed, or a response with no preceding
    /// outreach. The engine never reorders or drops to compensate.
    #[error("causal ordering violation for {entity}: {detail}")]
    CausalOrderingViolation { entity: String, detail: String },

    #[error("unknown application: {0}")]
    UnknownApplication(i64),

    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    #[error("invalid configuration: {field} {reason}")]
    Configuration { field: &'static str, reason: String },
}

impl AnalysisError {
    pub fn config(field: &'static str, reason: impl Into<String>) -> Self {
        AnalysisError::Configuration {
            field,
            reason: reason.into(),
        }
    }
}
