//! Canonical metric computation. Every function here is a pure function of
//! its arguments: the only clock is the explicit evaluation time `eval_at`,
//! so recomputing a snapshot from the same events yields identical results.
//! Nothing computed here is ever written back to the store.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AnalysisError;
use crate::models::{ApplicationEvents, ChannelEvents, OutreachKind, ResponseKind};

/// Per-application measures derived from its event set as of `eval_at`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationMetrics {
    pub application_id: i64,
    pub days_since_applied: i64,
    pub outreach_count: usize,
    pub follow_up_count: usize,
    /// None means no outreach has ever been logged. Not zero: zero would
    /// falsely read as "outreach happened today".
    pub days_since_last_outreach: Option<i64>,
    pub response_count: usize,
    pub has_response: bool,
    pub days_since_last_response: Option<i64>,
    pub terminal_response: Option<ResponseKind>,
}

/// Per-channel measures aggregated across applications.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelMetrics {
    pub channel: String,
    pub attempts: usize,
    pub responses_attributable: usize,
    /// None when there are no attempts; a rate over zero attempts is
    /// undefined, not 0.0.
    pub response_rate: Option<f64>,
}

fn days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
    (later - earlier).num_days()
}

/// Compute the metric snapshot for one application.
///
/// Fails before producing any metric if `eval_at` precedes an event being
/// measured, or if the events are causally impossible (outreach before the
/// application existed, response before any outreach). Snapshots are all
/// or nothing; there is no partial result to misread.
pub fn snapshot_application(
    events: &ApplicationEvents,
    eval_at: DateTime<Utc>,
) -> Result<ApplicationMetrics, AnalysisError> {
    let app = &events.application;
    let entity = format!("application {}", app.id);

    let mut latest = app.applied_at;
    for o in &events.outreach {
        latest = latest.max(o.at);
    }
    for r in &events.responses {
        latest = latest.max(r.at);
    }
    if latest > eval_at {
        return Err(AnalysisError::TemporalInconsistency {
            entity,
            event_at: latest,
            eval_at,
        });
    }

    if let Some(o) = events.outreach.iter().find(|o| o.at < app.applied_at) {
        return Err(AnalysisError::CausalOrderingViolation {
            entity,
            detail: format!(
                "outreach {} at {} precedes application date {}",
                o.id, o.at, app.applied_at
            ),
        });
    }

    let first_outreach = events.outreach.iter().map(|o| o.at).min();
    if let Some(r) = events.responses.iter().find(|r| match first_outreach {
        Some(first) => r.at < first,
        None => true, // a response with nothing to respond to
    }) {
        return Err(AnalysisError::CausalOrderingViolation {
            entity,
            detail: format!("response {} at {} precedes any outreach", r.id, r.at),
        });
    }

    let last_outreach = events.outreach.iter().map(|o| o.at).max();
    let last_response = events.responses.iter().map(|r| r.at).max();

    // First terminal response wins if several were recorded.
    let terminal_response = events
        .responses
        .iter()
        .filter(|r| r.kind.is_terminal())
        .min_by_key(|r| r.at)
        .map(|r| r.kind);

    Ok(ApplicationMetrics {
        application_id: app.id,
        days_since_applied: days_between(app.applied_at, eval_at),
        outreach_count: events.outreach.len(),
        follow_up_count: events
            .outreach
            .iter()
            .filter(|o| o.kind == OutreachKind::FollowUp)
            .count(),
        days_since_last_outreach: last_outreach.map(|at| days_between(at, eval_at)),
        response_count: events.responses.len(),
        has_response: !events.responses.is_empty(),
        days_since_last_response: last_response.map(|at| days_between(at, eval_at)),
        terminal_response,
    })
}

/// Compute the metric snapshot for one channel.
pub fn snapshot_channel(
    events: &ChannelEvents,
    eval_at: DateTime<Utc>,
) -> Result<ChannelMetrics, AnalysisError> {
    let latest = events
        .outreach
        .iter()
        .map(|o| o.at)
        .chain(events.responses.iter().map(|r| r.at))
        .max();
    if let Some(latest) = latest {
        if latest > eval_at {
            return Err(AnalysisError::TemporalInconsistency {
                entity: format!("channel {}", events.channel),
                event_at: latest,
                eval_at,
            });
        }
    }

    let attempts = events.outreach.len();
    let responses_attributable = events.responses.len();
    let response_rate = if attempts == 0 {
        None
    } else {
        Some(responses_attributable as f64 / attempts as f64)
    };

    Ok(ChannelMetrics {
        channel: events.channel.clone(),
        attempts,
        responses_attributable,
        response_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Application, OutreachEvent, OutreachKind, ResponseEvent};
    use chrono::TimeZone;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, day, 12, 0, 0).unwrap()
    }

    fn app(applied_day: u32) -> Application {
        Application {
            id: 1,
            company: "Acme".into(),
            role: "Engineer".into(),
            applied_at: ts(applied_day),
        }
    }

    fn outreach(id: i64, day: u32, kind: OutreachKind) -> OutreachEvent {
        OutreachEvent {
            id,
            application_id: 1,
            channel: "email".into(),
            kind,
            at: ts(day),
        }
    }

    fn response(id: i64, day: u32, kind: ResponseKind) -> ResponseEvent {
        ResponseEvent {
            id,
            application_id: 1,
            channel: Some("email".into()),
            kind,
            at: ts(day),
        }
    }

    #[test]
    fn snapshot_is_deterministic() {
        let events = ApplicationEvents {
            application: app(1),
            outreach: vec![outreach(1, 3, OutreachKind::Initial)],
            responses: vec![response(1, 5, ResponseKind::Acknowledgement)],
        };
        let a = snapshot_application(&events, ts(20)).unwrap();
        let b = snapshot_application(&events, ts(20)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn no_outreach_is_none_not_zero() {
        let events = ApplicationEvents {
            application: app(1),
            outreach: vec![],
            responses: vec![],
        };
        let m = snapshot_application(&events, ts(15)).unwrap();
        assert_eq!(m.days_since_last_outreach, None);
        assert_eq!(m.days_since_last_response, None);
        assert_eq!(m.days_since_applied, 14);
        assert!(!m.has_response);
    }

    #[test]
    fn later_evaluation_moves_staleness_upward() {
        let events = ApplicationEvents {
            application: app(1),
            outreach: vec![outreach(1, 4, OutreachKind::Initial)],
            responses: vec![],
        };
        let early = snapshot_application(&events, ts(10)).unwrap();
        let late = snapshot_application(&events, ts(20)).unwrap();
        assert!(late.days_since_last_outreach.unwrap() > early.days_since_last_outreach.unwrap());
    }

    #[test]
    fn evaluation_before_event_fails() {
        let events = ApplicationEvents {
            application: app(1),
            outreach: vec![outreach(1, 9, OutreachKind::Initial)],
            responses: vec![],
        };
        let err = snapshot_application(&events, ts(5)).unwrap_err();
        assert!(matches!(err, AnalysisError::TemporalInconsistency { .. }));
    }

    #[test]
    fn outreach_before_application_fails() {
        let events = ApplicationEvents {
            application: app(10),
            outreach: vec![outreach(1, 2, OutreachKind::Initial)],
            responses: vec![],
        };
        let err = snapshot_application(&events, ts(20)).unwrap_err();
        assert!(matches!(err, AnalysisError::CausalOrderingViolation { .. }));
    }

    #[test]
    fn response_without_outreach_fails() {
        let events = ApplicationEvents {
            application: app(1),
            outreach: vec![],
            responses: vec![response(1, 5, ResponseKind::Acknowledgement)],
        };
        let err = snapshot_application(&events, ts(20)).unwrap_err();
        assert!(matches!(err, AnalysisError::CausalOrderingViolation { .. }));
    }

    #[test]
    fn follow_ups_are_counted_separately() {
        let events = ApplicationEvents {
            application: app(1),
            outreach: vec![
                outreach(1, 2, OutreachKind::Initial),
                outreach(2, 6, OutreachKind::FollowUp),
                outreach(3, 9, OutreachKind::FollowUp),
            ],
            responses: vec![],
        };
        let m = snapshot_application(&events, ts(10)).unwrap();
        assert_eq!(m.outreach_count, 3);
        assert_eq!(m.follow_up_count, 2);
        assert_eq!(m.days_since_last_outreach, Some(1));
    }

    #[test]
    fn terminal_response_is_surfaced() {
        let events = ApplicationEvents {
            application: app(1),
            outreach: vec![outreach(1, 2, OutreachKind::Initial)],
            responses: vec![
                response(1, 4, ResponseKind::Acknowledgement),
                response(2, 8, ResponseKind::Rejection),
            ],
        };
        let m = snapshot_application(&events, ts(10)).unwrap();
        assert_eq!(m.terminal_response, Some(ResponseKind::Rejection));
    }

    #[test]
    fn zero_attempt_channel_has_undefined_rate() {
        let events = ChannelEvents {
            channel: "referral".into(),
            outreach: vec![],
            responses: vec![],
        };
        let m = snapshot_channel(&events, ts(10)).unwrap();
        assert_eq!(m.response_rate, None);
        assert_eq!(m.attempts, 0);
    }

    #[test]
    fn channel_rate_is_responses_over_attempts() {
        let events = ChannelEvents {
            channel: "email".into(),
            outreach: vec![
                outreach(1, 2, OutreachKind::Initial),
                outreach(2, 3, OutreachKind::Initial),
                outreach(3, 4, OutreachKind::Initial),
                outreach(4, 5, OutreachKind::Initial),
            ],
            responses: vec![response(1, 6, ResponseKind::Acknowledgement)],
        };
        let m = snapshot_channel(&events, ts(10)).unwrap();
        assert_eq!(m.attempts, 4);
        assert_eq!(m.responses_attributable, 1);
        assert_eq!(m.response_rate, Some(0.25));
    }
}
