//! One evaluation pass: read the store, compute snapshots, classify, and
//! assemble narratives. The store handle and the evaluation time are both
//! explicit parameters; `eval_at` is captured once by the caller and
//! threaded through so a whole pass sees one consistent clock.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Thresholds;
use crate::db::Store;
use crate::metrics::{self, ApplicationMetrics};
use crate::narrative::{self, PortfolioSnapshot};
use crate::state::{self, ApplicationState, ChannelSignal, PortfolioActivity, PortfolioPattern};

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationReport {
    pub application_id: i64,
    pub state: ApplicationState,
    pub narrative: Vec<String>,
    pub metrics: ApplicationMetrics,
}

/// An entity whose snapshot failed. The batch goes on without it; the
/// reason carries enough context to diagnose without re-deriving anything.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedEntity {
    pub entity: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioReport {
    pub state_distribution: BTreeMap<ApplicationState, usize>,
    pub channel_signal_distribution: BTreeMap<String, ChannelSignal>,
    pub pattern: Option<PortfolioPattern>,
    pub narrative: Vec<String>,
    pub skipped: Vec<SkippedEntity>,
}

pub fn application_report(
    store: &Store,
    application_id: i64,
    thresholds: &Thresholds,
    eval_at: DateTime<Utc>,
) -> Result<ApplicationReport> {
    thresholds.validate()?;
    let events = store.get_events(application_id)?;
    let snapshot = metrics::snapshot_application(&events, eval_at)?;
    let state = state::classify_application(&snapshot, thresholds);
    Ok(ApplicationReport {
        application_id: snapshot.application_id,
        state,
        narrative: narrative::application_narrative(state, &snapshot),
        metrics: snapshot,
    })
}

pub fn portfolio_report(
    store: &Store,
    thresholds: &Thresholds,
    eval_at: DateTime<Utc>,
) -> Result<PortfolioReport> {
    thresholds.validate()?;

    let mut state_distribution: BTreeMap<ApplicationState, usize> = BTreeMap::new();
    let mut skipped = Vec::new();
    let mut followed_up = 0usize;
    let mut first_applied: Option<DateTime<Utc>> = None;
    let mut last_applied: Option<DateTime<Utc>> = None;

    for id in store.list_application_ids()? {
        let events = store.get_events(id)?;
        match metrics::snapshot_application(&events, eval_at) {
            Ok(snapshot) => {
                let state = state::classify_application(&snapshot, thresholds);
                *state_distribution.entry(state).or_insert(0) += 1;
                if snapshot.follow_up_count > 0 {
                    followed_up += 1;
                }
                let applied = events.application.applied_at;
                first_applied = Some(first_applied.map_or(applied, |t| t.min(applied)));
                last_applied = Some(last_applied.map_or(applied, |t| t.max(applied)));
            }
            Err(e) => skipped.push(SkippedEntity {
                entity: format!("application {id}"),
                reason: e.to_string(),
            }),
        }
    }

    let mut channel_signal_distribution: BTreeMap<String, ChannelSignal> = BTreeMap::new();
    let mut total_attempts = 0;
    let mut top_channel_attempts = 0;
    let mut total_responses = 0;
    let mut top_channel_responses = 0;

    for channel in store.list_channels()? {
        let events = store.get_channel_events(&channel)?;
        match metrics::snapshot_channel(&events, eval_at) {
            Ok(snapshot) => {
                let signal = state::classify_channel(&snapshot, thresholds);
                channel_signal_distribution.insert(snapshot.channel.clone(), signal);
                total_attempts += snapshot.attempts;
                top_channel_attempts = top_channel_attempts.max(snapshot.attempts);
                total_responses += snapshot.responses_attributable;
                top_channel_responses =
                    top_channel_responses.max(snapshot.responses_attributable);
            }
            Err(e) => skipped.push(SkippedEntity {
                entity: format!("channel {channel}"),
                reason: e.to_string(),
            }),
        }
    }

    let total = state_distribution.values().sum::<usize>();
    let applications_per_week = match (first_applied, last_applied) {
        (Some(first), Some(last)) => {
            let weeks = (((last - first).num_days() + 6) / 7).max(1);
            Some(total as f64 / weeks as f64)
        }
        _ => None,
    };
    let follow_up_share = if total == 0 {
        0.0
    } else {
        followed_up as f64 / total as f64
    };
    let idle_share = if total == 0 {
        0.0
    } else {
        *state_distribution.get(&ApplicationState::Idle).unwrap_or(&0) as f64 / total as f64
    };
    let pattern = (total > 0).then(|| {
        state::classify_portfolio(
            &PortfolioActivity {
                applications_per_week,
                idle_share,
                follow_up_share,
            },
            thresholds,
        )
    });

    let snapshot = PortfolioSnapshot {
        state_counts: state_distribution.clone(),
        channel_signals: channel_signal_distribution.clone(),
        pattern,
        follow_up_share,
        total_attempts,
        top_channel_attempts,
        total_responses,
        top_channel_responses,
    };

    Ok(PortfolioReport {
        state_distribution,
        channel_signal_distribution,
        pattern,
        narrative: narrative::portfolio_narrative(&snapshot, thresholds),
        skipped,
    })
}
