//! Narrative assembly: states plus supporting metrics in, a short ordered
//! list of neutral sentences out. All text comes from the fixed template
//! tables below; assembly only selects and orders, so identical input
//! always produces identical output. Suppression rules keep any one output
//! from asserting opposite claims about the same metric.

use std::collections::BTreeMap;

use crate::config::Thresholds;
use crate::metrics::ApplicationMetrics;
use crate::state::{ApplicationState, ChannelSignal, PortfolioPattern};

fn application_primary(state: ApplicationState, metrics: &ApplicationMetrics) -> &'static str {
    match state {
        ApplicationState::Closed => "This application has reached a terminal outcome and is closed.",
        ApplicationState::Active => "This application has ongoing outreach activity.",
        ApplicationState::Unengaged => {
            "This application has been submitted, but no outreach has been logged yet."
        }
        // Idle is the residual state; it also covers young applications
        // that simply have nothing logged yet.
        ApplicationState::Idle if metrics.outreach_count == 0 => {
            "This application was submitted recently and has no outreach logged yet."
        }
        ApplicationState::Idle => {
            "Outreach has occurred, but there has been no recent activity on this application."
        }
    }
}

const RESPONSE_RECEIVED: &str = "A response has been received for this application.";
const NO_FOLLOW_UP: &str = "No follow-up has been logged after the initial outreach.";

/// Per-application narrative: one primary sentence keyed by state, plus at
/// most one modifier. The response modifier is suppressed for `closed`
/// (the terminal sentence already subsumes it); the follow-up modifier is
/// suppressed wherever no outreach exists for it to qualify.
pub fn application_narrative(
    state: ApplicationState,
    metrics: &ApplicationMetrics,
) -> Vec<String> {
    let mut sentences = vec![application_primary(state, metrics).to_string()];

    if state != ApplicationState::Closed {
        if metrics.has_response {
            sentences.push(RESPONSE_RECEIVED.to_string());
        } else if metrics.outreach_count > 0 && metrics.follow_up_count == 0 {
            sentences.push(NO_FOLLOW_UP.to_string());
        }
    }

    sentences
}

pub fn channel_sentence(signal: ChannelSignal) -> &'static str {
    match signal {
        ChannelSignal::NoSignal => "This channel has not produced any responses yet.",
        ChannelSignal::Emerging => {
            "This channel is beginning to show responses, though the signal is still forming."
        }
        ChannelSignal::Stable => {
            "This channel has produced enough activity to support reliable observation."
        }
    }
}

/// Aggregate inputs for the portfolio narrative, assembled by the caller
/// from classified applications and channels.
#[derive(Debug, Clone, Default)]
pub struct PortfolioSnapshot {
    pub state_counts: BTreeMap<ApplicationState, usize>,
    pub channel_signals: BTreeMap<String, ChannelSignal>,
    /// None when the portfolio is empty and there is no pattern to name.
    pub pattern: Option<PortfolioPattern>,
    pub follow_up_share: f64,
    pub total_attempts: usize,
    pub top_channel_attempts: usize,
    pub total_responses: usize,
    pub top_channel_responses: usize,
}

impl PortfolioSnapshot {
    pub fn applications_total(&self) -> usize {
        self.state_counts.values().sum()
    }
}

fn pattern_sentence(pattern: PortfolioPattern) -> &'static str {
    match pattern {
        PortfolioPattern::Inactive => {
            "Overall activity across applications has been limited recently."
        }
        PortfolioPattern::Stalled => {
            "Earlier activity occurred, but many applications have since become inactive."
        }
        PortfolioPattern::SteadyEngagement => {
            "Applications are being submitted and engaged with consistently."
        }
        PortfolioPattern::UnstructuredBursting => {
            "Applications are being submitted, but engagement across them has been uneven."
        }
    }
}

fn skew_sentence(state: ApplicationState) -> &'static str {
    match state {
        ApplicationState::Closed => "Most applications have reached a terminal outcome.",
        ApplicationState::Active => "Most applications currently have recent outreach activity.",
        ApplicationState::Unengaged => "Most applications have had no outreach at all.",
        // Idle also absorbs young zero-outreach applications, so this may
        // not claim that outreach ever happened.
        ApplicationState::Idle => "Most applications have seen no activity recently.",
    }
}

const LOW_FOLLOW_UP: &str = "Follow-up activity has been limited across applications.";
const CHANNEL_CONCENTRATION: &str = "Most responses have come from a single outreach channel.";
const OUTREACH_CONCENTRATED: &str = "Outreach is concentrated in a narrow set of channels.";
const OUTREACH_DIFFUSE: &str = "Outreach is spread across several channels.";

/// Portfolio narrative. Each pattern claim is gated by a minimum-count
/// threshold so sparse data never triggers a premature pattern statement.
pub fn portfolio_narrative(snapshot: &PortfolioSnapshot, thresholds: &Thresholds) -> Vec<String> {
    let mut sentences = Vec::new();
    let total = snapshot.applications_total();

    if let Some(pattern) = snapshot.pattern {
        sentences.push(pattern_sentence(pattern).to_string());
    }

    if total >= thresholds.min_applications_for_skew_claim {
        let dominant = snapshot
            .state_counts
            .iter()
            .max_by_key(|(_, count)| **count);
        if let Some((state, count)) = dominant {
            // A stalled pattern already says the portfolio went quiet; the
            // idle skew sentence would restate it.
            let redundant = *state == ApplicationState::Idle
                && snapshot.pattern == Some(PortfolioPattern::Stalled);
            if !redundant && *count as f64 / total as f64 >= thresholds.state_skew_fraction {
                sentences.push(skew_sentence(*state).to_string());
            }
        }
    }

    if total >= thresholds.min_applications_for_skew_claim
        && snapshot.follow_up_share < thresholds.low_follow_up_fraction
    {
        sentences.push(LOW_FOLLOW_UP.to_string());
    }

    if snapshot.total_responses >= thresholds.min_responses_for_channel_claim
        && snapshot.top_channel_responses as f64 / snapshot.total_responses as f64
            >= thresholds.channel_concentration_fraction
    {
        sentences.push(CHANNEL_CONCENTRATION.to_string());
    }

    // Coarse structure descriptor. One claim per metric: concentrated and
    // diffuse can never co-occur.
    if snapshot.channel_signals.len() >= 2 && snapshot.total_attempts > 0 {
        let share = snapshot.top_channel_attempts as f64 / snapshot.total_attempts as f64;
        if share >= thresholds.channel_concentration_fraction {
            sentences.push(OUTREACH_CONCENTRATED.to_string());
        } else {
            sentences.push(OUTREACH_DIFFUSE.to_string());
        }
    }

    sentences
}
