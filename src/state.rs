//! Rule-based classification of metric snapshots into behavioral states.
//! Each classifier is an ordered list of (predicate, label) pairs walked in
//! a single pass; the first match wins and the last rule always matches, so
//! every valid snapshot maps to exactly one label.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Thresholds;
use crate::metrics::{ApplicationMetrics, ChannelMetrics};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationState {
    Closed,
    Active,
    Unengaged,
    Idle,
}

impl ApplicationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationState::Closed => "closed",
            ApplicationState::Active => "active",
            ApplicationState::Unengaged => "unengaged",
            ApplicationState::Idle => "idle",
        }
    }
}

impl fmt::Display for ApplicationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelSignal {
    NoSignal,
    Emerging,
    Stable,
}

impl ChannelSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelSignal::NoSignal => "no_signal",
            ChannelSignal::Emerging => "emerging",
            ChannelSignal::Stable => "stable",
        }
    }
}

impl fmt::Display for ChannelSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortfolioPattern {
    Inactive,
    Stalled,
    SteadyEngagement,
    UnstructuredBursting,
}

impl PortfolioPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortfolioPattern::Inactive => "inactive",
            PortfolioPattern::Stalled => "stalled",
            PortfolioPattern::SteadyEngagement => "steady_engagement",
            PortfolioPattern::UnstructuredBursting => "unstructured_bursting",
        }
    }
}

impl fmt::Display for PortfolioPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Portfolio-wide activity measures the pattern classifier works from,
/// derived by the caller from classified applications.
#[derive(Debug, Clone, Copy)]
pub struct PortfolioActivity {
    /// None when there are no applications to rate.
    pub applications_per_week: Option<f64>,
    /// Share of applications currently idle.
    pub idle_share: f64,
    /// Share of applications with at least one follow-up.
    pub follow_up_share: f64,
}

type AppRule = (
    fn(&ApplicationMetrics, &Thresholds) -> bool,
    ApplicationState,
);

/// Precedence, highest first. A terminal market response overrides every
/// engagement signal, which is why `closed` sits at the top.
const APPLICATION_RULES: &[AppRule] = &[
    (
        |m, _| m.terminal_response.is_some(),
        ApplicationState::Closed,
    ),
    (
        |m, t| {
            m.days_since_last_outreach
                .is_some_and(|d| d <= t.recent_outreach_window_days)
        },
        ApplicationState::Active,
    ),
    (
        |m, t| m.outreach_count == 0 && m.days_since_applied > t.unengaged_threshold_days,
        ApplicationState::Unengaged,
    ),
    // Residual: outreach happened but went quiet, or the application is
    // still too young to call unengaged.
    (|_, _| true, ApplicationState::Idle),
];

pub fn classify_application(metrics: &ApplicationMetrics, thresholds: &Thresholds) -> ApplicationState {
    for (predicate, state) in APPLICATION_RULES {
        if predicate(metrics, thresholds) {
            return *state;
        }
    }
    unreachable!("final classification rule is a catch-all")
}

type ChannelRule = (fn(&ChannelMetrics, &Thresholds) -> bool, ChannelSignal);

const CHANNEL_RULES: &[ChannelRule] = &[
    (
        |m, _| m.attempts == 0 || m.responses_attributable == 0,
        ChannelSignal::NoSignal,
    ),
    (
        |m, t| {
            m.attempts >= t.min_sample_size
                && m.response_rate.is_some_and(|r| r >= t.stable_rate_floor)
        },
        ChannelSignal::Stable,
    ),
    // Residual: some responses, but below the stability bar.
    (|_, _| true, ChannelSignal::Emerging),
];

pub fn classify_channel(metrics: &ChannelMetrics, thresholds: &Thresholds) -> ChannelSignal {
    for (predicate, signal) in CHANNEL_RULES {
        if predicate(metrics, thresholds) {
            return *signal;
        }
    }
    unreachable!("final classification rule is a catch-all")
}

type PortfolioRule = (fn(&PortfolioActivity, &Thresholds) -> bool, PortfolioPattern);

const PORTFOLIO_RULES: &[PortfolioRule] = &[
    (
        |a, t| {
            a.applications_per_week
                .map_or(true, |rate| rate < t.inactive_weekly_rate)
        },
        PortfolioPattern::Inactive,
    ),
    (
        |a, t| a.idle_share > t.high_idle_fraction,
        PortfolioPattern::Stalled,
    ),
    (
        |a, t| a.follow_up_share >= t.low_follow_up_fraction,
        PortfolioPattern::SteadyEngagement,
    ),
    // Residual: applications keep arriving but engagement is uneven.
    (|_, _| true, PortfolioPattern::UnstructuredBursting),
];

pub fn classify_portfolio(activity: &PortfolioActivity, thresholds: &Thresholds) -> PortfolioPattern {
    for (predicate, pattern) in PORTFOLIO_RULES {
        if predicate(activity, thresholds) {
            return *pattern;
        }
    }
    unreachable!("final classification rule is a catch-all")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> ApplicationMetrics {
        ApplicationMetrics {
            application_id: 1,
            days_since_applied: 0,
            outreach_count: 0,
            follow_up_count: 0,
            days_since_last_outreach: None,
            response_count: 0,
            has_response: false,
            days_since_last_response: None,
            terminal_response: None,
        }
    }

    fn channel(attempts: usize, responses: usize) -> ChannelMetrics {
        ChannelMetrics {
            channel: "email".into(),
            attempts,
            responses_attributable: responses,
            response_rate: if attempts == 0 {
                None
            } else {
                Some(responses as f64 / attempts as f64)
            },
        }
    }

    #[test]
    fn thirty_days_no_outreach_is_unengaged() {
        let mut m = metrics();
        m.days_since_applied = 30;
        let t = Thresholds {
            unengaged_threshold_days: 14,
            ..Thresholds::default()
        };
        assert_eq!(classify_application(&m, &t), ApplicationState::Unengaged);
    }

    #[test]
    fn recent_outreach_is_active() {
        let mut m = metrics();
        m.days_since_applied = 10;
        m.outreach_count = 1;
        m.days_since_last_outreach = Some(2);
        let t = Thresholds {
            recent_outreach_window_days: 7,
            ..Thresholds::default()
        };
        assert_eq!(classify_application(&m, &t), ApplicationState::Active);
    }

    #[test]
    fn terminal_response_overrides_recent_outreach() {
        let mut m = metrics();
        m.outreach_count = 3;
        m.days_since_last_outreach = Some(1);
        m.has_response = true;
        m.response_count = 1;
        m.terminal_response = Some(crate::models::ResponseKind::Rejection);
        assert_eq!(
            classify_application(&m, &Thresholds::default()),
            ApplicationState::Closed
        );
    }

    #[test]
    fn stale_outreach_is_idle() {
        let mut m = metrics();
        m.days_since_applied = 40;
        m.outreach_count = 2;
        m.days_since_last_outreach = Some(20);
        assert_eq!(
            classify_application(&m, &Thresholds::default()),
            ApplicationState::Idle
        );
    }

    #[test]
    fn fresh_application_without_outreach_is_idle_not_unengaged() {
        let mut m = metrics();
        m.days_since_applied = 3;
        assert_eq!(
            classify_application(&m, &Thresholds::default()),
            ApplicationState::Idle
        );
    }

    #[test]
    fn classification_is_total_over_a_spread_of_snapshots() {
        let t = Thresholds::default();
        for days_applied in [0, 7, 15, 60] {
            for last_outreach in [None, Some(0), Some(3), Some(30)] {
                let mut m = metrics();
                m.days_since_applied = days_applied;
                m.days_since_last_outreach = last_outreach;
                m.outreach_count = usize::from(last_outreach.is_some());
                // Must return without panicking for every combination.
                let _ = classify_application(&m, &t);
            }
        }
    }

    #[test]
    fn single_response_channel_is_emerging_not_stable() {
        let t = Thresholds {
            min_sample_size: 5,
            ..Thresholds::default()
        };
        // 1/1 is a 100% rate, but the sample is far too small to trust.
        assert_eq!(classify_channel(&channel(1, 1), &t), ChannelSignal::Emerging);
    }

    #[test]
    fn quiet_channel_has_no_signal() {
        let t = Thresholds::default();
        assert_eq!(classify_channel(&channel(0, 0), &t), ChannelSignal::NoSignal);
        assert_eq!(classify_channel(&channel(4, 0), &t), ChannelSignal::NoSignal);
    }

    fn activity(per_week: Option<f64>, idle: f64, follow_up: f64) -> PortfolioActivity {
        PortfolioActivity {
            applications_per_week: per_week,
            idle_share: idle,
            follow_up_share: follow_up,
        }
    }

    #[test]
    fn slow_application_rate_is_inactive() {
        let t = Thresholds::default();
        assert_eq!(
            classify_portfolio(&activity(Some(0.2), 0.0, 1.0), &t),
            PortfolioPattern::Inactive
        );
        assert_eq!(
            classify_portfolio(&activity(None, 0.0, 0.0), &t),
            PortfolioPattern::Inactive
        );
    }

    #[test]
    fn high_idle_share_is_stalled() {
        let t = Thresholds::default();
        assert_eq!(
            classify_portfolio(&activity(Some(2.0), 0.5, 0.8), &t),
            PortfolioPattern::Stalled
        );
    }

    #[test]
    fn sustained_follow_up_is_steady_engagement() {
        let t = Thresholds::default();
        assert_eq!(
            classify_portfolio(&activity(Some(2.0), 0.1, 0.6), &t),
            PortfolioPattern::SteadyEngagement
        );
    }

    #[test]
    fn sparse_follow_up_is_unstructured_bursting() {
        let t = Thresholds::default();
        assert_eq!(
            classify_portfolio(&activity(Some(2.0), 0.1, 0.1), &t),
            PortfolioPattern::UnstructuredBursting
        );
    }

    #[test]
    fn sampled_responsive_channel_is_stable() {
        let t = Thresholds {
            min_sample_size: 5,
            stable_rate_floor: 0.2,
            ..Thresholds::default()
        };
        assert_eq!(classify_channel(&channel(10, 3), &t), ChannelSignal::Stable);
    }
}
