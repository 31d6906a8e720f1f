use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Classification and narrative thresholds. Every cutoff the pipeline
/// uses lives here so the precedence rules stay free of magic numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thresholds {
    /// Outreach within this many days of evaluation counts as "recent".
    pub recent_outreach_window_days: i64,
    /// An application with zero outreach older than this is unengaged.
    pub unengaged_threshold_days: i64,
    /// Attempts required before a channel's response rate means anything.
    /// Guards a 1-attempt/1-response channel from reading as stable.
    pub min_sample_size: usize,
    /// Response rate a channel must sustain to be called stable.
    pub stable_rate_floor: f64,
    /// Total responses required before any channel-concentration claim.
    pub min_responses_for_channel_claim: usize,
    /// Applications required before any state-skew claim.
    pub min_applications_for_skew_claim: usize,
    /// Fraction of applications in one state that counts as skew.
    pub state_skew_fraction: f64,
    /// Share of responses from one channel that counts as concentrated.
    pub channel_concentration_fraction: f64,
    /// Weekly application rate below which the whole portfolio is inactive.
    pub inactive_weekly_rate: f64,
    /// Share of idle applications that marks the portfolio as stalled.
    pub high_idle_fraction: f64,
    /// Share of followed-up applications below which follow-up is called
    /// limited; at or above it, engagement counts as steady.
    pub low_follow_up_fraction: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            recent_outreach_window_days: 7,
            unengaged_threshold_days: 14,
            min_sample_size: 5,
            stable_rate_floor: 0.2,
            min_responses_for_channel_claim: 3,
            min_applications_for_skew_claim: 3,
            state_skew_fraction: 0.5,
            channel_concentration_fraction: 0.6,
            inactive_weekly_rate: 0.5,
            high_idle_fraction: 0.3,
            low_follow_up_fraction: 0.5,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.recent_outreach_window_days < 0 {
            return Err(AnalysisError::config(
                "recent_outreach_window_days",
                format!("must be non-negative, got {}", self.recent_outreach_window_days),
            ));
        }
        if self.unengaged_threshold_days < 0 {
            return Err(AnalysisError::config(
                "unengaged_threshold_days",
                format!("must be non-negative, got {}", self.unengaged_threshold_days),
            ));
        }
        if self.min_sample_size == 0 {
            return Err(AnalysisError::config(
                "min_sample_size",
                "must be at least 1".to_string(),
            ));
        }
        if !(self.inactive_weekly_rate > 0.0) {
            return Err(AnalysisError::config(
                "inactive_weekly_rate",
                format!("must be positive, got {}", self.inactive_weekly_rate),
            ));
        }
        for (field, value) in [
            ("stable_rate_floor", self.stable_rate_floor),
            ("state_skew_fraction", self.state_skew_fraction),
            (
                "channel_concentration_fraction",
                self.channel_concentration_fraction,
            ),
            ("high_idle_fraction", self.high_idle_fraction),
            ("low_follow_up_fraction", self.low_follow_up_fraction),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(AnalysisError::config(
                    field,
                    format!("must be within (0, 1], got {value}"),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Thresholds::default().validate().is_ok());
    }

    #[test]
    fn negative_day_count_is_rejected() {
        let mut t = Thresholds::default();
        t.unengaged_threshold_days = -1;
        let err = t.validate().unwrap_err();
        assert!(err.to_string().contains("unengaged_threshold_days"));
    }

    #[test]
    fn zero_sample_size_is_rejected() {
        let mut t = Thresholds::default();
        t.min_sample_size = 0;
        assert!(t.validate().is_err());
    }

    #[test]
    fn rate_floor_above_one_is_rejected() {
        let mut t = Thresholds::default();
        t.stable_rate_floor = 1.5;
        let err = t.validate().unwrap_err();
        assert!(err.to_string().contains("stable_rate_floor"));
    }

    #[test]
    fn non_positive_weekly_rate_is_rejected() {
        let mut t = Thresholds::default();
        t.inactive_weekly_rate = 0.0;
        let err = t.validate().unwrap_err();
        assert!(err.to_string().contains("inactive_weekly_rate"));
    }
}
