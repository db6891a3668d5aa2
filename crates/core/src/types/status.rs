//! Lifecycle status of marketing rules.
//!
//! Status is never stored. It is derived from the current time, the admin
//! override, and the rule's schedule window every time it is read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Derived lifecycle status of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleStatus {
    /// The window has not started yet.
    Scheduled,
    /// The rule is live.
    Active,
    /// The window has passed, is inverted, or an admin switched the rule off.
    Expired,
}

impl RuleStatus {
    /// Derive the status of a rule at `now`.
    ///
    /// Precedence, first match wins:
    ///
    /// 1. override `Some(true)` is active
    /// 2. override `Some(false)` is expired
    /// 3. an end before the start is expired, whatever `now` is
    /// 4. before the start is scheduled
    /// 5. no end, or not past the end (inclusive), is active
    /// 6. anything else is expired
    #[must_use]
    pub fn derive(
        now: DateTime<Utc>,
        active_override: Option<bool>,
        start_at: DateTime<Utc>,
        end_at: Option<DateTime<Utc>>,
    ) -> Self {
        match active_override {
            Some(true) => return Self::Active,
            Some(false) => return Self::Expired,
            None => {}
        }

        if end_at.is_some_and(|end| end < start_at) {
            return Self::Expired;
        }

        if now < start_at {
            return Self::Scheduled;
        }

        match end_at {
            None => Self::Active,
            Some(end) if now <= end => Self::Active,
            Some(_) => Self::Expired,
        }
    }
}

impl std::fmt::Display for RuleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scheduled => write!(f, "scheduled"),
            Self::Active => write!(f, "active"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

impl std::str::FromStr for RuleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            _ => Err(format!("invalid rule status: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn t() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_open_ended_window() {
        let start = t();
        assert_eq!(
            RuleStatus::derive(start - Duration::seconds(1), None, start, None),
            RuleStatus::Scheduled
        );
        assert_eq!(
            RuleStatus::derive(start, None, start, None),
            RuleStatus::Active
        );
        assert_eq!(
            RuleStatus::derive(start + Duration::days(365), None, start, None),
            RuleStatus::Active
        );
    }

    #[test]
    fn test_end_is_inclusive() {
        let start = t();
        let end = start + Duration::hours(1);
        assert_eq!(
            RuleStatus::derive(end, None, start, Some(end)),
            RuleStatus::Active
        );
        assert_eq!(
            RuleStatus::derive(end + Duration::seconds(1), None, start, Some(end)),
            RuleStatus::Expired
        );
    }

    #[test]
    fn test_override_false_beats_schedule() {
        let start = t();
        assert_eq!(
            RuleStatus::derive(start - Duration::seconds(1), Some(false), start, None),
            RuleStatus::Expired
        );
    }

    #[test]
    fn test_override_true_beats_everything() {
        let start = t();
        let inverted_end = start - Duration::seconds(1);
        assert_eq!(
            RuleStatus::derive(start - Duration::days(1), Some(true), start, None),
            RuleStatus::Active
        );
        assert_eq!(
            RuleStatus::derive(start, Some(true), start, Some(inverted_end)),
            RuleStatus::Active
        );
    }

    #[test]
    fn test_inverted_window_is_always_expired() {
        let start = t();
        let end = start - Duration::seconds(1);
        for now in [
            start - Duration::days(30),
            end,
            start,
            start + Duration::days(30),
        ] {
            assert_eq!(
                RuleStatus::derive(now, None, start, Some(end)),
                RuleStatus::Expired,
                "now = {now}"
            );
        }
    }

    #[test]
    fn test_zero_length_window() {
        let start = t();
        assert_eq!(
            RuleStatus::derive(start, None, start, Some(start)),
            RuleStatus::Active
        );
    }

    #[test]
    fn test_display_round_trips() {
        for status in [RuleStatus::Scheduled, RuleStatus::Active, RuleStatus::Expired] {
            let parsed: RuleStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("paused".parse::<RuleStatus>().is_err());
    }
}
