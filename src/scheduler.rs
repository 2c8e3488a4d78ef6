// src/scheduler.rs
// Confidence tracking and due-date policy. Pure: no storage, no clock.

use crate::constants::*;
use crate::models::{Outcome, ProgressRecord};
use chrono::{DateTime, Duration, Utc};
use log::debug;

/// Result of applying one outcome to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfidenceUpdate {
    pub confidence: i64,
    pub attempts_count: i64,
}

/// Applies a reported outcome to a record's confidence and attempt count.
///
/// Every report counts as an attempt. Confidence is clamped to `[0, 100]`.
pub fn apply_outcome(record: &ProgressRecord, outcome: Outcome) -> ConfidenceUpdate {
    let delta = match outcome {
        Outcome::Solved => CONFIDENCE_DELTA_SOLVED,
        Outcome::Struggling => CONFIDENCE_DELTA_STRUGGLING,
    };

    ConfidenceUpdate {
        confidence: (record.confidence + delta).clamp(CONFIDENCE_MIN, CONFIDENCE_MAX),
        attempts_count: record.attempts_count + 1,
    }
}

/// Review interval in days for a post-update confidence and outcome.
pub fn interval_days(confidence: i64, outcome: Outcome) -> i64 {
    if outcome == Outcome::Struggling {
        return INTERVAL_STRUGGLING;
    }

    match confidence {
        c if c >= BAND_HIGH_FLOOR => INTERVAL_HIGH,
        c if c >= BAND_MID_FLOOR => INTERVAL_MID,
        c if c >= BAND_LOW_FLOOR => INTERVAL_LOW,
        _ => INTERVAL_WEAK,
    }
}

/// Next review timestamp for a post-update confidence and outcome.
pub fn next_due(confidence: i64, outcome: Outcome, now: DateTime<Utc>) -> DateTime<Utc> {
    let days = interval_days(confidence, outcome);
    debug!(
        "[Schedule] confidence {} + {} -> {} day(s)",
        confidence, outcome, days
    );
    now + Duration::seconds(days * DAY_SECONDS)
}

/// Due date of a freshly tracked problem: immediately eligible.
pub fn initial_due(now: DateTime<Utc>) -> DateTime<Utc> {
    now
}
