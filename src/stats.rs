// src/stats.rs
// Dashboard aggregates over one user's tracked problems.

use crate::models::{DifficultyBreakdown, Outcome, ProgressView, Stats};
use chrono::{DateTime, Utc};

/// Builds the dashboard numbers from every record a user has.
///
/// `views` may come in any order; `due_today` is re-sorted by due date.
/// An empty slice yields all-zero stats with an average confidence of `0.0`.
pub fn compute_stats(views: &[ProgressView], now: DateTime<Utc>) -> Stats {
    let mut due_today: Vec<ProgressView> = views
        .iter()
        .filter(|v| v.record.next_due <= now)
        .cloned()
        .collect();
    due_today.sort_by(|a, b| {
        a.record
            .next_due
            .cmp(&b.record.next_due)
            .then(a.record.id.cmp(&b.record.id))
    });

    let solved_problems = views
        .iter()
        .filter(|v| v.record.last_outcome == Some(Outcome::Solved))
        .count();

    let average_confidence = if views.is_empty() {
        0.0
    } else {
        let total: i64 = views.iter().map(|v| v.record.confidence).sum();
        total as f64 / views.len() as f64
    };

    let mut difficulty_breakdown = DifficultyBreakdown::default();
    for v in views {
        difficulty_breakdown.add(v.problem.difficulty);
    }

    Stats {
        total_due: due_today.len(),
        due_today,
        total_problems: views.len(),
        solved_problems,
        average_confidence,
        difficulty_breakdown,
    }
}
