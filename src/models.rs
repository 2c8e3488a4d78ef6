// src/models.rs

use crate::error::SchedulerError;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

// --- App State ---

pub struct AppState {
    pub db: Mutex<Connection>,
}

impl AppState {
    pub fn new(conn: Connection) -> Self {
        AppState {
            db: Mutex::new(conn),
        }
    }
}

// --- Data Models ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy = 1,
    Medium = 2,
    Hard = 3,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = SchedulerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Easy" => Ok(Difficulty::Easy),
            "Medium" => Ok(Difficulty::Medium),
            "Hard" => Ok(Difficulty::Hard),
            other => Err(SchedulerError::InvalidRequest(format!(
                "unknown difficulty '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The learner's self-report after working a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Solved,
    Struggling,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Solved => "Solved",
            Outcome::Struggling => "Struggling",
        }
    }
}

impl FromStr for Outcome {
    type Err = SchedulerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Solved" => Ok(Outcome::Solved),
            "Struggling" => Ok(Outcome::Struggling),
            other => Err(SchedulerError::InvalidOutcome(other.to_string())),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog entry. Read-only once seeded.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Problem {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
}

/// Tracking state for one (user, problem) pairing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProgressRecord {
    pub id: i64,
    pub user_id: i64,
    pub problem_id: i64,
    pub confidence: i64,
    pub attempts_count: i64,
    pub solved_count: i64,
    pub interval_days: i64,
    pub next_due: DateTime<Utc>,
    pub last_outcome: Option<Outcome>,
    pub last_attempted: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A record paired with its problem, as handed to display layers.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ProgressView {
    #[serde(flatten)]
    pub record: ProgressRecord,
    pub problem: Problem,
    pub is_due: bool,
}

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DifficultyBreakdown {
    #[serde(rename = "Easy")]
    pub easy: usize,
    #[serde(rename = "Medium")]
    pub medium: usize,
    #[serde(rename = "Hard")]
    pub hard: usize,
}

impl DifficultyBreakdown {
    pub fn add(&mut self, difficulty: Difficulty) {
        match difficulty {
            Difficulty::Easy => self.easy += 1,
            Difficulty::Medium => self.medium += 1,
            Difficulty::Hard => self.hard += 1,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Stats {
    pub due_today: Vec<ProgressView>,
    pub total_due: usize,
    pub total_problems: usize,
    pub solved_problems: usize,
    pub average_confidence: f64,
    pub difficulty_breakdown: DifficultyBreakdown,
}

/// One row of the append-only outcome history.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AttemptEntry {
    pub id: i64,
    pub record_id: i64,
    pub outcome: Outcome,
    pub confidence_before: i64,
    pub confidence_after: i64,
    pub interval_days: i64,
    pub timestamp: DateTime<Utc>,
}

// --- Filters ---

#[derive(Debug, Clone, Default)]
pub struct ProblemFilter {
    pub difficulty: Option<Difficulty>,
    /// Matches when the problem carries any of these tags.
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProgressFilter {
    pub difficulty: Option<Difficulty>,
    pub tags: Vec<String>,
    pub min_confidence: Option<i64>,
    pub due_today: bool,
}

// Used for seeding
#[derive(Deserialize)]
pub struct JsonProblem {
    pub id: i64,
    pub title: String,
    pub difficulty: String,
    pub url: String,
    #[serde(default)]
    pub tags: Vec<String>,
}
