// src/service.rs

use crate::constants::CONFIDENCE_BASELINE;
use crate::error::{Result, SchedulerError};
use crate::models::{
    AttemptEntry, Outcome, Problem, ProblemFilter, ProgressFilter, ProgressRecord, ProgressView,
    Stats,
};
use crate::repository;
use crate::scheduler;
use crate::stats;
use chrono::{DateTime, Timelike, Utc};
use log::{debug, info};
use rusqlite::{Connection, Transaction, TransactionBehavior};

// The store keeps whole seconds; so does everything computed from `now`.
fn whole_seconds(now: DateTime<Utc>) -> DateTime<Utc> {
    now.with_nanosecond(0).unwrap_or(now)
}

// Takes the write lock up front so a concurrent writer on another
// connection cannot interleave between our read and our write.
fn begin_write(conn: &mut Connection) -> Result<Transaction<'_>> {
    Ok(conn.transaction_with_behavior(TransactionBehavior::Immediate)?)
}

// --- Mutations ---

/// Starts tracking a problem for a user. The new record is due immediately.
pub fn add_tracking(
    conn: &mut Connection,
    user_id: i64,
    problem_id: i64,
    now: DateTime<Utc>,
) -> Result<ProgressRecord> {
    let now = whole_seconds(now);
    let tx = begin_write(conn)?;

    if !repository::problem_exists(&tx, problem_id)? {
        return Err(SchedulerError::ProblemNotFound(problem_id));
    }
    if repository::find_record(&tx, user_id, problem_id)?.is_some() {
        return Err(SchedulerError::AlreadyTracked {
            user_id,
            problem_id,
        });
    }

    let id = repository::insert_record(
        &tx,
        user_id,
        problem_id,
        CONFIDENCE_BASELINE,
        scheduler::initial_due(now),
        now,
    )?;
    let record = reload(&tx, user_id, id)?;
    tx.commit()?;

    info!(
        "User {} now tracking problem {} (record {})",
        user_id, problem_id, record.id
    );
    Ok(record)
}

/// Applies an outcome to the record for `(user_id, problem_id)`.
pub fn record_outcome(
    conn: &mut Connection,
    user_id: i64,
    problem_id: i64,
    outcome: Outcome,
    now: DateTime<Utc>,
) -> Result<ProgressRecord> {
    let tx = begin_write(conn)?;
    let record = repository::find_record(&tx, user_id, problem_id)?.ok_or_else(|| {
        SchedulerError::NotFound {
            user_id,
            what: format!("problem {}", problem_id),
        }
    })?;
    let updated = apply_and_persist(&tx, record, outcome, whole_seconds(now))?;
    tx.commit()?;
    Ok(updated)
}

/// Applies an outcome to a record addressed by its id.
pub fn report_outcome(
    conn: &mut Connection,
    user_id: i64,
    record_id: i64,
    outcome: Outcome,
    now: DateTime<Utc>,
) -> Result<ProgressRecord> {
    let tx = begin_write(conn)?;
    let record = repository::get_record(&tx, user_id, record_id)?.ok_or_else(|| {
        SchedulerError::NotFound {
            user_id,
            what: format!("record {}", record_id),
        }
    })?;
    let updated = apply_and_persist(&tx, record, outcome, whole_seconds(now))?;
    tx.commit()?;
    Ok(updated)
}

fn apply_and_persist(
    conn: &Connection,
    mut record: ProgressRecord,
    outcome: Outcome,
    now: DateTime<Utc>,
) -> Result<ProgressRecord> {
    debug!(
        "[Outcome Input] Record {}: {} at confidence {} ({} attempts)",
        record.id, outcome, record.confidence, record.attempts_count
    );

    let old_confidence = record.confidence;
    let update = scheduler::apply_outcome(&record, outcome);
    let interval = scheduler::interval_days(update.confidence, outcome);

    record.confidence = update.confidence;
    record.attempts_count = update.attempts_count;
    record.interval_days = interval;
    record.next_due = scheduler::next_due(update.confidence, outcome, now);
    record.last_outcome = Some(outcome);
    record.last_attempted = Some(now);
    record.updated_at = now;
    if outcome == Outcome::Solved {
        record.solved_count += 1;
    }

    repository::save_record(conn, &record)?;
    repository::log_attempt(
        conn,
        record.id,
        outcome,
        old_confidence,
        record.confidence,
        interval,
        now,
    )?;

    info!(
        "[Outcome Result] Record {}: Confidence {} -> {}, Interval {}d, Attempts {}",
        record.id, old_confidence, record.confidence, interval, record.attempts_count
    );

    reload(conn, record.user_id, record.id)
}

fn reload(conn: &Connection, user_id: i64, record_id: i64) -> Result<ProgressRecord> {
    repository::get_record(conn, user_id, record_id)?.ok_or_else(|| {
        SchedulerError::StoreUnavailable(format!("record {} vanished mid-transaction", record_id))
    })
}

// --- Reads ---

pub fn list_problems(conn: &Connection, filter: &ProblemFilter) -> Result<Vec<Problem>> {
    Ok(repository::list_problems(conn, filter)?)
}

pub fn list_user_progress(
    conn: &Connection,
    user_id: i64,
    filter: &ProgressFilter,
    now: DateTime<Utc>,
) -> Result<Vec<ProgressView>> {
    Ok(repository::list_progress(conn, user_id, filter, now)?)
}

/// Everything due at or before `now`, most overdue first.
pub fn list_due_today(
    conn: &Connection,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<Vec<ProgressView>> {
    let filter = ProgressFilter {
        due_today: true,
        ..ProgressFilter::default()
    };
    list_user_progress(conn, user_id, &filter, now)
}

pub fn list_attempts(conn: &Connection, user_id: i64, record_id: i64) -> Result<Vec<AttemptEntry>> {
    if repository::get_record(conn, user_id, record_id)?.is_none() {
        return Err(SchedulerError::NotFound {
            user_id,
            what: format!("record {}", record_id),
        });
    }
    Ok(repository::get_attempts(conn, record_id)?)
}

pub fn get_stats(conn: &Connection, user_id: i64, now: DateTime<Utc>) -> Result<Stats> {
    let views = repository::list_progress(conn, user_id, &ProgressFilter::default(), now)?;
    Ok(stats::compute_stats(&views, now))
}
