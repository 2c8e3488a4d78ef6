// src/repository.rs

use crate::models::{
    AttemptEntry, Difficulty, Outcome, Problem, ProblemFilter, ProgressFilter, ProgressRecord,
    ProgressView,
};
use chrono::{DateTime, Utc};
use log::debug;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Result, Row, ToSql};

// --- Column Conversions ---

impl ToSql for Outcome {
    fn to_sql(&self) -> Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Outcome {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for Difficulty {
    fn to_sql(&self) -> Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Difficulty {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

fn timestamp_at(row: &Row, idx: usize) -> Result<DateTime<Utc>> {
    let ts: i64 = row.get(idx)?;
    DateTime::from_timestamp(ts, 0).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, ts))
}

fn optional_timestamp_at(row: &Row, idx: usize) -> Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<i64>>(idx)? {
        Some(ts) => DateTime::from_timestamp(ts, 0)
            .map(Some)
            .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, ts)),
        None => Ok(None),
    }
}

const RECORD_COLUMNS: &str = "pr.id, pr.user_id, pr.problem_id, pr.confidence, pr.attempts_count,
     pr.solved_count, pr.interval_days, pr.next_due_ts, pr.last_outcome,
     pr.last_attempted_ts, pr.created_ts, pr.updated_ts";

// Number of columns in RECORD_COLUMNS; joined problem columns follow.
const RECORD_WIDTH: usize = 12;

fn record_from_row(row: &Row) -> Result<ProgressRecord> {
    Ok(ProgressRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        problem_id: row.get(2)?,
        confidence: row.get(3)?,
        attempts_count: row.get(4)?,
        solved_count: row.get(5)?,
        interval_days: row.get(6)?,
        next_due: timestamp_at(row, 7)?,
        last_outcome: row.get(8)?,
        last_attempted: optional_timestamp_at(row, 9)?,
        created_at: timestamp_at(row, 10)?,
        updated_at: timestamp_at(row, 11)?,
    })
}

// --- Catalog ---

pub fn get_tags_for_problem(conn: &Connection, problem_id: i64) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT tag FROM problem_tags WHERE problem_id = ? ORDER BY rowid")?;

    let tags = stmt
        .query_map([problem_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;

    Ok(tags)
}

pub fn get_problem(conn: &Connection, problem_id: i64) -> Result<Option<Problem>> {
    let result = conn
        .query_row(
            "SELECT id, title, url, difficulty FROM problems WHERE id = ?",
            [problem_id],
            |row| {
                Ok(Problem {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    url: row.get(2)?,
                    difficulty: row.get(3)?,
                    tags: Vec::new(), // Filled below
                })
            },
        )
        .optional()?;

    if let Some(mut p) = result {
        p.tags = get_tags_for_problem(conn, p.id)?;
        return Ok(Some(p));
    }
    Ok(None)
}

pub fn problem_exists(conn: &Connection, problem_id: i64) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM problems WHERE id = ?)",
        [problem_id],
        |r| r.get(0),
    )
}

fn tag_clause(tags: &[String]) -> String {
    let placeholders = tags.iter().map(|_| "?").collect::<Vec<_>>().join(",");
    format!(
        " AND EXISTS (SELECT 1 FROM problem_tags t WHERE t.problem_id = p.id AND t.tag IN ({}))",
        placeholders
    )
}

pub fn list_problems(conn: &Connection, filter: &ProblemFilter) -> Result<Vec<Problem>> {
    let mut sql = String::from("SELECT p.id, p.title, p.url, p.difficulty FROM problems p WHERE 1 = 1");
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(difficulty) = filter.difficulty {
        sql.push_str(" AND p.difficulty = ?");
        params.push(Box::new(difficulty));
    }
    if !filter.tags.is_empty() {
        sql.push_str(&tag_clause(&filter.tags));
        for tag in &filter.tags {
            params.push(Box::new(tag.clone()));
        }
    }
    sql.push_str(" ORDER BY p.id ASC");

    let mut stmt = conn.prepare(&sql)?;
    let mut problems = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok(Problem {
                id: row.get(0)?,
                title: row.get(1)?,
                url: row.get(2)?,
                difficulty: row.get(3)?,
                tags: Vec::new(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    // N+1 on tags; the catalog is ~100 rows.
    for p in problems.iter_mut() {
        p.tags = get_tags_for_problem(conn, p.id)?;
    }
    debug!("[DB] list_problems matched {} problems", problems.len());
    Ok(problems)
}

// --- Progress Records ---

pub fn find_record(
    conn: &Connection,
    user_id: i64,
    problem_id: i64,
) -> Result<Option<ProgressRecord>> {
    let sql = format!(
        "SELECT {} FROM progress pr WHERE pr.user_id = ? AND pr.problem_id = ?",
        RECORD_COLUMNS
    );
    conn.query_row(&sql, params![user_id, problem_id], record_from_row)
        .optional()
}

/// Looks a record up by id, scoped to its owner.
pub fn get_record(conn: &Connection, user_id: i64, record_id: i64) -> Result<Option<ProgressRecord>> {
    let sql = format!(
        "SELECT {} FROM progress pr WHERE pr.id = ? AND pr.user_id = ?",
        RECORD_COLUMNS
    );
    conn.query_row(&sql, params![record_id, user_id], record_from_row)
        .optional()
}

/// Inserts a fresh record and returns its id.
pub fn insert_record(
    conn: &Connection,
    user_id: i64,
    problem_id: i64,
    confidence: i64,
    next_due: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO progress (user_id, problem_id, confidence, next_due_ts, created_ts, updated_ts)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            user_id,
            problem_id,
            confidence,
            next_due.timestamp(),
            now.timestamp(),
            now.timestamp()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Writes back every mutable field of a record.
pub fn save_record(conn: &Connection, record: &ProgressRecord) -> Result<()> {
    conn.execute(
        "UPDATE progress
         SET confidence = ?, attempts_count = ?, solved_count = ?, interval_days = ?,
             next_due_ts = ?, last_outcome = ?, last_attempted_ts = ?, updated_ts = ?
         WHERE id = ?",
        params![
            record.confidence,
            record.attempts_count,
            record.solved_count,
            record.interval_days,
            record.next_due.timestamp(),
            record.last_outcome,
            record.last_attempted.map(|t| t.timestamp()),
            record.updated_at.timestamp(),
            record.id
        ],
    )?;
    Ok(())
}

/// Records with their problems, filtered, earliest due first.
pub fn list_progress(
    conn: &Connection,
    user_id: i64,
    filter: &ProgressFilter,
    now: DateTime<Utc>,
) -> Result<Vec<ProgressView>> {
    let mut sql = format!(
        "SELECT {}, p.title, p.url, p.difficulty
         FROM progress pr
         JOIN problems p ON p.id = pr.problem_id
         WHERE pr.user_id = ?",
        RECORD_COLUMNS
    );
    let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(user_id)];

    if let Some(difficulty) = filter.difficulty {
        sql.push_str(" AND p.difficulty = ?");
        params.push(Box::new(difficulty));
    }
    if let Some(min) = filter.min_confidence {
        sql.push_str(" AND pr.confidence >= ?");
        params.push(Box::new(min));
    }
    if filter.due_today {
        sql.push_str(" AND pr.next_due_ts <= ?");
        params.push(Box::new(now.timestamp()));
    }
    if !filter.tags.is_empty() {
        sql.push_str(&tag_clause(&filter.tags));
        for tag in &filter.tags {
            params.push(Box::new(tag.clone()));
        }
    }
    sql.push_str(" ORDER BY pr.next_due_ts ASC, pr.id ASC");

    let mut stmt = conn.prepare(&sql)?;
    let mut views = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            let record = record_from_row(row)?;
            let problem = Problem {
                id: record.problem_id,
                title: row.get(RECORD_WIDTH)?,
                url: row.get(RECORD_WIDTH + 1)?,
                difficulty: row.get(RECORD_WIDTH + 2)?,
                tags: Vec::new(),
            };
            let is_due = record.next_due <= now;
            Ok(ProgressView {
                record,
                problem,
                is_due,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    for v in views.iter_mut() {
        v.problem.tags = get_tags_for_problem(conn, v.problem.id)?;
    }
    debug!(
        "[DB] list_progress for user {} matched {} records",
        user_id,
        views.len()
    );
    Ok(views)
}

// --- Attempt History ---

pub fn log_attempt(
    conn: &Connection,
    record_id: i64,
    outcome: Outcome,
    confidence_before: i64,
    confidence_after: i64,
    interval_days: i64,
    timestamp: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO attempts (record_id, outcome, confidence_before, confidence_after, interval_days, timestamp)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            record_id,
            outcome,
            confidence_before,
            confidence_after,
            interval_days,
            timestamp.timestamp()
        ],
    )?;
    Ok(())
}

/// Newest first.
pub fn get_attempts(conn: &Connection, record_id: i64) -> Result<Vec<AttemptEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, record_id, outcome, confidence_before, confidence_after, interval_days, timestamp
         FROM attempts
         WHERE record_id = ?
         ORDER BY timestamp DESC, id DESC",
    )?;

    let attempts = stmt
        .query_map([record_id], |row| {
            Ok(AttemptEntry {
                id: row.get(0)?,
                record_id: row.get(1)?,
                outcome: row.get(2)?,
                confidence_before: row.get(3)?,
                confidence_after: row.get(4)?,
                interval_days: row.get(5)?,
                timestamp: timestamp_at(row, 6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(attempts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database;
    use chrono::TimeZone;

    fn setup() -> Connection {
        let conn = database::open_in_memory().unwrap();
        database::init_db(&conn, true).unwrap();
        conn
    }

    #[test]
    fn problem_lookup_includes_tags() {
        let conn = setup();
        let p = get_problem(&conn, 1).unwrap().unwrap();
        assert_eq!(p.title, "Two Sum");
        assert_eq!(p.difficulty, Difficulty::Easy);
        assert!(p.tags.contains(&"Hash Table".to_string()));
        assert!(get_problem(&conn, 9999).unwrap().is_none());
    }

    #[test]
    fn problem_filter_matches_any_tag() {
        let conn = setup();
        let filter = ProblemFilter {
            difficulty: Some(Difficulty::Hard),
            tags: vec!["Linked List".to_string(), "Matrix".to_string()],
        };
        let problems = list_problems(&conn, &filter).unwrap();
        assert!(!problems.is_empty());
        for p in &problems {
            assert_eq!(p.difficulty, Difficulty::Hard);
            assert!(p.tags.iter().any(|t| t == "Linked List" || t == "Matrix"));
        }
        // Sorted by id
        assert!(problems.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn record_roundtrips_through_the_table() {
        let conn = setup();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let id = insert_record(&conn, 7, 1, 0, now, now).unwrap();

        let mut record = get_record(&conn, 7, id).unwrap().unwrap();
        assert_eq!(record.next_due, now);
        assert_eq!(record.last_outcome, None);
        assert_eq!(record.last_attempted, None);

        record.confidence = 20;
        record.attempts_count = 1;
        record.last_outcome = Some(Outcome::Solved);
        record.last_attempted = Some(now);
        save_record(&conn, &record).unwrap();

        assert_eq!(find_record(&conn, 7, 1).unwrap().unwrap(), record);
        // Scoped to owner
        assert!(get_record(&conn, 8, id).unwrap().is_none());
    }
}
