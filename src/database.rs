// src/database.rs

use crate::models::{Difficulty, JsonProblem};
use log::{debug, info, warn};
use rusqlite::{params, Connection, Result};
use std::path::Path;
use std::time::Duration;

// How long a writer waits on another connection's lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens the database file and applies connection settings.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    Ok(conn)
}

/// In-memory database, mostly for tests and throwaway runs.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    Ok(conn)
}

fn configure(conn: &Connection) -> Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(())
}

pub fn init_db(conn: &Connection, seed: bool) -> Result<()> {
    debug!("init_db: Checking database schema...");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS problems (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            url TEXT NOT NULL,
            difficulty TEXT NOT NULL CHECK (difficulty IN ('Easy','Medium','Hard'))
        );
        CREATE TABLE IF NOT EXISTS problem_tags (
            problem_id INTEGER NOT NULL REFERENCES problems(id),
            tag TEXT NOT NULL,
            PRIMARY KEY (problem_id, tag)
        );
        CREATE TABLE IF NOT EXISTS progress (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            problem_id INTEGER NOT NULL REFERENCES problems(id),
            confidence INTEGER NOT NULL CHECK (confidence BETWEEN 0 AND 100),
            attempts_count INTEGER NOT NULL DEFAULT 0,
            solved_count INTEGER NOT NULL DEFAULT 0,
            interval_days INTEGER NOT NULL DEFAULT 0,
            next_due_ts INTEGER NOT NULL,
            last_outcome TEXT CHECK (last_outcome IN ('Solved','Struggling')),
            last_attempted_ts INTEGER,
            created_ts INTEGER NOT NULL,
            updated_ts INTEGER NOT NULL,
            UNIQUE (user_id, problem_id)
        );
        CREATE INDEX IF NOT EXISTS idx_progress_user_due ON progress (user_id, next_due_ts);
        CREATE TABLE IF NOT EXISTS attempts (
            id INTEGER PRIMARY KEY,
            record_id INTEGER NOT NULL REFERENCES progress(id),
            outcome TEXT NOT NULL,
            confidence_before INTEGER NOT NULL,
            confidence_after INTEGER NOT NULL,
            interval_days INTEGER NOT NULL,
            timestamp INTEGER NOT NULL
        );
        ",
    )?;

    if !seed {
        return Ok(());
    }

    let count: i64 = conn.query_row("SELECT count(*) FROM problems", [], |row| row.get(0))?;
    if count == 0 {
        info!("init_db: Catalog empty. Seeding problems...");
        seed_data(conn)?;
    }

    Ok(())
}

/// Returns the number of problems actually inserted.
fn seed_data(conn: &Connection) -> Result<usize> {
    let data = include_str!("data/problems.json");
    let problems: Vec<JsonProblem> = serde_json::from_str(data)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(e.into()))?;

    let mut inserted = 0;
    let tx = conn.unchecked_transaction()?;
    {
        let mut p_stmt = tx.prepare(
            "INSERT OR IGNORE INTO problems (id, title, url, difficulty) VALUES (?, ?, ?, ?)",
        )?;
        let mut t_stmt =
            tx.prepare("INSERT OR IGNORE INTO problem_tags (problem_id, tag) VALUES (?, ?)")?;

        for p in &problems {
            if p.difficulty.parse::<Difficulty>().is_err() {
                warn!("Skipping seed problem {} with difficulty '{}'", p.id, p.difficulty);
                continue;
            }
            inserted += p_stmt.execute(params![p.id, p.title, p.url, p.difficulty])?;
            for tag in &p.tags {
                t_stmt.execute(params![p.id, tag])?;
            }
        }
    }
    tx.commit()?;

    info!("Seeded {} problems", inserted);
    Ok(inserted)
}
