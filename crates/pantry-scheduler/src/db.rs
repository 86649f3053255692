use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;

/// Initialise the scheduler schema in `conn`.
///
/// One row per recurring job, holding only last/next run bookkeeping.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS alert_jobs (
            name            TEXT    NOT NULL PRIMARY KEY,
            schedule_hour   INTEGER NOT NULL,
            schedule_minute INTEGER NOT NULL,
            last_run        TEXT,               -- RFC 3339 UTC or NULL
            next_run        TEXT,               -- NULL while stopped
            last_outcome    TEXT,               -- JSON-encoded RunOutcome
            run_count       INTEGER NOT NULL DEFAULT 0,
            updated_at      TEXT    NOT NULL
        ) STRICT;
        ",
    )?;
    Ok(())
}

/// Persisted bookkeeping for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub last_outcome: Option<String>,
    pub run_count: u32,
}

fn parse_ts(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn load_job(conn: &Connection, name: &str) -> Result<Option<JobRecord>> {
    let row = conn
        .query_row(
            "SELECT last_run, next_run, last_outcome, run_count
             FROM alert_jobs WHERE name = ?1",
            [name],
            |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, u32>(3)?,
                ))
            },
        )
        .optional()?;
    Ok(row.map(|(last_run, next_run, last_outcome, run_count)| JobRecord {
        last_run: parse_ts(last_run),
        next_run: parse_ts(next_run),
        last_outcome,
        run_count,
    }))
}

/// Create or refresh the job row with a new `next_run` (NULL when stopped).
pub fn register_job(
    conn: &Connection,
    name: &str,
    hour: u8,
    minute: u8,
    next_run: Option<DateTime<Utc>>,
) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO alert_jobs (name, schedule_hour, schedule_minute, next_run, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(name) DO UPDATE SET
            schedule_hour = excluded.schedule_hour,
            schedule_minute = excluded.schedule_minute,
            next_run = excluded.next_run,
            updated_at = excluded.updated_at",
        params![name, hour, minute, next_run.map(|d| d.to_rfc3339()), now],
    )?;
    Ok(())
}

/// Record a finished run. `counted` bumps `run_count`.
///
/// Creates the job row when the job was never registered, so runs
/// triggered outside the daily loop are still kept.
pub fn record_run(
    conn: &Connection,
    name: &str,
    hour: u8,
    minute: u8,
    last_run: DateTime<Utc>,
    outcome_json: &str,
    counted: bool,
) -> Result<()> {
    conn.execute(
        "INSERT INTO alert_jobs
            (name, schedule_hour, schedule_minute, last_run, last_outcome, run_count, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(name) DO UPDATE SET
            last_run = excluded.last_run,
            last_outcome = excluded.last_outcome,
            run_count = run_count + excluded.run_count,
            updated_at = excluded.updated_at",
        params![
            name,
            hour,
            minute,
            last_run.to_rfc3339(),
            outcome_json,
            counted as i64,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}
