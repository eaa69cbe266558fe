use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{GleanerError, Result};

/// How a recorded run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    TargetMet,
    Stagnant,
    EngineFault,
    /// The run produced nothing (navigation failure, browser launch failure).
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::TargetMet => "target_met",
            RunStatus::Stagnant => "stagnant",
            RunStatus::EngineFault => "engine_fault",
            RunStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "target_met" => Some(RunStatus::TargetMet),
            "stagnant" => Some(RunStatus::Stagnant),
            "engine_fault" => Some(RunStatus::EngineFault),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub target_kind: String,
    pub target: String,
    pub label: String,
    pub requested: usize,
    pub collected: usize,
    pub status: RunStatus,
    pub output_path: Option<String>,
    pub checkpoint_path: Option<String>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub trait RunLog {
    fn record_run(&self, run: &RunRecord) -> Result<i64>;
    fn recent_runs(&self, limit: usize) -> Result<Vec<RunRecord>>;
    fn last_run_for(&self, target: &str) -> Result<Option<RunRecord>>;
}

pub struct SqliteRunLog {
    conn: Mutex<Connection>,
}

const RUN_COLUMNS: &str = "id, target_kind, target, label, requested, collected, status, \
     output_path, checkpoint_path, error, started_at, finished_at";

impl SqliteRunLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let log = Self {
            conn: Mutex::new(conn),
        };
        log.run_migrations()?;
        Ok(log)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let log = Self {
            conn: Mutex::new(conn),
        };
        log.run_migrations()?;
        Ok(log)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| GleanerError::Other(format!("run log lock poisoned: {}", e)))
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| GleanerError::Other(format!("run log migration failed: {}", e)))?;

        Ok(())
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }

    fn row_to_run(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
        let status: String = row.get(6)?;
        Ok(RunRecord {
            id: row.get(0)?,
            target_kind: row.get(1)?,
            target: row.get(2)?,
            label: row.get(3)?,
            requested: row.get::<_, i64>(4)?.max(0) as usize,
            collected: row.get::<_, i64>(5)?.max(0) as usize,
            status: RunStatus::parse(&status).unwrap_or(RunStatus::Failed),
            output_path: row.get(7)?,
            checkpoint_path: row.get(8)?,
            error: row.get(9)?,
            started_at: Self::parse_datetime(&row.get::<_, String>(10)?).unwrap_or_else(Utc::now),
            finished_at: Self::parse_datetime(&row.get::<_, String>(11)?).unwrap_or_else(Utc::now),
        })
    }
}

impl RunLog for SqliteRunLog {
    fn record_run(&self, run: &RunRecord) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO runs (target_kind, target, label, requested, collected, status,
                               output_path, checkpoint_path, error, started_at, finished_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                run.target_kind,
                run.target,
                run.label,
                run.requested as i64,
                run.collected as i64,
                run.status.as_str(),
                run.output_path,
                run.checkpoint_path,
                run.error,
                run.started_at.to_rfc3339(),
                run.finished_at.to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn recent_runs(&self, limit: usize) -> Result<Vec<RunRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RUN_COLUMNS} FROM runs ORDER BY started_at DESC, id DESC LIMIT ?1"
        ))?;
        let runs = stmt
            .query_map(params![limit as i64], Self::row_to_run)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(runs)
    }

    fn last_run_for(&self, target: &str) -> Result<Option<RunRecord>> {
        let conn = self.conn()?;
        let run = conn
            .query_row(
                &format!(
                    "SELECT {RUN_COLUMNS} FROM runs WHERE target = ?1
                     ORDER BY started_at DESC, id DESC LIMIT 1"
                ),
                params![target],
                Self::row_to_run,
            )
            .optional()?;
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn run(target: &str, status: RunStatus, minutes_ago: i64) -> RunRecord {
        let started_at = Utc::now() - Duration::minutes(minutes_ago);
        RunRecord {
            id: 0,
            target_kind: "keyword".into(),
            target: target.into(),
            label: target.into(),
            requested: 100,
            collected: if status == RunStatus::TargetMet { 100 } else { 40 },
            status,
            output_path: Some(format!("{target}_100_reviews.csv")),
            checkpoint_path: None,
            error: None,
            started_at,
            finished_at: started_at + Duration::seconds(30),
        }
    }

    #[test]
    fn test_record_and_list_recent_runs() {
        let log = SqliteRunLog::in_memory().unwrap();
        log.record_run(&run("망원한강공원", RunStatus::Stagnant, 10)).unwrap();
        log.record_run(&run("잠실한강공원", RunStatus::TargetMet, 5)).unwrap();

        let runs = log.recent_runs(10).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].target, "잠실한강공원");
        assert_eq!(runs[0].status, RunStatus::TargetMet);
        assert_eq!(runs[1].collected, 40);

        assert_eq!(log.recent_runs(1).unwrap().len(), 1);
    }

    #[test]
    fn test_last_run_for_target() {
        let log = SqliteRunLog::in_memory().unwrap();
        log.record_run(&run("난지한강공원", RunStatus::EngineFault, 60)).unwrap();
        log.record_run(&run("난지한강공원", RunStatus::TargetMet, 1)).unwrap();
        log.record_run(&run("이촌한강공원", RunStatus::Failed, 2)).unwrap();

        let last = log.last_run_for("난지한강공원").unwrap().unwrap();
        assert_eq!(last.status, RunStatus::TargetMet);
        assert!(log.last_run_for("광나루한강공원").unwrap().is_none());
    }

    #[test]
    fn test_status_round_trip_names() {
        for status in [
            RunStatus::TargetMet,
            RunStatus::Stagnant,
            RunStatus::EngineFault,
            RunStatus::Failed,
        ] {
            assert_eq!(RunStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RunStatus::parse("unknown"), None);
    }

    #[test]
    fn test_file_backed_log_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.db");
        {
            let log = SqliteRunLog::new(&path).unwrap();
            log.record_run(&run("여의도한강공원", RunStatus::TargetMet, 0)).unwrap();
        }
        let log = SqliteRunLog::new(&path).unwrap();
        assert_eq!(log.recent_runs(5).unwrap().len(), 1);
    }
}
