use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

use crate::error::StoreError;

/// One persisted judgment, keyed by citation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseRecord {
    pub citation: String,
    pub case_name: Option<String>,
    pub plaintiff_name: Option<String>,
    pub defendant_name: Option<String>,
    pub judge_name: Option<String>,
    pub decision_date: Option<String>,
    pub area_of_law: Option<String>,
    pub outcome: Option<String>,
    pub plaintiff_counsel: Option<String>,
    pub defendant_counsel: Option<String>,
    pub raw_judgment_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub value: Option<String>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentCase {
    pub citation: String,
    pub case_name: Option<String>,
    pub decision_date: Option<String>,
}

/// SQLite-backed case store. The connection sits behind a mutex so one store
/// can be shared by every pipeline task; each call holds the lock for a single
/// statement.
pub struct CaseStore {
    conn: Mutex<Connection>,
}

impl CaseStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    pub fn exists(&self, citation: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM court_cases WHERE citation = ?1",
                [citation],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Insert, or overwrite every derived field of the existing row.
    /// `created_at` is refreshed on each write.
    pub fn upsert(&self, record: &CaseRecord) -> Result<(), StoreError> {
        let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO court_cases
             (citation, case_name, plaintiff_name, defendant_name, judge_name, decision_date,
              area_of_law, outcome, plaintiff_counsel, defendant_counsel, raw_judgment_text,
              created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(citation) DO UPDATE SET
                case_name = excluded.case_name,
                plaintiff_name = excluded.plaintiff_name,
                defendant_name = excluded.defendant_name,
                judge_name = excluded.judge_name,
                decision_date = excluded.decision_date,
                area_of_law = excluded.area_of_law,
                outcome = excluded.outcome,
                plaintiff_counsel = excluded.plaintiff_counsel,
                defendant_counsel = excluded.defendant_counsel,
                raw_judgment_text = excluded.raw_judgment_text,
                created_at = excluded.created_at",
            rusqlite::params![
                record.citation,
                record.case_name,
                record.plaintiff_name,
                record.defendant_name,
                record.judge_name,
                record.decision_date,
                record.area_of_law,
                record.outcome,
                record.plaintiff_counsel,
                record.defendant_counsel,
                record.raw_judgment_text,
                now,
            ],
        )?;
        Ok(())
    }

    pub fn fetch_case(&self, citation: &str) -> Result<Option<CaseRecord>, StoreError> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                "SELECT citation, case_name, plaintiff_name, defendant_name, judge_name,
                        decision_date, area_of_law, outcome, plaintiff_counsel,
                        defendant_counsel, raw_judgment_text
                 FROM court_cases WHERE citation = ?1",
                [citation],
                |row| {
                    Ok(CaseRecord {
                        citation: row.get(0)?,
                        case_name: row.get(1)?,
                        plaintiff_name: row.get(2)?,
                        defendant_name: row.get(3)?,
                        judge_name: row.get(4)?,
                        decision_date: row.get(5)?,
                        area_of_law: row.get(6)?,
                        outcome: row.get(7)?,
                        plaintiff_counsel: row.get(8)?,
                        defendant_counsel: row.get(9)?,
                        raw_judgment_text: row.get(10)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    // ── Summary queries ──

    pub fn count_cases(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let total = conn.query_row("SELECT COUNT(*) FROM court_cases", [], |r| r.get(0))?;
        Ok(total)
    }

    pub fn outcome_counts(&self) -> Result<Vec<GroupCount>, StoreError> {
        self.group_counts("outcome")
    }

    pub fn area_counts(&self) -> Result<Vec<GroupCount>, StoreError> {
        self.group_counts("area_of_law")
    }

    fn group_counts(&self, column: &str) -> Result<Vec<GroupCount>, StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {col}, COUNT(*) AS n FROM court_cases GROUP BY {col} ORDER BY n DESC, {col}",
            col = column
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(GroupCount {
                    value: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Newest decisions first. Dates are free text, so ordering is lexical.
    pub fn recent_cases(&self, limit: usize) -> Result<Vec<RecentCase>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT citation, case_name, decision_date
             FROM court_cases
             ORDER BY decision_date DESC
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map([limit as i64], |row| {
                Ok(RecentCase {
                    citation: row.get(0)?,
                    case_name: row.get(1)?,
                    decision_date: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS court_cases (
            citation          TEXT PRIMARY KEY,
            case_name         TEXT,
            plaintiff_name    TEXT,
            defendant_name    TEXT,
            judge_name        TEXT,
            decision_date     TEXT,
            area_of_law       TEXT,
            outcome           TEXT,
            plaintiff_counsel TEXT,
            defendant_counsel TEXT,
            raw_judgment_text TEXT NOT NULL,
            created_at        TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
        CREATE INDEX IF NOT EXISTS idx_cases_decision_date ON court_cases(decision_date);
        ",
    )?;
    Ok(())
}

// ── Tests ──
