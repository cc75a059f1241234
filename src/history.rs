//! Append-only log of container runs, kept in the same SQLite database as
//! the settings.

use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};

use crate::invoker::{ProcessResult, Processor, UpscaleRequest};

/// Which wrapper operation produced a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Upscale,
    Interpolate,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Upscale => "upscale",
            Operation::Interpolate => "interpolate",
        }
    }
}

/// One recorded run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Row id, `None` until stored.
    pub id: Option<i64>,
    /// UTC `YYYY-MM-DD HH:MM:SS`, filled in by the database.
    pub timestamp: Option<String>,
    pub operation: Operation,
    pub input: String,
    pub output: Option<String>,
    pub processor: Processor,
    pub scale: u32,
    pub success: bool,
    pub stderr: Option<String>,
}

impl RunRecord {
    /// Record for `request` as actually executed (interpolation already
    /// rewritten to RIFE at scale 1) and its result.
    pub fn new(operation: Operation, request: &UpscaleRequest, result: &ProcessResult) -> Self {
        Self {
            id: None,
            timestamp: None,
            operation,
            input: request.input.display().to_string(),
            output: result
                .output_path
                .as_ref()
                .map(|p| p.display().to_string()),
            processor: request.processor,
            scale: request.scale.get(),
            success: result.success,
            stderr: result.stderr.clone(),
        }
    }
}

/// SQLite-backed run history.
pub struct History {
    conn: Mutex<Connection>,
}

impl History {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("failed to open history database")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL DEFAULT (datetime('now')),
                record TEXT NOT NULL
            );",
        )
        .context("failed to create runs table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("history connection poisoned"))
    }

    /// Append a run. Returns its row id.
    pub fn record(&self, run: &RunRecord) -> Result<i64> {
        let json = serde_json::to_string(run)?;
        let conn = self.lock()?;
        conn.execute("INSERT INTO runs (record) VALUES (?1)", [&json])?;
        Ok(conn.last_insert_rowid())
    }

    /// The last `limit` runs, oldest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<RunRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, record FROM (
                SELECT id, timestamp, record FROM runs ORDER BY id DESC LIMIT ?1
            ) ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, timestamp, json)| {
                let mut run: RunRecord = serde_json::from_str(&json)
                    .with_context(|| format!("corrupt history row {id}"))?;
                run.id = Some(id);
                run.timestamp = Some(timestamp);
                Ok(run)
            })
            .collect()
    }

    /// Delete every recorded run.
    pub fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM runs", [])?;
        Ok(())
    }
}
