use crate::app_dirs::AppDirs;
use crate::level::Level;
use crate::scoring::ScoreSummary;
use chrono::Local;
use rusqlite::{params, Connection, OptionalExtension, Result};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Local mirror of quiz attempts per (tier, level). The backend remains
/// the source of truth for progression; this keeps the results screen
/// useful when offline.
#[derive(Debug)]
pub struct ScoreDb {
    conn: Connection,
}

impl ScoreDb {
    pub fn new() -> Result<Self> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("signik_scores.db"));
        Self::open_at(&db_path)
    }

    pub fn open_at(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }

        let conn = Connection::open(db_path)?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS attempts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tier TEXT NOT NULL,
                level INTEGER NOT NULL,
                correct INTEGER NOT NULL,
                total INTEGER NOT NULL,
                percent INTEGER NOT NULL,
                timestamp TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_attempts_level ON attempts(tier, level)",
            [],
        )?;

        Ok(ScoreDb { conn })
    }

    pub fn record_attempt(&self, level: Level, summary: &ScoreSummary) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO attempts (tier, level, correct, total, percent, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                level.tier.to_string(),
                level.number,
                summary.correct,
                summary.total,
                summary.percent,
                Local::now().to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    /// Best locally recorded percentage for a level, if any attempt exists.
    pub fn highest_percent(&self, level: Level) -> Result<Option<u32>> {
        self.conn
            .query_row(
                "SELECT MAX(percent) FROM attempts WHERE tier = ?1 AND level = ?2",
                params![level.tier.to_string(), level.number],
                |row| row.get::<_, Option<u32>>(0),
            )
            .optional()
            .map(|v| v.flatten())
    }

    pub fn attempt_count(&self, level: Level) -> Result<u32> {
        self.conn.query_row(
            "SELECT COUNT(*) FROM attempts WHERE tier = ?1 AND level = ?2",
            params![level.tier.to_string(), level.number],
            |row| row.get(0),
        )
    }

    /// Most recent attempt percentages for a level, newest first.
    pub fn recent_percents(&self, level: Level, limit: u32) -> Result<Vec<f64>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT percent FROM attempts
            WHERE tier = ?1 AND level = ?2
            ORDER BY id DESC
            LIMIT ?3
            "#,
        )?;

        let rows = stmt.query_map(
            params![level.tier.to_string(), level.number, limit],
            |row| row.get::<_, f64>(0),
        )?;

        rows.collect()
    }
}

/// Append one line per submitted quiz to a plain CSV log under the
/// config dir, emitting a header on first use.
pub fn append_attempt_log(level: Level, summary: &ScoreSummary) -> io::Result<()> {
    let Some(log_path) = AppDirs::log_path() else {
        return Ok(());
    };

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let needs_header = !log_path.exists();

    let mut log_file = OpenOptions::new()
        .write(true)
        .append(true)
        .create(true)
        .open(log_path)?;

    if needs_header {
        writeln!(log_file, "date,tier,level,correct,total,percent")?;
    }

    writeln!(
        log_file,
        "{},{},{},{},{},{}",
        Local::now().format("%c"),
        level.tier,
        level.number,
        summary.correct,
        summary.total,
        summary.percent,
    )?;

    Ok(())
}
