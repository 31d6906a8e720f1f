use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::PathBuf;

use crate::models::{
    Application, ApplicationEvents, ChannelEvents, OutreachEvent, OutreachKind, ResponseEvent,
    ResponseKind,
};

/// Append-only event store. Records are written once and never updated or
/// deleted; everything downstream is recomputed from them on every query.
pub struct Store {
    conn: Connection,
    path: PathBuf,
}

impl Store {
    pub fn open() -> Result<Self> {
        let path = Self::default_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        Ok(Self { conn, path })
    }

    /// In-memory store, used by tests.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn default_path() -> Result<PathBuf> {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "asa") {
            Ok(proj_dirs.data_dir().join("asa.db"))
        } else {
            Ok(PathBuf::from("asa.db"))
        }
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS applications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                company TEXT NOT NULL,
                role TEXT NOT NULL,
                applied_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS outreach_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                application_id INTEGER NOT NULL REFERENCES applications(id),
                channel TEXT NOT NULL,
                kind TEXT NOT NULL DEFAULT 'initial' CHECK (kind IN ('initial', 'follow_up')),
                at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS response_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                application_id INTEGER NOT NULL REFERENCES applications(id),
                channel TEXT,
                kind TEXT NOT NULL CHECK (kind IN ('acknowledgement', 'rejection', 'interview', 'offer')),
                at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_outreach_app ON outreach_events(application_id);
            CREATE INDEX IF NOT EXISTS idx_outreach_channel ON outreach_events(channel);
            CREATE INDEX IF NOT EXISTS idx_responses_app ON response_events(application_id);
            CREATE INDEX IF NOT EXISTS idx_responses_channel ON response_events(channel);
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='applications'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(anyhow!("Store not initialized. Run 'asa init' first."));
        }
        Ok(())
    }

    // --- Write side (append-only) ---

    pub fn add_application(&self, company: &str, role: &str, applied_at: DateTime<Utc>) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO applications (company, role, applied_at) VALUES (?1, ?2, ?3)",
            params![company, role, applied_at.to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn add_outreach(
        &self,
        application_id: i64,
        channel: &str,
        kind: OutreachKind,
        at: DateTime<Utc>,
    ) -> Result<i64> {
        self.application_exists(application_id)?;
        self.conn.execute(
            "INSERT INTO outreach_events (application_id, channel, kind, at) VALUES (?1, ?2, ?3, ?4)",
            params![application_id, channel, kind.as_str(), at.to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn add_response(
        &self,
        application_id: i64,
        channel: Option<&str>,
        kind: ResponseKind,
        at: DateTime<Utc>,
    ) -> Result<i64> {
        self.application_exists(application_id)?;
        self.conn.execute(
            "INSERT INTO response_events (application_id, channel, kind, at) VALUES (?1, ?2, ?3, ?4)",
            params![application_id, channel, kind.as_str(), at.to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn application_exists(&self, id: i64) -> Result<()> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM applications WHERE id = ?1",
            [id],
            |row| row.get(0),
        )?;
        if count == 0 {
            return Err(crate::error::AnalysisError::UnknownApplication(id).into());
        }
        Ok(())
    }

    // --- Read side (consumed by the analysis core) ---

    pub fn list_application_ids(&self) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare("SELECT id FROM applications ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list application ids")
    }

    pub fn list_channels(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT channel FROM outreach_events ORDER BY channel",
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list channels")
    }

    pub fn get_application(&self, id: i64) -> Result<Option<Application>> {
        let result = self.conn.query_row(
            "SELECT id, company, role, applied_at FROM applications WHERE id = ?1",
            [id],
            Self::row_to_application,
        );
        match result {
            Ok(app) => Ok(Some(app)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Full event set for one application.
    pub fn get_events(&self, application_id: i64) -> Result<ApplicationEvents> {
        let application = self
            .get_application(application_id)?
            .ok_or(crate::error::AnalysisError::UnknownApplication(application_id))?;

        let mut stmt = self.conn.prepare(
            "SELECT id, application_id, channel, kind, at FROM outreach_events
             WHERE application_id = ?1 ORDER BY at",
        )?;
        let outreach = stmt
            .query_map([application_id], Self::row_to_outreach)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read outreach events")?;

        let mut stmt = self.conn.prepare(
            "SELECT id, application_id, channel, kind, at FROM response_events
             WHERE application_id = ?1 ORDER BY at",
        )?;
        let responses = stmt
            .query_map([application_id], Self::row_to_response)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read response events")?;

        Ok(ApplicationEvents {
            application,
            outreach,
            responses,
        })
    }

    /// Event set for one channel, across all applications.
    pub fn get_channel_events(&self, channel: &str) -> Result<ChannelEvents> {
        let mut stmt = self.conn.prepare(
            "SELECT id, application_id, channel, kind, at FROM outreach_events
             WHERE channel = ?1 ORDER BY at",
        )?;
        let outreach = stmt
            .query_map([channel], Self::row_to_outreach)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read outreach events")?;

        let mut stmt = self.conn.prepare(
            "SELECT id, application_id, channel, kind, at FROM response_events
             WHERE channel = ?1 ORDER BY at",
        )?;
        let responses = stmt
            .query_map([channel], Self::row_to_response)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read response events")?;

        if outreach.is_empty() && responses.is_empty() {
            return Err(crate::error::AnalysisError::UnknownChannel(channel.to_string()).into());
        }

        Ok(ChannelEvents {
            channel: channel.to_string(),
            outreach,
            responses,
        })
    }

    fn row_to_application(row: &rusqlite::Row) -> rusqlite::Result<Application> {
        Ok(Application {
            id: row.get(0)?,
            company: row.get(1)?,
            role: row.get(2)?,
            applied_at: parse_ts(row, 3)?,
        })
    }

    fn row_to_outreach(row: &rusqlite::Row) -> rusqlite::Result<OutreachEvent> {
        let kind: String = row.get(3)?;
        Ok(OutreachEvent {
            id: row.get(0)?,
            application_id: row.get(1)?,
            channel: row.get(2)?,
            kind: OutreachKind::parse(&kind).ok_or_else(|| invalid_column(3, &kind))?,
            at: parse_ts(row, 4)?,
        })
    }

    fn row_to_response(row: &rusqlite::Row) -> rusqlite::Result<ResponseEvent> {
        let kind: String = row.get(3)?;
        Ok(ResponseEvent {
            id: row.get(0)?,
            application_id: row.get(1)?,
            channel: row.get(2)?,
            kind: ResponseKind::parse(&kind).ok_or_else(|| invalid_column(3, &kind))?,
            at: parse_ts(row, 4)?,
        })
    }
}

fn parse_ts(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

fn invalid_column(idx: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        format!("unrecognized value: {value}").into(),
    )
}
