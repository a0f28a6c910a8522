use super::RecordStore;
use crate::error::{Result, RosterError};
use crate::model::{Record, RecordDraft, RecordId};
use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension, Row};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const CREATE_USERS: &str = "CREATE TABLE IF NOT EXISTS users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name  TEXT NOT NULL,
    last_name   TEXT NOT NULL,
    department  TEXT,
    major       TEXT,
    email       TEXT NOT NULL UNIQUE,
    imageURL    TEXT
)";

const SELECT_USERS: &str =
    "SELECT id, first_name, last_name, department, major, email, imageURL FROM users";

const INSERT_USER: &str =
    "INSERT INTO users (first_name, last_name, department, major, email, imageURL)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

/// Record store backed by a SQLite database file.
///
/// Every operation opens its own connection and drops it when done. Only
/// [`RecordStore::ensure_schema`] is allowed to create the database file;
/// the other operations report a missing database as a connectivity failure.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Connection::open_with_flags(&self.path, flags).map_err(|e| {
            RosterError::Connectivity(format!("{}: {}", self.path.display(), e))
        })
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<Record> {
    let draft = RecordDraft {
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        department: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        major: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        email: row.get(5)?,
        image_ref: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
    };
    Ok(draft.with_id(row.get(0)?))
}

/// Translates SQLite failures into the roster error taxonomy. `email` is the
/// key being written, if any, so unique violations can name it.
fn map_sql_error(err: rusqlite::Error, email: Option<&str>) -> RosterError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, message) => match failure.code {
            ErrorCode::ConstraintViolation
                if message.as_deref().is_some_and(|m| m.contains("users.email")) =>
            {
                RosterError::DuplicateEmail(email.unwrap_or_default().to_string())
            }
            ErrorCode::CannotOpen
            | ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked
            | ErrorCode::NotADatabase
            | ErrorCode::SystemIoFailure
            | ErrorCode::PermissionDenied
            | ErrorCode::ReadOnly
            | ErrorCode::DiskFull => RosterError::Connectivity(err.to_string()),
            _ => RosterError::Store(err.to_string()),
        },
        _ => RosterError::Store(err.to_string()),
    }
}

fn insert(conn: &Connection, draft: &RecordDraft) -> Result<RecordId> {
    conn.execute(
        INSERT_USER,
        params![
            draft.first_name,
            draft.last_name,
            draft.department,
            draft.major,
            draft.email,
            draft.image_ref,
        ],
    )
    .map_err(|e| map_sql_error(e, Some(&draft.email)))?;
    Ok(conn.last_insert_rowid())
}

impl RecordStore for SqliteStore {
    fn ensure_schema(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    RosterError::Setup(format!("{}: {}", parent.display(), e))
                })?;
            }
        }

        let conn = Connection::open(&self.path)
            .map_err(|e| RosterError::Setup(format!("{}: {}", self.path.display(), e)))?;
        conn.execute(CREATE_USERS, [])
            .map_err(|e| RosterError::Setup(e.to_string()))?;

        debug!(path = %self.path.display(), "users table ready");
        Ok(())
    }

    fn fetch_all(&self) -> Result<Vec<Record>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(SELECT_USERS)
            .map_err(|e| map_sql_error(e, None))?;
        let rows = stmt
            .query_map([], row_to_record)
            .map_err(|e| map_sql_error(e, None))?;

        let mut records = Vec::new();
        for record in rows {
            records.push(record.map_err(|e| map_sql_error(e, None))?);
        }
        debug!(count = records.len(), "fetched records");
        Ok(records)
    }

    fn create(&mut self, draft: &RecordDraft) -> Result<RecordId> {
        let conn = self.connect()?;
        let id = insert(&conn, draft)?;
        debug!(id, email = %draft.email, "inserted record");
        Ok(id)
    }

    fn create_batch(&mut self, drafts: &[RecordDraft]) -> Result<Vec<RecordId>> {
        let mut conn = self.connect()?;
        let tx = conn.transaction().map_err(|e| map_sql_error(e, None))?;

        let mut ids = Vec::with_capacity(drafts.len());
        for draft in drafts {
            // dropping the transaction on error rolls it back
            ids.push(insert(&tx, draft)?);
        }
        tx.commit().map_err(|e| map_sql_error(e, None))?;

        debug!(count = ids.len(), "inserted record batch");
        Ok(ids)
    }

    fn update(&mut self, id: RecordId, draft: &RecordDraft) -> Result<()> {
        let conn = self.connect()?;
        let changed = conn
            .execute(
                "UPDATE users SET first_name = ?1, last_name = ?2, department = ?3,
                 major = ?4, email = ?5, imageURL = ?6 WHERE id = ?7",
                params![
                    draft.first_name,
                    draft.last_name,
                    draft.department,
                    draft.major,
                    draft.email,
                    draft.image_ref,
                    id,
                ],
            )
            .map_err(|e| map_sql_error(e, Some(&draft.email)))?;
        debug!(id, changed, "updated record");
        Ok(())
    }

    fn delete(&mut self, id: RecordId) -> Result<()> {
        let conn = self.connect()?;
        let changed = conn
            .execute("DELETE FROM users WHERE id = ?1", params![id])
            .map_err(|e| map_sql_error(e, None))?;
        debug!(id, changed, "deleted record");
        Ok(())
    }

    fn find_id_by_email(&self, email: &str) -> Result<Option<RecordId>> {
        let conn = self.connect()?;
        conn.query_row(
            "SELECT id FROM users WHERE email = ?1",
            params![email],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| map_sql_error(e, None))
    }
}
