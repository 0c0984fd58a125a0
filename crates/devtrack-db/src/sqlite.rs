//! SQLite engine — one file, four tables, rows as JSON objects.

use devtrack_core::error::{DevTrackError, Result};
use devtrack_core::types::{Record, Table};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, params, params_from_iter};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::schema::{self, ColumnKind};

/// Single connection to the DevTrack database file.
pub struct SqliteDb {
    conn: Mutex<Connection>,
    path: PathBuf,
    /// True when the file did not exist before open and nobody marked it seeded.
    is_new: AtomicBool,
}

impl SqliteDb {
    /// Open or create the database. `:memory:` opens a private in-memory database.
    pub fn open(path: &Path) -> Result<Self> {
        let in_memory = path.as_os_str() == ":memory:";
        let is_new = in_memory || !path.exists();
        if !in_memory {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| DevTrackError::Storage(format!("DB open error: {e}")))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(|e| DevTrackError::Storage(format!("DB pragma error: {e}")))?;

        let db = Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
            is_new: AtomicBool::new(is_new),
        };
        db.migrate()?;
        tracing::info!("✅ Database opened at {} (new: {is_new})", path.display());
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(&schema::create_statements())
            .map_err(|e| DevTrackError::Storage(format!("Migration error: {e}")))?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DevTrackError::Storage(format!("Lock: {e}")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_new(&self) -> bool {
        self.is_new.load(Ordering::Relaxed)
    }

    pub fn mark_initialized(&self) {
        self.is_new.store(false, Ordering::Relaxed);
    }

    pub fn get_all(&self, table: Table) -> Result<Vec<Record>> {
        let cols = schema::columns(table);
        let names: Vec<String> = cols.iter().map(|c| format!("\"{}\"", c.name)).collect();
        let sql = format!("SELECT {} FROM {}", names.join(", "), table.as_str());

        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| DevTrackError::Storage(format!("Query error: {e}")))?;
        let rows = stmt
            .query_map([], |row| {
                let mut record = Record::new();
                for (i, col) in cols.iter().enumerate() {
                    let raw: SqlValue = row.get(i)?;
                    if let Some(value) = to_json(raw, col.kind) {
                        record.insert(col.name.to_string(), value);
                    }
                }
                Ok(record)
            })
            .map_err(|e| DevTrackError::Storage(format!("Query error: {e}")))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| DevTrackError::Storage(format!("Row error: {e}")))
    }

    /// Insert or replace one row. Columns missing from `record` become NULL.
    pub fn put(&self, table: Table, record: &Record) -> Result<()> {
        let conn = self.lock()?;
        insert_row(&conn, table, record)
    }

    /// Upsert every row inside one transaction. Empty input is a no-op.
    pub fn bulk_put(&self, table: Table, records: &[Record]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| DevTrackError::Storage(format!("Transaction error: {e}")))?;
        for record in records {
            insert_row(&tx, table, record)?;
        }
        tx.commit()
            .map_err(|e| DevTrackError::Storage(format!("Commit error: {e}")))?;
        Ok(())
    }

    pub fn delete(&self, table: Table, id: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(&format!("DELETE FROM {} WHERE id = ?1", table.as_str()), params![id])
            .map_err(|e| DevTrackError::Storage(format!("Delete error: {e}")))?;
        Ok(())
    }

    pub fn clear_all(&self) -> Result<()> {
        let conn = self.lock()?;
        let sql: String = Table::ALL
            .iter()
            .map(|t| format!("DELETE FROM {};", t.as_str()))
            .collect();
        conn.execute_batch(&sql)
            .map_err(|e| DevTrackError::Storage(format!("Clear error: {e}")))?;
        Ok(())
    }

    /// Fold the WAL back into the main file so a plain file copy is complete.
    pub fn checkpoint(&self) -> Result<()> {
        let conn = self.lock()?;
        let busy: i64 = conn
            .query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |row| row.get(0))
            .map_err(|e| DevTrackError::Storage(format!("Checkpoint error: {e}")))?;
        if busy != 0 {
            return Err(DevTrackError::storage("Checkpoint blocked by another connection"));
        }
        Ok(())
    }
}

fn insert_row(conn: &Connection, table: Table, record: &Record) -> Result<()> {
    match record.get("id") {
        Some(Value::String(id)) if !id.is_empty() => {}
        _ => {
            return Err(DevTrackError::InvalidRecord(format!(
                "{table} row without a string id"
            )));
        }
    }

    let mut names = Vec::with_capacity(record.len());
    let mut values = Vec::with_capacity(record.len());
    for (key, value) in record {
        let col = schema::column(table, key).ok_or_else(|| {
            DevTrackError::InvalidRecord(format!("{table} has no column {key:?}"))
        })?;
        names.push(format!("\"{}\"", col.name));
        values.push(to_sql(value, col.kind));
    }

    let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
        table.as_str(),
        names.join(", "),
        placeholders.join(", ")
    );
    conn.execute(&sql, params_from_iter(values))
        .map_err(|e| DevTrackError::Storage(format!("Write error: {e}")))?;
    Ok(())
}

fn to_sql(value: &Value, kind: ColumnKind) -> SqlValue {
    match (value, kind) {
        (Value::Null, _) => SqlValue::Null,
        (Value::Bool(b), _) => SqlValue::Integer(i64::from(*b)),
        (Value::Number(n), ColumnKind::Real) => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        (Value::Number(n), ColumnKind::Bool) => SqlValue::Integer(i64::from(n.as_f64().unwrap_or(0.0) != 0.0)),
        (Value::Number(n), ColumnKind::Text) => SqlValue::Text(n.to_string()),
        (Value::String(s), _) => SqlValue::Text(s.clone()),
        (other, _) => SqlValue::Text(other.to_string()),
    }
}

/// NULL and unreadable values yield `None` and are left out of the record.
fn to_json(raw: SqlValue, kind: ColumnKind) -> Option<Value> {
    match (raw, kind) {
        (SqlValue::Null | SqlValue::Blob(_), _) => None,
        (SqlValue::Integer(i), ColumnKind::Bool) => Some(Value::Bool(i != 0)),
        (SqlValue::Integer(i), ColumnKind::Real) => serde_json::Number::from_f64(i as f64).map(Value::Number),
        (SqlValue::Integer(i), ColumnKind::Text) => Some(Value::String(i.to_string())),
        (SqlValue::Real(f), ColumnKind::Bool) => Some(Value::Bool(f != 0.0)),
        (SqlValue::Real(f), ColumnKind::Real) => serde_json::Number::from_f64(f).map(Value::Number),
        (SqlValue::Real(f), ColumnKind::Text) => Some(Value::String(f.to_string())),
        (SqlValue::Text(s), ColumnKind::Real) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
            }
        }
        (SqlValue::Text(s), ColumnKind::Bool) => Some(Value::Bool(matches!(s.trim(), "1" | "true"))),
        (SqlValue::Text(s), ColumnKind::Text) => Some(Value::String(s)),
    }
}
