pub mod queries;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentMeta {
    pub id: String,
    pub user_id: i64,
    pub trip_id: i64,
    pub name: String,
    pub mime_type: String,
    pub size: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub meta: DocumentMeta,
    pub payload: Vec<u8>,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite DB: {}", path.display()))?;

        let database = Self { conn };
        database.init_schema()?;

        Ok(database)
    }

    pub fn init_schema(&self) -> Result<()> {
        queries::schema_statements()
            .iter()
            .try_for_each(|statement| {
                self.conn
                    .execute(statement, [])
                    .context("Failed to initialize schema")
                    .map(|_| ())
            })
    }

    pub fn insert_document(&self, document: &StoredDocument) -> Result<()> {
        let meta = &document.meta;
        self.conn
            .execute(
                "INSERT INTO documents (id, user_id, trip_id, name, mime_type, size, created_at, payload)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    meta.id,
                    meta.user_id,
                    meta.trip_id,
                    meta.name,
                    meta.mime_type,
                    meta.size,
                    meta.created_at,
                    document.payload
                ],
            )
            .context("Failed to insert document")?;

        Ok(())
    }

    pub fn document(&self, id: &str) -> Result<Option<StoredDocument>> {
        let sql = format!(
            "SELECT {}, payload FROM documents WHERE id = ?1",
            queries::DOCUMENT_META_COLUMNS
        );

        self.conn
            .query_row(&sql, params![id], |row| {
                Ok(StoredDocument {
                    meta: document_meta(row)?,
                    payload: row.get(7)?,
                })
            })
            .optional()
            .context("Failed to query document")
    }

    pub fn documents_for_user_trip(&self, user_id: i64, trip_id: i64) -> Result<Vec<DocumentMeta>> {
        let sql = format!(
            "SELECT {} FROM documents WHERE user_id = ?1 AND trip_id = ?2 ORDER BY created_at ASC",
            queries::DOCUMENT_META_COLUMNS
        );
        let mut statement = self.conn.prepare(&sql)?;

        let rows = statement
            .query_map(params![user_id, trip_id], document_meta)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query documents by user and trip")?;

        Ok(rows)
    }

    pub fn documents_for_trip(&self, trip_id: i64) -> Result<Vec<DocumentMeta>> {
        let sql = format!(
            "SELECT {} FROM documents WHERE trip_id = ?1 ORDER BY created_at ASC",
            queries::DOCUMENT_META_COLUMNS
        );
        let mut statement = self.conn.prepare(&sql)?;

        let rows = statement
            .query_map(params![trip_id], document_meta)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query documents by trip")?;

        Ok(rows)
    }

    /// Returns whether a row was removed.
    pub fn delete_document(&self, id: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM documents WHERE id = ?1", params![id])
            .context("Failed to delete document")?;

        Ok(deleted > 0)
    }

    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .with_context(|| format!("Failed to read stored value: {key}"))
    }

    pub fn kv_put(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO kv (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key)
                 DO UPDATE SET value=excluded.value, updated_at=excluded.updated_at",
                params![key, value, Utc::now().timestamp()],
            )
            .with_context(|| format!("Failed to store value: {key}"))?;

        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .with_context(|| format!("Failed to delete stored value: {key}"))?;

        Ok(())
    }
}

fn document_meta(row: &Row<'_>) -> rusqlite::Result<DocumentMeta> {
    Ok(DocumentMeta {
        id: row.get(0)?,
        user_id: row.get(1)?,
        trip_id: row.get(2)?,
        name: row.get(3)?,
        mime_type: row.get(4)?,
        size: row.get(5)?,
        created_at: row.get(6)?,
    })
}
