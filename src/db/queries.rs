pub const CREATE_DOCUMENTS: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
  id         TEXT PRIMARY KEY,
  user_id    INTEGER NOT NULL,
  trip_id    INTEGER NOT NULL,
  name       TEXT NOT NULL,
  mime_type  TEXT NOT NULL,
  size       INTEGER NOT NULL,
  created_at INTEGER NOT NULL,
  payload    BLOB NOT NULL
);
"#;

pub const CREATE_KV: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
  key        TEXT PRIMARY KEY,
  value      TEXT NOT NULL,
  updated_at INTEGER NOT NULL
);
"#;

pub const INDEX_DOCUMENTS_TRIP: &str =
    "CREATE INDEX IF NOT EXISTS idx_documents_trip ON documents(trip_id);";

pub const INDEX_DOCUMENTS_USER_TRIP: &str =
    "CREATE INDEX IF NOT EXISTS idx_documents_user_trip ON documents(user_id, trip_id);";

pub const DOCUMENT_META_COLUMNS: &str = "id, user_id, trip_id, name, mime_type, size, created_at";

pub fn schema_statements() -> Vec<&'static str> {
    vec![
        CREATE_DOCUMENTS,
        CREATE_KV,
        INDEX_DOCUMENTS_TRIP,
        INDEX_DOCUMENTS_USER_TRIP,
    ]
}
