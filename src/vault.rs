//! Offline document vault: trip files kept only in the local database.

use crate::db::{Database, DocumentMeta, StoredDocument};
use crate::session::Session;
use anyhow::Context;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

pub const MAX_DOCUMENT_BYTES: u64 = 5 * 1024 * 1024;
pub const ALLOWED_MIME_TYPES: [&str; 4] = ["application/pdf", "image/jpeg", "image/png", "image/webp"];

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("You must be logged in to upload documents")]
    NotLoggedIn,
    #[error("File size exceeds 5MB limit ({size} bytes)")]
    TooLarge { size: u64 },
    #[error("Invalid file type. Only PDF and images are allowed (got {mime_type})")]
    InvalidType { mime_type: String },
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Reads `path`, guessing the MIME type from its extension unless given.
    /// Files over the size limit are rejected before their contents are read.
    pub fn from_path(path: &Path, mime_type: Option<&str>) -> Result<Self, VaultError> {
        let size = fs::metadata(path)
            .with_context(|| format!("Failed to inspect file: {}", path.display()))?
            .len();
        if size > MAX_DOCUMENT_BYTES {
            return Err(VaultError::TooLarge { size });
        }

        let bytes =
            fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .with_context(|| format!("Path has no file name: {}", path.display()))?;
        let mime_type = mime_type.map(ToOwned::to_owned).unwrap_or_else(|| {
            mime_guess::from_path(path)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        });

        Ok(Self {
            name,
            mime_type,
            bytes,
        })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Size and type policy applied before anything is stored.
pub fn check_upload(file: &UploadFile) -> Result<(), VaultError> {
    if file.size() > MAX_DOCUMENT_BYTES {
        return Err(VaultError::TooLarge { size: file.size() });
    }
    if !ALLOWED_MIME_TYPES.contains(&file.mime_type.as_str()) {
        return Err(VaultError::InvalidType {
            mime_type: file.mime_type.clone(),
        });
    }
    Ok(())
}

pub struct DocumentVault<'db> {
    database: &'db Database,
}

impl<'db> DocumentVault<'db> {
    pub fn new(database: &'db Database) -> Self {
        Self { database }
    }

    pub fn upload(
        &self,
        session: &Session<'_>,
        trip_id: i64,
        file: UploadFile,
    ) -> Result<DocumentMeta, VaultError> {
        let user = session.user().ok_or(VaultError::NotLoggedIn)?;
        check_upload(&file)?;

        let meta = DocumentMeta {
            id: Uuid::new_v4().to_string(),
            user_id: user.id,
            trip_id,
            name: file.name,
            mime_type: file.mime_type,
            size: file.bytes.len() as i64,
            created_at: Utc::now().timestamp_millis(),
        };
        let document = StoredDocument {
            meta,
            payload: file.bytes,
        };
        self.database.insert_document(&document)?;

        info!(
            document_id = %document.meta.id,
            trip_id,
            size = document.meta.size,
            "document saved to vault"
        );

        Ok(document.meta)
    }

    /// Documents of the signed-in user for `trip_id`; empty when signed out.
    pub fn list(&self, session: &Session<'_>, trip_id: i64) -> Result<Vec<DocumentMeta>, VaultError> {
        match session.user() {
            Some(user) => Ok(self.database.documents_for_user_trip(user.id, trip_id)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn get(&self, id: &str) -> Result<StoredDocument, VaultError> {
        self.database
            .document(id)?
            .ok_or_else(|| VaultError::NotFound(id.to_string()))
    }

    pub fn delete(&self, id: &str) -> Result<(), VaultError> {
        if self.database.delete_document(id)? {
            info!(document_id = %id, "document deleted");
            Ok(())
        } else {
            Err(VaultError::NotFound(id.to_string()))
        }
    }

    /// Writes the payload to `destination`; a directory receives the original name.
    pub fn export(&self, id: &str, destination: &Path) -> Result<PathBuf, VaultError> {
        let document = self.get(id)?;
        let target = if destination.is_dir() {
            destination.join(&document.meta.name)
        } else {
            destination.to_path_buf()
        };

        fs::write(&target, &document.payload)
            .with_context(|| format!("Failed to write document: {}", target.display()))?;

        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::{DocumentVault, MAX_DOCUMENT_BYTES, UploadFile, VaultError};
    use crate::db::Database;
    use crate::session::Session;
    use crate::trip::User;
    use std::fs;

    fn file(name: &str, mime_type: &str, size: u64) -> UploadFile {
        UploadFile {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            bytes: vec![0x25; size as usize],
        }
    }

    fn signed_in(database: &Database) -> Session<'_> {
        let mut session = Session::load(database).unwrap();
        session
            .set_user(User {
                id: 1,
                name: "Test User".to_string(),
                email: "test@example.com".to_string(),
                avatar: None,
            })
            .unwrap();
        session
    }

    #[test]
    fn uploaded_document_round_trips_then_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let database = Database::open(&dir.path().join("wanderlog.db")).unwrap();
        let session = signed_in(&database);
        let vault = DocumentVault::new(&database);

        let saved = vault
            .upload(&session, 7, file("tickets.pdf", "application/pdf", 4 * 1024 * 1024))
            .unwrap();

        let listed = vault.list(&session, 7).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "tickets.pdf");
        assert_eq!(listed[0].size, 4 * 1024 * 1024);
        assert_eq!(listed[0].mime_type, "application/pdf");
        assert_eq!(listed[0].id, saved.id);

        vault.delete(&saved.id).unwrap();
        assert!(vault.list(&session, 7).unwrap().is_empty());
    }

    #[test]
    fn oversized_file_never_reaches_storage() {
        let dir = tempfile::tempdir().unwrap();
        let database = Database::open(&dir.path().join("wanderlog.db")).unwrap();
        let session = signed_in(&database);
        let vault = DocumentVault::new(&database);

        let error = vault
            .upload(&session, 7, file("scan.pdf", "application/pdf", MAX_DOCUMENT_BYTES + 1))
            .unwrap_err();

        assert!(matches!(error, VaultError::TooLarge { .. }));
        assert!(error.to_string().contains("exceeds 5MB limit"));
        assert!(database.documents_for_trip(7).unwrap().is_empty());
    }

    #[test]
    fn exactly_five_mebibytes_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let database = Database::open(&dir.path().join("wanderlog.db")).unwrap();
        let session = signed_in(&database);
        let vault = DocumentVault::new(&database);

        assert!(
            vault
                .upload(&session, 7, file("map.png", "image/png", MAX_DOCUMENT_BYTES))
                .is_ok()
        );
    }

    #[test]
    fn plain_text_is_an_invalid_type() {
        let dir = tempfile::tempdir().unwrap();
        let database = Database::open(&dir.path().join("wanderlog.db")).unwrap();
        let session = signed_in(&database);
        let vault = DocumentVault::new(&database);

        let error = vault
            .upload(&session, 7, file("notes.txt", "text/plain", 10))
            .unwrap_err();

        assert!(matches!(error, VaultError::InvalidType { .. }));
        assert!(error.to_string().starts_with("Invalid file type"));
        assert!(database.documents_for_trip(7).unwrap().is_empty());
    }

    #[test]
    fn signed_out_upload_fails_before_policy_checks() {
        let dir = tempfile::tempdir().unwrap();
        let database = Database::open(&dir.path().join("wanderlog.db")).unwrap();
        let session = Session::load(&database).unwrap();
        let vault = DocumentVault::new(&database);

        let error = vault
            .upload(&session, 7, file("notes.txt", "text/plain", MAX_DOCUMENT_BYTES + 1))
            .unwrap_err();

        assert!(matches!(error, VaultError::NotLoggedIn));
        assert!(vault.list(&session, 7).unwrap().is_empty());
    }

    #[test]
    fn export_writes_payload_under_original_name() {
        let dir = tempfile::tempdir().unwrap();
        let database = Database::open(&dir.path().join("wanderlog.db")).unwrap();
        let session = signed_in(&database);
        let vault = DocumentVault::new(&database);
        let saved = vault
            .upload(&session, 7, file("visa.jpg", "image/jpeg", 16))
            .unwrap();

        let out_dir = dir.path().join("out");
        fs::create_dir_all(&out_dir).unwrap();
        let written = vault.export(&saved.id, &out_dir).unwrap();

        assert_eq!(written, out_dir.join("visa.jpg"));
        assert_eq!(fs::read(written).unwrap().len(), 16);
    }

    #[test]
    fn mime_type_is_guessed_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boarding-pass.pdf");
        fs::write(&path, b"%PDF-1.7").unwrap();

        let upload = UploadFile::from_path(&path, None).unwrap();

        assert_eq!(upload.name, "boarding-pass.pdf");
        assert_eq!(upload.mime_type, "application/pdf");
        assert_eq!(upload.size(), 8);
    }

    #[test]
    fn oversized_path_is_rejected_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.pdf");
        fs::File::create(&path)
            .unwrap()
            .set_len(MAX_DOCUMENT_BYTES + 1)
            .unwrap();

        let error = UploadFile::from_path(&path, None).unwrap_err();

        assert!(matches!(
            error,
            VaultError::TooLarge { size } if size == MAX_DOCUMENT_BYTES + 1
        ));
    }
}
