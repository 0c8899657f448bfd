use super::domain::{
    AuditEvent, Client, ClientId, Document, DocumentId, DocumentType, DocumentVersion, ExportJob,
};

/// Relational persistence abstraction so the workflow services can be
/// exercised in isolation. The production implementation sits in front
/// of whatever database the deployment uses; tests use in-memory maps.
pub trait RecordStore: Send + Sync {
    fn get_client(&self, id: &ClientId) -> Result<Option<Client>, RepositoryError>;
    fn find_client_by_phone(&self, phone: &str) -> Result<Option<Client>, RepositoryError>;
    fn insert_client(&self, client: Client) -> Result<Client, RepositoryError>;
    fn update_client(&self, client: Client) -> Result<Client, RepositoryError>;

    /// All documents for a client, ordered newest-upload-first. The
    /// assembler relies on this ordering to pick the latest per type.
    fn get_client_documents(&self, client_id: &ClientId) -> Result<Vec<Document>, RepositoryError>;
    fn get_document(&self, id: &DocumentId) -> Result<Option<Document>, RepositoryError>;
    fn find_document_by_type(
        &self,
        client_id: &ClientId,
        document_type: DocumentType,
    ) -> Result<Option<Document>, RepositoryError>;
    fn insert_document(&self, document: Document) -> Result<Document, RepositoryError>;
    fn update_document(&self, document: Document) -> Result<Document, RepositoryError>;

    fn latest_document_version(
        &self,
        client_id: &ClientId,
        document_type: DocumentType,
    ) -> Result<Option<DocumentVersion>, RepositoryError>;

    /// Insert a version row, enforcing uniqueness of
    /// (client_id, document_type, version_number). A concurrent writer
    /// claiming the same number surfaces as [`RepositoryError::Conflict`]
    /// and the caller re-reads and retries.
    fn insert_document_version(
        &self,
        version: DocumentVersion,
    ) -> Result<DocumentVersion, RepositoryError>;

    fn append_audit_event(&self, event: AuditEvent) -> Result<AuditEvent, RepositoryError>;
    fn insert_export_job(&self, job: ExportJob) -> Result<ExportJob, RepositoryError>;
}

/// Error enumeration for record-store failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

/// Blob storage abstraction addressed by path.
pub trait DocumentStore: Send + Sync {
    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError>;
    fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<String, StorageError>;
    fn signed_url(&self, path: &str, ttl_seconds: i64) -> Result<String, StorageError>;
}

/// Error enumeration for blob-store failures.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object not found at '{0}'")]
    NotFound(String),
    #[error("document store unavailable: {0}")]
    Unavailable(String),
}
