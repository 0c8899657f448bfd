use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use super::domain::{AuditEvent, AuditKind, ClientId, DocumentId, DocumentType, DocumentVersion};
use super::repository::{RecordStore, RepositoryError};

/// Bounded retries for the atomic next-version insert when two writers
/// race on the same (client, type) slot.
const VERSION_INSERT_ATTEMPTS: u32 = 3;

/// Outcome of a write that must never block the primary operation.
/// Audit and version rows are best-effort: the document itself is
/// already durable when these run.
#[derive(Debug, Clone, PartialEq)]
pub enum BestEffort<T> {
    Recorded(T),
    Degraded(String),
}

impl<T> BestEffort<T> {
    pub fn recorded(&self) -> Option<&T> {
        match self {
            BestEffort::Recorded(value) => Some(value),
            BestEffort::Degraded(_) => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, BestEffort::Degraded(_))
    }
}

/// Raised only when concurrent writers exhaust the retry budget; any
/// other persistence failure degrades instead of failing the upload.
#[derive(Debug, thiserror::Error)]
#[error("version assignment for client {client_id} type {document_type} conflicted after {attempts} attempts")]
pub struct VersionConflict {
    pub client_id: ClientId,
    pub document_type: DocumentType,
    pub attempts: u32,
}

/// Everything needed to record one typed upload in the history table.
#[derive(Debug, Clone)]
pub struct UploadRecord {
    pub client_id: ClientId,
    pub document_type: DocumentType,
    pub document_id: DocumentId,
    pub storage_path: String,
    pub original_filename: String,
    pub mime_type: String,
    pub file_size: usize,
    pub content_sha256: String,
    pub actor: String,
}

/// Assigns monotonically increasing version numbers per
/// (client, document_type) and appends the matching audit event.
pub struct VersionTracker<R> {
    records: Arc<R>,
}

impl<R: RecordStore> VersionTracker<R> {
    pub fn new(records: Arc<R>) -> Self {
        Self { records }
    }

    /// Record one upload. Version 1 audits as `DOC_UPLOADED`, later
    /// versions as `DOC_REUPLOADED`. Callers must have already
    /// short-circuited duplicate content against the latest version.
    pub fn register_upload(
        &self,
        record: &UploadRecord,
    ) -> Result<BestEffort<DocumentVersion>, VersionConflict> {
        for attempt in 1..=VERSION_INSERT_ATTEMPTS {
            let latest = match self
                .records
                .latest_document_version(&record.client_id, record.document_type)
            {
                Ok(latest) => latest,
                Err(err) => return Ok(self.degrade(record, err)),
            };

            let version_number = latest.map(|v| v.version_number).unwrap_or(0) + 1;
            let version = DocumentVersion {
                id: Uuid::new_v4(),
                client_id: record.client_id,
                document_type: record.document_type,
                document_id: record.document_id,
                version_number,
                content_sha256: record.content_sha256.clone(),
                storage_path: record.storage_path.clone(),
                original_filename: record.original_filename.clone(),
                mime_type: record.mime_type.clone(),
                file_size: record.file_size,
                created_at: Utc::now(),
            };

            match self.records.insert_document_version(version) {
                Ok(stored) => {
                    self.append_upload_audit(record, &stored);
                    return Ok(BestEffort::Recorded(stored));
                }
                Err(RepositoryError::Conflict) => {
                    warn!(
                        client_id = %record.client_id,
                        document_type = %record.document_type,
                        attempt,
                        "version number conflict, re-reading latest version"
                    );
                    continue;
                }
                Err(err) => return Ok(self.degrade(record, err)),
            }
        }

        Err(VersionConflict {
            client_id: record.client_id,
            document_type: record.document_type,
            attempts: VERSION_INSERT_ATTEMPTS,
        })
    }

    fn degrade(&self, record: &UploadRecord, err: RepositoryError) -> BestEffort<DocumentVersion> {
        warn!(
            client_id = %record.client_id,
            document_type = %record.document_type,
            error = %err,
            "version/audit persistence unavailable, document remains stored"
        );
        BestEffort::Degraded(err.to_string())
    }

    fn append_upload_audit(&self, record: &UploadRecord, version: &DocumentVersion) {
        let kind = if version.version_number == 1 {
            AuditKind::DocUploaded
        } else {
            AuditKind::DocReuploaded
        };
        let event = AuditEvent::new(
            record.client_id,
            kind,
            record.actor.clone(),
            json!({
                "document_id": record.document_id.to_string(),
                "document_type": record.document_type.code(),
                "version_number": version.version_number,
                "content_sha256": record.content_sha256,
                "storage_path": record.storage_path,
            }),
        );

        if let Err(err) = self.records.append_audit_event(event) {
            warn!(
                client_id = %record.client_id,
                document_type = %record.document_type,
                error = %err,
                "audit event not persisted for upload"
            );
        }
    }
}
