use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::info;

use super::domain::{
    Client, ClientId, ClientStatus, Document, DocumentId, DocumentType, DocumentVersion,
    ProfileType, ReviewState, ReviewStatus,
};
use super::export::{ExportReceipt, ExportRequest, ExportService};
use super::expediente::{DocumentRequirement, ExpedienteAssembler};
use super::portal::PortalTokens;
use super::repository::{DocumentStore, RecordStore, RepositoryError, StorageError};
use super::review::{ReviewAction, ReviewService};
use super::validation::{validate_pdf_upload, ValidationError};
use super::versioning::{BestEffort, UploadRecord, VersionTracker};

/// Error raised by the intake workflows.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("missing required documents: {}", missing.join(", "))]
    MissingDocuments { missing: Vec<String> },
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("archive assembly failed: {0}")]
    Archive(String),
}

/// Settings the service needs beyond its collaborators.
#[derive(Debug, Clone)]
pub struct IntakeSettings {
    pub max_pdf_bytes: usize,
    pub portal_secret: String,
    pub portal_ttl_seconds: i64,
}

impl From<&crate::config::IntakeConfig> for IntakeSettings {
    fn from(config: &crate::config::IntakeConfig) -> Self {
        Self {
            max_pdf_bytes: config.max_pdf_bytes,
            portal_secret: config.portal_secret.clone(),
            portal_ttl_seconds: config.portal_ttl_seconds,
        }
    }
}

/// One inbound file with its declared metadata.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub filename: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub document_type: Option<DocumentType>,
    pub actor: String,
}

/// Result of an upload. Duplicate content against the latest version of
/// the same typed slot is a silent success, keeping retries idempotent.
#[derive(Debug)]
pub enum UploadOutcome {
    Stored {
        document: Document,
        version: Option<BestEffort<DocumentVersion>>,
    },
    DuplicateSkipped {
        document_type: DocumentType,
        content_sha256: String,
    },
}

/// Issued portal session for self-service expediente access.
#[derive(Debug, Clone, Serialize)]
pub struct PortalSession {
    pub client_id: ClientId,
    pub token: String,
    pub expires_at: Option<i64>,
}

/// Per-requirement progress shown on the client portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecklistStatus {
    Missing,
    Uploaded,
    Accepted,
    Rejected,
}

/// One row of the portal checklist, with a client-facing message.
#[derive(Debug, Clone, Serialize)]
pub struct ChecklistEntry {
    pub document_type: DocumentType,
    pub label: &'static str,
    pub status: ChecklistStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<DocumentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// Token-gated read model of a client's case for the portal.
#[derive(Debug, Clone, Serialize)]
pub struct PortalExpediente {
    pub client_id: ClientId,
    pub client_name: String,
    pub profile_type: ProfileType,
    pub client_status: ClientStatus,
    pub checklist: Vec<ChecklistEntry>,
}

/// Service composing validation, storage, versioning, review, assembly,
/// and export behind one API. Collaborators are injected once at
/// construction; there is no ambient global lookup.
pub struct IntakeService<R, S> {
    records: Arc<R>,
    blobs: Arc<S>,
    tracker: VersionTracker<R>,
    reviews: ReviewService<R>,
    assembler: ExpedienteAssembler<R, S>,
    exports: ExportService<R, S>,
    portal: PortalTokens,
    requirements: Vec<DocumentRequirement>,
    max_pdf_bytes: usize,
}

impl<R, S> IntakeService<R, S>
where
    R: RecordStore,
    S: DocumentStore,
{
    pub fn new(records: Arc<R>, blobs: Arc<S>, settings: IntakeSettings) -> Self {
        Self::with_requirements(
            records,
            blobs,
            settings,
            super::expediente::default_requirements(),
        )
    }

    pub fn with_requirements(
        records: Arc<R>,
        blobs: Arc<S>,
        settings: IntakeSettings,
        requirements: Vec<DocumentRequirement>,
    ) -> Self {
        let portal = PortalTokens::new(settings.portal_secret, settings.portal_ttl_seconds);
        Self {
            tracker: VersionTracker::new(records.clone()),
            reviews: ReviewService::new(records.clone()),
            assembler: ExpedienteAssembler::with_requirements(
                records.clone(),
                blobs.clone(),
                requirements.clone(),
            ),
            exports: ExportService::new(records.clone(), blobs.clone(), portal.clone()),
            portal,
            requirements,
            max_pdf_bytes: settings.max_pdf_bytes,
            records,
            blobs,
        }
    }

    /// Look up a client by phone, creating an active catch-all profile
    /// on first contact. A changed display name is written back.
    pub fn get_or_create_client(
        &self,
        phone_number: &str,
        name: Option<&str>,
    ) -> Result<Client, IntakeError> {
        if let Some(mut client) = self.records.find_client_by_phone(phone_number)? {
            if let Some(name) = name {
                if !name.is_empty() && client.name != name {
                    client.name = name.to_string();
                    client = self.records.update_client(client)?;
                }
            }
            return Ok(client);
        }

        let client = Client::new(name.unwrap_or_default(), phone_number);
        let created = self.records.insert_client(client)?;
        info!(client_id = %created.id, "created new client");
        Ok(created)
    }

    /// Validate, store, and register one uploaded document.
    ///
    /// Typed uploads whose bytes match the latest recorded version of
    /// the same slot are skipped without error. A typed slot that
    /// already holds a document is updated in place (the review state
    /// survives the re-upload); only the version history grows.
    pub fn upload_document(
        &self,
        client_id: &ClientId,
        upload: DocumentUpload,
    ) -> Result<UploadOutcome, IntakeError> {
        let client = self
            .records
            .get_client(client_id)?
            .ok_or(IntakeError::NotFound("client"))?;

        let sanitized = validate_pdf_upload(
            upload.filename.as_deref(),
            &upload.content_type,
            &upload.bytes,
            self.max_pdf_bytes,
        )?;
        let content_sha256 = hex::encode(Sha256::digest(&upload.bytes));

        let mut existing = None;
        if let Some(document_type) = upload.document_type {
            let latest = self
                .records
                .latest_document_version(client_id, document_type)?;
            if latest
                .as_ref()
                .is_some_and(|version| version.content_sha256 == content_sha256)
            {
                info!(
                    client_id = %client_id,
                    document_type = %document_type,
                    sha256 = %&content_sha256[..12],
                    "skipped duplicate upload"
                );
                return Ok(UploadOutcome::DuplicateSkipped {
                    document_type,
                    content_sha256,
                });
            }
            existing = self
                .records
                .find_document_by_type(client_id, document_type)?;
        }

        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let storage_path = format!(
            "profiles/{}/{}_{}/{}_{}",
            client.profile_type.code(),
            client.name,
            client.id,
            stamp,
            sanitized
        );
        self.blobs
            .put(&storage_path, &upload.bytes, "application/pdf")?;

        let mut document = match existing {
            Some(mut document) => {
                document.storage_path = storage_path.clone();
                document.original_filename = sanitized.clone();
                document.mime_type = upload.content_type.clone();
                document.file_size = upload.bytes.len();
                document.content_sha256 = content_sha256.clone();
                document.uploaded_at = Utc::now();
                self.records.update_document(document)?
            }
            None => self.records.insert_document(Document {
                id: DocumentId::random(),
                client_id: *client_id,
                storage_path: storage_path.clone(),
                document_type: upload.document_type,
                original_filename: sanitized.clone(),
                mime_type: upload.content_type.clone(),
                file_size: upload.bytes.len(),
                content_sha256: content_sha256.clone(),
                review: ReviewState::default(),
                current_version_id: None,
                current_version_number: None,
                uploaded_at: Utc::now(),
            })?,
        };

        let mut version = None;
        if let Some(document_type) = upload.document_type {
            let record = UploadRecord {
                client_id: *client_id,
                document_type,
                document_id: document.id,
                storage_path,
                original_filename: sanitized,
                mime_type: upload.content_type,
                file_size: upload.bytes.len(),
                content_sha256,
                actor: upload.actor,
            };
            let outcome = self
                .tracker
                .register_upload(&record)
                .map_err(|conflict| IntakeError::Conflict(conflict.to_string()))?;
            if let BestEffort::Recorded(stored) = &outcome {
                document.current_version_id = Some(stored.id);
                document.current_version_number = Some(stored.version_number);
                document = self.records.update_document(document)?;
            }
            version = Some(outcome);
        }

        Ok(UploadOutcome::Stored { document, version })
    }

    /// Apply a reviewer verdict to a document.
    pub fn review_document(
        &self,
        document_id: &DocumentId,
        action: ReviewAction,
        note: Option<&str>,
        actor: &str,
    ) -> Result<Document, IntakeError> {
        self.reviews.review(document_id, action, note, actor)
    }

    /// Build the expediente ZIP, returning archive bytes and folder name.
    pub fn generate_expediente(
        &self,
        client_id: &ClientId,
        accepted_only: bool,
    ) -> Result<(Vec<u8>, String), IntakeError> {
        self.assembler.generate(client_id, accepted_only)
    }

    /// Create a registered, expiring export artifact.
    pub fn create_export(
        &self,
        client_id: &ClientId,
        request: &ExportRequest,
        portal_token: Option<&str>,
    ) -> Result<ExportReceipt, IntakeError> {
        self.exports
            .create_export(&self.assembler, client_id, request, portal_token)
    }

    /// Issue a portal token after matching the caller's phone number
    /// against the client record.
    pub fn portal_auth(
        &self,
        client_id: &ClientId,
        phone_number: &str,
    ) -> Result<PortalSession, IntakeError> {
        let client = self
            .records
            .get_client(client_id)?
            .ok_or(IntakeError::NotFound("client"))?;
        if client.phone_number != phone_number.trim() {
            return Err(IntakeError::Unauthorized(
                "phone number does not match this case".to_string(),
            ));
        }

        let token = self.portal.create(client_id);
        let expires_at = PortalTokens::token_expiration(&token);
        Ok(PortalSession {
            client_id: *client_id,
            token,
            expires_at,
        })
    }

    /// Check a portal token against a client id.
    pub fn verify_portal_token(&self, token: &str, client_id: &ClientId) -> bool {
        self.portal.verify(token, client_id)
    }

    /// Token-gated checklist view of a client's case, one row per
    /// required document type. The newest typed upload decides each
    /// row; a rejection note travels in the client-facing message.
    pub fn portal_expediente(
        &self,
        client_id: &ClientId,
        token: &str,
    ) -> Result<PortalExpediente, IntakeError> {
        if !self.portal.verify(token, client_id) {
            return Err(IntakeError::Unauthorized(
                "invalid or expired portal token".to_string(),
            ));
        }
        let client = self
            .records
            .get_client(client_id)?
            .ok_or(IntakeError::NotFound("client"))?;

        // Newest-upload-first, so the first typed match wins.
        let documents = self.records.get_client_documents(client_id)?;
        let checklist = self
            .requirements
            .iter()
            .map(|requirement| {
                let current = documents
                    .iter()
                    .find(|doc| doc.document_type == Some(requirement.document_type));
                checklist_entry(requirement.document_type, current)
            })
            .collect();

        Ok(PortalExpediente {
            client_id: *client_id,
            client_name: client.name,
            profile_type: client.profile_type,
            client_status: client.status,
            checklist,
        })
    }
}

fn checklist_entry(document_type: DocumentType, current: Option<&Document>) -> ChecklistEntry {
    let label = document_type.display_name();
    let Some(document) = current else {
        return ChecklistEntry {
            document_type,
            label,
            status: ChecklistStatus::Missing,
            message: "Pendiente de carga.".to_string(),
            document_id: None,
            uploaded_at: None,
        };
    };

    let (status, message) = match document.review.status {
        ReviewStatus::Accepted => (
            ChecklistStatus::Accepted,
            "Documento validado por el equipo.".to_string(),
        ),
        ReviewStatus::Rejected => (
            ChecklistStatus::Rejected,
            match document.review.note.as_deref() {
                Some(note) => format!("Rechazado: {note}"),
                None => "Rechazado por revisión.".to_string(),
            },
        ),
        ReviewStatus::None => (
            ChecklistStatus::Uploaded,
            "Cargado y pendiente de revisión.".to_string(),
        ),
    };

    ChecklistEntry {
        document_type,
        label,
        status,
        message,
        document_id: Some(document.id),
        uploaded_at: Some(document.uploaded_at),
    }
}
