use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use super::domain::{AuditEvent, AuditKind, ClientId, ExportJob, ExportStatus};
use super::expediente::ExpedienteAssembler;
use super::portal::PortalTokens;
use super::repository::{DocumentStore, RecordStore};
use super::service::IntakeError;
use super::validation::ValidationError;

pub const MIN_EXPORT_EXPIRY_SECS: i64 = 300;
pub const MAX_EXPORT_EXPIRY_SECS: i64 = 86_400;
pub const DEFAULT_EXPORT_EXPIRY_SECS: i64 = 3600;

fn default_accepted_only() -> bool {
    true
}

fn default_expires_in() -> i64 {
    DEFAULT_EXPORT_EXPIRY_SECS
}

/// Parameters for one export request. Exports default to accepted-only
/// because they are the deliverable proving review passed.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportRequest {
    #[serde(default = "default_accepted_only")]
    pub accepted_only: bool,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
    #[serde(default)]
    pub requested_by: Option<String>,
}

impl Default for ExportRequest {
    fn default() -> Self {
        Self {
            accepted_only: true,
            expires_in: DEFAULT_EXPORT_EXPIRY_SECS,
            requested_by: None,
        }
    }
}

/// What the caller gets back after a successful export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReceipt {
    pub export_job_id: Uuid,
    pub client_id: ClientId,
    pub status: &'static str,
    pub accepted_only: bool,
    pub storage_path: String,
    pub filename: String,
    pub signed_url: String,
    pub expires_in: i64,
    pub expires_at: DateTime<Utc>,
}

/// Wraps expediente generation with a registered, expiring artifact:
/// ZIP upload into the export namespace, signed URL, ExportJob row,
/// and an `EXPORT_READY` audit event.
pub struct ExportService<R, S> {
    records: Arc<R>,
    blobs: Arc<S>,
    portal: PortalTokens,
}

impl<R, S> ExportService<R, S>
where
    R: RecordStore,
    S: DocumentStore,
{
    pub fn new(records: Arc<R>, blobs: Arc<S>, portal: PortalTokens) -> Self {
        Self {
            records,
            blobs,
            portal,
        }
    }

    /// Create an export job. Requests from the `client` role must carry
    /// a valid portal token for this client; staff requests bypass the
    /// token check.
    ///
    /// The signed URL's provider-side validity and the job row's
    /// `expires_at` come from the same `expires_in`, but the row is the
    /// source of truth for any later cleanup or listing.
    pub fn create_export(
        &self,
        assembler: &ExpedienteAssembler<R, S>,
        client_id: &ClientId,
        request: &ExportRequest,
        portal_token: Option<&str>,
    ) -> Result<ExportReceipt, IntakeError> {
        if request.expires_in < MIN_EXPORT_EXPIRY_SECS
            || request.expires_in > MAX_EXPORT_EXPIRY_SECS
        {
            return Err(ValidationError::ExpiryOutOfRange {
                min: MIN_EXPORT_EXPIRY_SECS,
                max: MAX_EXPORT_EXPIRY_SECS,
            }
            .into());
        }

        let requester = request
            .requested_by
            .as_deref()
            .unwrap_or("staff")
            .trim()
            .to_ascii_lowercase();
        if requester == "client" {
            let verified = portal_token
                .map(|token| self.portal.verify(token, client_id))
                .unwrap_or(false);
            if !verified {
                return Err(IntakeError::Unauthorized(
                    "invalid or expired portal token".to_string(),
                ));
            }
        }

        let (zip_bytes, folder) = assembler.generate(client_id, request.accepted_only)?;

        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let filename = format!("{stamp}_{folder}.zip");
        let storage_path = format!("exports/{client_id}/{filename}");

        self.blobs.put(&storage_path, &zip_bytes, "application/zip")?;
        let signed_url = self.blobs.signed_url(&storage_path, request.expires_in)?;
        let expires_at = Utc::now() + Duration::seconds(request.expires_in);

        let job = self.records.insert_export_job(ExportJob {
            id: Uuid::new_v4(),
            client_id: *client_id,
            storage_path: storage_path.clone(),
            filename: filename.clone(),
            status: ExportStatus::Ready,
            accepted_only: request.accepted_only,
            file_size: zip_bytes.len(),
            expires_at,
            requested_by: requester.clone(),
            created_at: Utc::now(),
        })?;

        self.append_export_audit(&job);

        info!(
            client_id = %client_id,
            export_job_id = %job.id,
            accepted_only = request.accepted_only,
            size = job.file_size,
            "export ready at {storage_path}"
        );

        Ok(ExportReceipt {
            export_job_id: job.id,
            client_id: *client_id,
            status: job.status.label(),
            accepted_only: job.accepted_only,
            storage_path,
            filename,
            signed_url,
            expires_in: request.expires_in,
            expires_at,
        })
    }

    fn append_export_audit(&self, job: &ExportJob) {
        let event = AuditEvent::new(
            job.client_id,
            AuditKind::ExportReady,
            job.requested_by.clone(),
            json!({
                "export_job_id": job.id.to_string(),
                "storage_path": job.storage_path,
                "accepted_only": job.accepted_only,
                "expires_at": job.expires_at.to_rfc3339(),
            }),
        );

        if let Err(err) = self.records.append_audit_event(event) {
            warn!(
                client_id = %job.client_id,
                export_job_id = %job.id,
                error = %err,
                "audit event not persisted for export"
            );
        }
    }
}
