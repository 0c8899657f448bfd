use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use super::domain::{AuditEvent, AuditKind, Document, DocumentId, ReviewState, ReviewStatus};
use super::repository::RecordStore;
use super::service::IntakeError;
use super::validation::ValidationError;

/// Reviewer verdict submitted against one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Accepted,
    Rejected,
}

/// Accept/reject state machine for stored documents. A document can be
/// re-reviewed in either direction; nothing locks in.
pub struct ReviewService<R> {
    records: Arc<R>,
}

impl<R: RecordStore> ReviewService<R> {
    pub fn new(records: Arc<R>) -> Self {
        Self { records }
    }

    /// Apply a review verdict. Rejection requires a non-empty trimmed
    /// note; acceptance clears any prior rejection note. Both stamp
    /// `reviewed_at` and append an audit event best-effort.
    pub fn review(
        &self,
        document_id: &DocumentId,
        action: ReviewAction,
        note: Option<&str>,
        actor: &str,
    ) -> Result<Document, IntakeError> {
        let mut document = self
            .records
            .get_document(document_id)
            .map_err(IntakeError::Repository)?
            .ok_or(IntakeError::NotFound("document"))?;

        let review = match action {
            ReviewAction::Rejected => {
                let trimmed = note.unwrap_or("").trim();
                if trimmed.is_empty() {
                    return Err(ValidationError::MissingReviewNote.into());
                }
                ReviewState {
                    status: ReviewStatus::Rejected,
                    note: Some(trimmed.to_string()),
                    reviewed_at: Some(Utc::now()),
                }
            }
            ReviewAction::Accepted => ReviewState {
                status: ReviewStatus::Accepted,
                note: None,
                reviewed_at: Some(Utc::now()),
            },
        };

        document.review = review;
        let updated = self
            .records
            .update_document(document)
            .map_err(IntakeError::Repository)?;

        self.append_review_audit(&updated, action, actor);

        Ok(updated)
    }

    fn append_review_audit(&self, document: &Document, action: ReviewAction, actor: &str) {
        let kind = match action {
            ReviewAction::Accepted => AuditKind::DocAccepted,
            ReviewAction::Rejected => AuditKind::DocRejected,
        };
        let event = AuditEvent::new(
            document.client_id,
            kind,
            actor,
            json!({
                "document_id": document.id.to_string(),
                "document_type": document.document_type.map(|t| t.code()),
                "note": document.review.note,
            }),
        );

        // The review state change is already committed; a missing audit
        // row is a recoverable inconsistency.
        if let Err(err) = self.records.append_audit_event(event) {
            warn!(
                document_id = %document.id,
                error = %err,
                "audit event not persisted for document review"
            );
        }
    }
}
