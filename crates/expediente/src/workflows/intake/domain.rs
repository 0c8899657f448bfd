use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier wrapper for clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub Uuid);

impl ClientId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier wrapper for document records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Coarse classification assigned to a client's case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfileType {
    Asylum,
    Arraigo,
    Student,
    Irregular,
    Other,
}

impl ProfileType {
    pub fn code(&self) -> &'static str {
        match self {
            ProfileType::Asylum => "ASYLUM",
            ProfileType::Arraigo => "ARRAIGO",
            ProfileType::Student => "STUDENT",
            ProfileType::Irregular => "IRREGULAR",
            ProfileType::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    Active,
    Inactive,
    Archived,
}

/// A person whose case file is being collected over WhatsApp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    /// Unique per client; the inbound channel identifies people by phone.
    pub phone_number: String,
    /// Passport number or Spanish NIE. Required before any expediente
    /// can be generated.
    pub passport_or_nie: Option<String>,
    pub profile_type: ProfileType,
    pub status: ClientStatus,
    pub metadata: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl Client {
    pub fn new(name: impl Into<String>, phone_number: impl Into<String>) -> Self {
        Self {
            id: ClientId::random(),
            name: name.into(),
            phone_number: phone_number.into(),
            passport_or_nie: None,
            profile_type: ProfileType::Other,
            status: ClientStatus::Active,
            metadata: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }
}

/// The closed set of required document slots per client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    Tasa,
    PassportNie,
}

impl DocumentType {
    /// Stable wire code used in storage rows and missing-document lists.
    pub fn code(&self) -> &'static str {
        match self {
            DocumentType::Tasa => "TASA",
            DocumentType::PassportNie => "PASSPORT_NIE",
        }
    }

    /// Label shown to clients on the portal checklist.
    pub fn display_name(&self) -> &'static str {
        match self {
            DocumentType::Tasa => "Comprobante TASA",
            DocumentType::PassportNie => "Pasaporte / NIE",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Reviewer verdict on a stored document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    #[default]
    None,
    Accepted,
    Rejected,
}

/// Typed review sub-structure carried on every document instead of a
/// loose metadata map. Rejections always carry a note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewState {
    pub status: ReviewStatus,
    pub note: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl ReviewState {
    pub fn is_accepted(&self) -> bool {
        self.status == ReviewStatus::Accepted
    }
}

/// A stored upload. At most one current document exists per
/// (client, document_type); typed re-uploads update the row in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub client_id: ClientId,
    /// Unique blob path; each re-upload points the row at a fresh path.
    pub storage_path: String,
    pub document_type: Option<DocumentType>,
    pub original_filename: String,
    pub mime_type: String,
    pub file_size: usize,
    pub content_sha256: String,
    pub review: ReviewState,
    pub current_version_id: Option<Uuid>,
    pub current_version_number: Option<u32>,
    pub uploaded_at: DateTime<Utc>,
}

/// Immutable history row for one upload of a (client, type) slot.
/// `version_number` starts at 1 and strictly increases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentVersion {
    pub id: Uuid,
    pub client_id: ClientId,
    pub document_type: DocumentType,
    pub document_id: DocumentId,
    pub version_number: u32,
    pub content_sha256: String,
    pub storage_path: String,
    pub original_filename: String,
    pub mime_type: String,
    pub file_size: usize,
    pub created_at: DateTime<Utc>,
}

/// Event kinds recorded in the append-only audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditKind {
    DocUploaded,
    DocReuploaded,
    DocAccepted,
    DocRejected,
    ExportReady,
}

impl AuditKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditKind::DocUploaded => "DOC_UPLOADED",
            AuditKind::DocReuploaded => "DOC_REUPLOADED",
            AuditKind::DocAccepted => "DOC_ACCEPTED",
            AuditKind::DocRejected => "DOC_REJECTED",
            AuditKind::ExportReady => "EXPORT_READY",
        }
    }
}

/// Append-only log entry scoped to one client. Never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub client_id: ClientId,
    pub kind: AuditKind,
    pub actor: String,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        client_id: ClientId,
        kind: AuditKind,
        actor: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id,
            kind,
            actor: actor.into(),
            details,
            created_at: Utc::now(),
        }
    }
}

/// One generated expediente artifact. Written once, never updated; the
/// stored `expires_at` is the source of truth for later cleanup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportJob {
    pub id: Uuid,
    pub client_id: ClientId,
    pub storage_path: String,
    pub filename: String,
    pub status: ExportStatus,
    pub accepted_only: bool,
    pub file_size: usize,
    pub expires_at: DateTime<Utc>,
    pub requested_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStatus {
    Ready,
    Expired,
}

impl ExportStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ExportStatus::Ready => "ready",
            ExportStatus::Expired => "expired",
        }
    }
}
