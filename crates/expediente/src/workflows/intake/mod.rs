//! Client intake, document versioning, review, and expediente export.
//!
//! The workflow treats persistence and blob storage as injected
//! collaborators ([`RecordStore`], [`DocumentStore`]) so every service
//! here runs unchanged against in-memory doubles in tests.

pub mod domain;
pub mod export;
pub mod expediente;
pub mod portal;
pub mod repository;
pub mod review;
pub mod router;
pub mod service;
pub mod validation;
pub mod versioning;

#[cfg(test)]
mod tests;

pub use domain::{
    AuditEvent, AuditKind, Client, ClientId, ClientStatus, Document, DocumentId, DocumentType,
    DocumentVersion, ExportJob, ExportStatus, ProfileType, ReviewState, ReviewStatus,
};
pub use export::{
    ExportReceipt, ExportRequest, ExportService, DEFAULT_EXPORT_EXPIRY_SECS,
    MAX_EXPORT_EXPIRY_SECS, MIN_EXPORT_EXPIRY_SECS,
};
pub use expediente::{
    default_requirements, identity_label, is_nie, sanitize_name, ArchiveLabel,
    DocumentRequirement, ExpedienteAssembler,
};
pub use portal::PortalTokens;
pub use repository::{DocumentStore, RecordStore, RepositoryError, StorageError};
pub use review::{ReviewAction, ReviewService};
pub use router::intake_router;
pub use service::{
    ChecklistEntry, ChecklistStatus, DocumentUpload, IntakeError, IntakeService, IntakeSettings,
    PortalExpediente, PortalSession, UploadOutcome,
};
pub use validation::{
    sanitize_filename, validate_pdf_upload, ValidationError, DEFAULT_FILENAME, MAX_PDF_SIZE_BYTES,
};
pub use versioning::{BestEffort, UploadRecord, VersionConflict, VersionTracker};
