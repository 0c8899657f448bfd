use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::domain::{ClientId, DocumentId, DocumentType};
use super::export::ExportRequest;
use super::repository::{DocumentStore, RecordStore, RepositoryError, StorageError};
use super::review::ReviewAction;
use super::service::{DocumentUpload, IntakeError, IntakeService, UploadOutcome};
use super::versioning::BestEffort;

const PORTAL_TOKEN_HEADER: &str = "x-portal-token";

/// Router builder exposing HTTP endpoints for intake, review, and export.
pub fn intake_router<R, S>(service: Arc<IntakeService<R, S>>) -> Router
where
    R: RecordStore + 'static,
    S: DocumentStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/clients/:client_id/documents",
            post(upload_handler::<R, S>),
        )
        .route(
            "/api/v1/documents/:document_id/review",
            post(review_handler::<R, S>),
        )
        .route(
            "/api/v1/clients/:client_id/expediente",
            get(expediente_handler::<R, S>),
        )
        .route(
            "/api/v1/clients/:client_id/exports",
            post(export_handler::<R, S>),
        )
        .route(
            "/api/v1/clients/:client_id/portal-auth",
            post(portal_auth_handler::<R, S>),
        )
        .route(
            "/api/v1/clients/:client_id/portal-expediente",
            get(portal_expediente_handler::<R, S>),
        )
        .with_state(service)
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        let (status, payload) = match &self {
            IntakeError::Validation(err) => (StatusCode::BAD_REQUEST, json!({ "error": err.to_string() })),
            IntakeError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                json!({ "error": format!("{what} not found") }),
            ),
            IntakeError::MissingDocuments { missing } => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "missing required documents",
                    "missing": missing,
                }),
            ),
            IntakeError::Conflict(message) => {
                (StatusCode::CONFLICT, json!({ "error": message }))
            }
            IntakeError::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, json!({ "error": message }))
            }
            IntakeError::Storage(StorageError::Unavailable(_))
            | IntakeError::Repository(RepositoryError::Unavailable(_)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": self.to_string() }),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": self.to_string() }),
            ),
        };
        (status, axum::Json(payload)).into_response()
    }
}

/// Upload body: document bytes travel base64-encoded in JSON, matching
/// how the inbound channel hands media over.
#[derive(Debug, Deserialize)]
pub struct UploadDocumentRequest {
    pub filename: Option<String>,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    pub content_base64: String,
    #[serde(default)]
    pub document_type: Option<DocumentType>,
    #[serde(default)]
    pub actor: Option<String>,
}

fn default_content_type() -> String {
    "application/pdf".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ReviewDocumentRequest {
    pub action: ReviewAction,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExpedienteQuery {
    #[serde(default)]
    pub accepted_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct PortalAuthRequest {
    pub phone_number: String,
}

fn parse_client_id(raw: &str) -> Result<ClientId, Response> {
    Uuid::parse_str(raw).map(ClientId).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({ "error": "client_id must be a UUID" })),
        )
            .into_response()
    })
}

fn parse_document_id(raw: &str) -> Result<DocumentId, Response> {
    Uuid::parse_str(raw).map(DocumentId).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({ "error": "document_id must be a UUID" })),
        )
            .into_response()
    })
}

pub(crate) async fn upload_handler<R, S>(
    State(service): State<Arc<IntakeService<R, S>>>,
    Path(client_id): Path<String>,
    axum::Json(request): axum::Json<UploadDocumentRequest>,
) -> Response
where
    R: RecordStore + 'static,
    S: DocumentStore + 'static,
{
    let client_id = match parse_client_id(&client_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let bytes = match BASE64_STANDARD.decode(request.content_base64.as_bytes()) {
        Ok(bytes) => bytes,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                axum::Json(json!({ "error": "content_base64 is not valid base64" })),
            )
                .into_response()
        }
    };

    let upload = DocumentUpload {
        filename: request.filename,
        content_type: request.content_type,
        bytes,
        document_type: request.document_type,
        actor: request.actor.unwrap_or_else(|| "staff".to_string()),
    };

    match service.upload_document(&client_id, upload) {
        Ok(UploadOutcome::Stored { document, version }) => {
            let version_number = version
                .as_ref()
                .and_then(|outcome| match outcome {
                    BestEffort::Recorded(v) => Some(v.version_number),
                    BestEffort::Degraded(_) => None,
                });
            let payload = json!({
                "document_id": document.id,
                "document_type": document.document_type,
                "storage_path": document.storage_path,
                "file_size": document.file_size,
                "version_number": version_number,
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Ok(UploadOutcome::DuplicateSkipped {
            document_type,
            content_sha256,
        }) => {
            let payload = json!({
                "skipped": true,
                "document_type": document_type,
                "content_sha256": content_sha256,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn review_handler<R, S>(
    State(service): State<Arc<IntakeService<R, S>>>,
    Path(document_id): Path<String>,
    axum::Json(request): axum::Json<ReviewDocumentRequest>,
) -> Response
where
    R: RecordStore + 'static,
    S: DocumentStore + 'static,
{
    let document_id = match parse_document_id(&document_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match service.review_document(&document_id, request.action, request.note.as_deref(), "staff") {
        Ok(document) => (StatusCode::OK, axum::Json(document)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn expediente_handler<R, S>(
    State(service): State<Arc<IntakeService<R, S>>>,
    Path(client_id): Path<String>,
    Query(query): Query<ExpedienteQuery>,
) -> Response
where
    R: RecordStore + 'static,
    S: DocumentStore + 'static,
{
    let client_id = match parse_client_id(&client_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match service.generate_expediente(&client_id, query.accepted_only) {
        Ok((bytes, folder)) => {
            let disposition = format!("attachment; filename=\"{folder}.zip\"");
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/zip".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                bytes,
            )
                .into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn export_handler<R, S>(
    State(service): State<Arc<IntakeService<R, S>>>,
    Path(client_id): Path<String>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<ExportRequest>,
) -> Response
where
    R: RecordStore + 'static,
    S: DocumentStore + 'static,
{
    let client_id = match parse_client_id(&client_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let portal_token = headers
        .get(PORTAL_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());

    match service.create_export(&client_id, &request, portal_token) {
        Ok(receipt) => (StatusCode::CREATED, axum::Json(receipt)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn portal_auth_handler<R, S>(
    State(service): State<Arc<IntakeService<R, S>>>,
    Path(client_id): Path<String>,
    axum::Json(request): axum::Json<PortalAuthRequest>,
) -> Response
where
    R: RecordStore + 'static,
    S: DocumentStore + 'static,
{
    let client_id = match parse_client_id(&client_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match service.portal_auth(&client_id, &request.phone_number) {
        Ok(session) => (StatusCode::OK, axum::Json(session)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn portal_expediente_handler<R, S>(
    State(service): State<Arc<IntakeService<R, S>>>,
    Path(client_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: RecordStore + 'static,
    S: DocumentStore + 'static,
{
    let client_id = match parse_client_id(&client_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let token = headers
        .get(PORTAL_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    match service.portal_expediente(&client_id, token) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error.into_response(),
    }
}
