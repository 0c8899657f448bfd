use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::workflows::intake::domain::{
    AuditEvent, AuditKind, Client, ClientId, Document, DocumentId, DocumentType, DocumentVersion,
    ExportJob,
};
use crate::workflows::intake::repository::{
    DocumentStore, RecordStore, RepositoryError, StorageError,
};
use crate::workflows::intake::service::{DocumentUpload, IntakeService, IntakeSettings};

#[derive(Default)]
struct RecordState {
    clients: HashMap<ClientId, Client>,
    documents: Vec<Document>,
    versions: Vec<DocumentVersion>,
    audits: Vec<AuditEvent>,
    exports: Vec<ExportJob>,
}

/// In-memory record store with failure knobs so tests can exercise the
/// degraded paths without a database.
#[derive(Default, Clone)]
pub(super) struct MemoryRecordStore {
    state: Arc<Mutex<RecordState>>,
    /// Audit appends fail while set.
    pub(super) fail_audit: Arc<AtomicBool>,
    /// Version inserts fail with `Unavailable` while set.
    pub(super) fail_version_insert: Arc<AtomicBool>,
    /// Number of upcoming version inserts that report `Conflict`.
    pub(super) version_conflicts: Arc<AtomicU32>,
}

impl MemoryRecordStore {
    pub(super) fn add_client(&self, client: Client) -> Client {
        let mut state = self.state.lock().expect("record mutex poisoned");
        state.clients.insert(client.id, client.clone());
        client
    }

    pub(super) fn audits(&self) -> Vec<AuditEvent> {
        self.state
            .lock()
            .expect("record mutex poisoned")
            .audits
            .clone()
    }

    pub(super) fn audit_kinds(&self) -> Vec<AuditKind> {
        self.audits().iter().map(|event| event.kind).collect()
    }

    pub(super) fn versions(&self) -> Vec<DocumentVersion> {
        self.state
            .lock()
            .expect("record mutex poisoned")
            .versions
            .clone()
    }

    pub(super) fn documents(&self) -> Vec<Document> {
        self.state
            .lock()
            .expect("record mutex poisoned")
            .documents
            .clone()
    }

    pub(super) fn exports(&self) -> Vec<ExportJob> {
        self.state
            .lock()
            .expect("record mutex poisoned")
            .exports
            .clone()
    }
}

impl RecordStore for MemoryRecordStore {
    fn get_client(&self, id: &ClientId) -> Result<Option<Client>, RepositoryError> {
        let state = self.state.lock().expect("record mutex poisoned");
        Ok(state.clients.get(id).cloned())
    }

    fn find_client_by_phone(&self, phone: &str) -> Result<Option<Client>, RepositoryError> {
        let state = self.state.lock().expect("record mutex poisoned");
        Ok(state
            .clients
            .values()
            .find(|client| client.phone_number == phone)
            .cloned())
    }

    fn insert_client(&self, client: Client) -> Result<Client, RepositoryError> {
        let mut state = self.state.lock().expect("record mutex poisoned");
        if state
            .clients
            .values()
            .any(|existing| existing.phone_number == client.phone_number)
        {
            return Err(RepositoryError::Conflict);
        }
        state.clients.insert(client.id, client.clone());
        Ok(client)
    }

    fn update_client(&self, client: Client) -> Result<Client, RepositoryError> {
        let mut state = self.state.lock().expect("record mutex poisoned");
        if !state.clients.contains_key(&client.id) {
            return Err(RepositoryError::NotFound);
        }
        state.clients.insert(client.id, client.clone());
        Ok(client)
    }

    fn get_client_documents(&self, client_id: &ClientId) -> Result<Vec<Document>, RepositoryError> {
        let state = self.state.lock().expect("record mutex poisoned");
        let mut documents: Vec<Document> = state
            .documents
            .iter()
            .filter(|doc| doc.client_id == *client_id)
            .cloned()
            .collect();
        documents.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(documents)
    }

    fn get_document(&self, id: &DocumentId) -> Result<Option<Document>, RepositoryError> {
        let state = self.state.lock().expect("record mutex poisoned");
        Ok(state.documents.iter().find(|doc| doc.id == *id).cloned())
    }

    fn find_document_by_type(
        &self,
        client_id: &ClientId,
        document_type: DocumentType,
    ) -> Result<Option<Document>, RepositoryError> {
        let state = self.state.lock().expect("record mutex poisoned");
        Ok(state
            .documents
            .iter()
            .find(|doc| doc.client_id == *client_id && doc.document_type == Some(document_type))
            .cloned())
    }

    fn insert_document(&self, document: Document) -> Result<Document, RepositoryError> {
        let mut state = self.state.lock().expect("record mutex poisoned");
        state.documents.push(document.clone());
        Ok(document)
    }

    fn update_document(&self, document: Document) -> Result<Document, RepositoryError> {
        let mut state = self.state.lock().expect("record mutex poisoned");
        match state.documents.iter_mut().find(|doc| doc.id == document.id) {
            Some(slot) => {
                *slot = document.clone();
                Ok(document)
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn latest_document_version(
        &self,
        client_id: &ClientId,
        document_type: DocumentType,
    ) -> Result<Option<DocumentVersion>, RepositoryError> {
        let state = self.state.lock().expect("record mutex poisoned");
        Ok(state
            .versions
            .iter()
            .filter(|v| v.client_id == *client_id && v.document_type == document_type)
            .max_by_key(|v| v.version_number)
            .cloned())
    }

    fn insert_document_version(
        &self,
        version: DocumentVersion,
    ) -> Result<DocumentVersion, RepositoryError> {
        if self.fail_version_insert.load(Ordering::Relaxed) {
            return Err(RepositoryError::Unavailable(
                "version table offline".to_string(),
            ));
        }
        if self.version_conflicts.load(Ordering::Relaxed) > 0 {
            self.version_conflicts.fetch_sub(1, Ordering::Relaxed);
            return Err(RepositoryError::Conflict);
        }
        let mut state = self.state.lock().expect("record mutex poisoned");
        let duplicate = state.versions.iter().any(|existing| {
            existing.client_id == version.client_id
                && existing.document_type == version.document_type
                && existing.version_number == version.version_number
        });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        state.versions.push(version.clone());
        Ok(version)
    }

    fn append_audit_event(&self, event: AuditEvent) -> Result<AuditEvent, RepositoryError> {
        if self.fail_audit.load(Ordering::Relaxed) {
            return Err(RepositoryError::Unavailable(
                "audit table offline".to_string(),
            ));
        }
        let mut state = self.state.lock().expect("record mutex poisoned");
        state.audits.push(event.clone());
        Ok(event)
    }

    fn insert_export_job(&self, job: ExportJob) -> Result<ExportJob, RepositoryError> {
        let mut state = self.state.lock().expect("record mutex poisoned");
        state.exports.push(job.clone());
        Ok(job)
    }
}

/// In-memory blob store keyed by path.
#[derive(Default, Clone)]
pub(super) struct MemoryDocumentStore {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    /// Reads fail with `Unavailable` while set.
    pub(super) fail_get: Arc<AtomicBool>,
}

impl MemoryDocumentStore {
    pub(super) fn contains(&self, path: &str) -> bool {
        self.blobs
            .lock()
            .expect("blob mutex poisoned")
            .contains_key(path)
    }

    pub(super) fn paths(&self) -> Vec<String> {
        self.blobs
            .lock()
            .expect("blob mutex poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        if self.fail_get.load(Ordering::Relaxed) {
            return Err(StorageError::Unavailable("blob reads offline".to_string()));
        }
        let blobs = self.blobs.lock().expect("blob mutex poisoned");
        blobs
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    fn put(&self, path: &str, bytes: &[u8], _content_type: &str) -> Result<String, StorageError> {
        let mut blobs = self.blobs.lock().expect("blob mutex poisoned");
        blobs.insert(path.to_string(), bytes.to_vec());
        Ok(path.to_string())
    }

    fn signed_url(&self, path: &str, ttl_seconds: i64) -> Result<String, StorageError> {
        Ok(format!("https://blobs.test/{path}?expires={ttl_seconds}"))
    }
}

pub(super) fn settings() -> IntakeSettings {
    IntakeSettings {
        max_pdf_bytes: 10 * 1024 * 1024,
        portal_secret: "unit-test-secret".to_string(),
        portal_ttl_seconds: 3600,
    }
}

pub(super) fn service(
    records: &MemoryRecordStore,
    blobs: &MemoryDocumentStore,
) -> IntakeService<MemoryRecordStore, MemoryDocumentStore> {
    IntakeService::new(
        Arc::new(records.clone()),
        Arc::new(blobs.clone()),
        settings(),
    )
}

pub(super) fn pdf_bytes(marker: &str) -> Vec<u8> {
    format!("%PDF-1.4\n{marker}\n%%EOF").into_bytes()
}

pub(super) fn client_with_passport(
    records: &MemoryRecordStore,
    name: &str,
    phone: &str,
    passport: &str,
) -> Client {
    let mut client = Client::new(name, phone);
    client.passport_or_nie = Some(passport.to_string());
    records.add_client(client)
}

pub(super) fn pdf_upload(filename: &str, document_type: Option<DocumentType>) -> DocumentUpload {
    DocumentUpload {
        filename: Some(filename.to_string()),
        content_type: "application/pdf".to_string(),
        bytes: pdf_bytes(filename),
        document_type,
        actor: "staff".to_string(),
    }
}
