use expediente::workflows::intake::{
    AuditEvent, Client, ClientId, Document, DocumentId, DocumentStore, DocumentType,
    DocumentVersion, ExportJob, RecordStore, RepositoryError, StorageError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct RecordState {
    clients: HashMap<ClientId, Client>,
    documents: Vec<Document>,
    versions: Vec<DocumentVersion>,
    audits: Vec<AuditEvent>,
    exports: Vec<ExportJob>,
}

/// Process-local record store backing the service until a database
/// adapter lands. State lives for the lifetime of the process.
#[derive(Default, Clone)]
pub(crate) struct InMemoryRecordStore {
    state: Arc<Mutex<RecordState>>,
}

impl RecordStore for InMemoryRecordStore {
    fn get_client(&self, id: &ClientId) -> Result<Option<Client>, RepositoryError> {
        let guard = self.state.lock().expect("record mutex poisoned");
        Ok(guard.clients.get(id).cloned())
    }

    fn find_client_by_phone(&self, phone: &str) -> Result<Option<Client>, RepositoryError> {
        let guard = self.state.lock().expect("record mutex poisoned");
        Ok(guard
            .clients
            .values()
            .find(|client| client.phone_number == phone)
            .cloned())
    }

    fn insert_client(&self, client: Client) -> Result<Client, RepositoryError> {
        let mut guard = self.state.lock().expect("record mutex poisoned");
        if guard.clients.contains_key(&client.id)
            || guard
                .clients
                .values()
                .any(|existing| existing.phone_number == client.phone_number)
        {
            return Err(RepositoryError::Conflict);
        }
        guard.clients.insert(client.id, client.clone());
        Ok(client)
    }

    fn update_client(&self, client: Client) -> Result<Client, RepositoryError> {
        let mut guard = self.state.lock().expect("record mutex poisoned");
        if !guard.clients.contains_key(&client.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.clients.insert(client.id, client.clone());
        Ok(client)
    }

    fn get_client_documents(&self, client_id: &ClientId) -> Result<Vec<Document>, RepositoryError> {
        let guard = self.state.lock().expect("record mutex poisoned");
        let mut documents: Vec<Document> = guard
            .documents
            .iter()
            .filter(|document| document.client_id == *client_id)
            .cloned()
            .collect();
        documents.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(documents)
    }

    fn get_document(&self, id: &DocumentId) -> Result<Option<Document>, RepositoryError> {
        let guard = self.state.lock().expect("record mutex poisoned");
        Ok(guard
            .documents
            .iter()
            .find(|document| document.id == *id)
            .cloned())
    }

    fn find_document_by_type(
        &self,
        client_id: &ClientId,
        document_type: DocumentType,
    ) -> Result<Option<Document>, RepositoryError> {
        let guard = self.state.lock().expect("record mutex poisoned");
        Ok(guard
            .documents
            .iter()
            .find(|document| {
                document.client_id == *client_id && document.document_type == Some(document_type)
            })
            .cloned())
    }

    fn insert_document(&self, document: Document) -> Result<Document, RepositoryError> {
        let mut guard = self.state.lock().expect("record mutex poisoned");
        if guard.documents.iter().any(|existing| existing.id == document.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.documents.push(document.clone());
        Ok(document)
    }

    fn update_document(&self, document: Document) -> Result<Document, RepositoryError> {
        let mut guard = self.state.lock().expect("record mutex poisoned");
        match guard
            .documents
            .iter_mut()
            .find(|existing| existing.id == document.id)
        {
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
        let guard = self.state.lock().expect("record mutex poisoned");
        Ok(guard
            .versions
            .iter()
            .filter(|version| {
                version.client_id == *client_id && version.document_type == document_type
            })
            .max_by_key(|version| version.version_number)
            .cloned())
    }

    fn insert_document_version(
        &self,
        version: DocumentVersion,
    ) -> Result<DocumentVersion, RepositoryError> {
        let mut guard = self.state.lock().expect("record mutex poisoned");
        let taken = guard.versions.iter().any(|existing| {
            existing.client_id == version.client_id
                && existing.document_type == version.document_type
                && existing.version_number == version.version_number
        });
        if taken {
            return Err(RepositoryError::Conflict);
        }
        guard.versions.push(version.clone());
        Ok(version)
    }

    fn append_audit_event(&self, event: AuditEvent) -> Result<AuditEvent, RepositoryError> {
        let mut guard = self.state.lock().expect("record mutex poisoned");
        guard.audits.push(event.clone());
        Ok(event)
    }

    fn insert_export_job(&self, job: ExportJob) -> Result<ExportJob, RepositoryError> {
        let mut guard = self.state.lock().expect("record mutex poisoned");
        guard.exports.push(job.clone());
        Ok(job)
    }
}

/// Process-local blob store keyed by path.
#[derive(Default, Clone)]
pub(crate) struct InMemoryDocumentStore {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl DocumentStore for InMemoryDocumentStore {
    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let guard = self.objects.lock().expect("blob mutex poisoned");
        guard
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    fn put(&self, path: &str, bytes: &[u8], _content_type: &str) -> Result<String, StorageError> {
        let mut guard = self.objects.lock().expect("blob mutex poisoned");
        guard.insert(path.to_string(), bytes.to_vec());
        Ok(path.to_string())
    }

    fn signed_url(&self, path: &str, ttl_seconds: i64) -> Result<String, StorageError> {
        Ok(format!("memory://{path}?ttl={ttl_seconds}"))
    }
}
