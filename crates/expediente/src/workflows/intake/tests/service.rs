use super::common::*;
use crate::workflows::intake::domain::{ClientId, DocumentType, ReviewStatus};
use crate::workflows::intake::review::ReviewAction;
use crate::workflows::intake::service::{
    ChecklistStatus, DocumentUpload, IntakeError, UploadOutcome,
};
use crate::workflows::intake::validation::ValidationError;

#[test]
fn upload_to_unknown_client_is_not_found() {
    let records = MemoryRecordStore::default();
    let blobs = MemoryDocumentStore::default();
    let service = service(&records, &blobs);

    match service.upload_document(
        &ClientId::random(),
        pdf_upload("a.pdf", Some(DocumentType::Tasa)),
    ) {
        Err(IntakeError::NotFound("client")) => {}
        other => panic!("expected not-found error, got {other:?}"),
    }
}

#[test]
fn invalid_uploads_never_reach_storage() {
    let records = MemoryRecordStore::default();
    let blobs = MemoryDocumentStore::default();
    let client = client_with_passport(&records, "Ana Perez", "+34600000001", "AB123456");
    let service = service(&records, &blobs);

    let upload = DocumentUpload {
        filename: Some("fake.pdf".to_string()),
        content_type: "application/pdf".to_string(),
        bytes: b"GIF89a".to_vec(),
        document_type: Some(DocumentType::Tasa),
        actor: "staff".to_string(),
    };
    match service.upload_document(&client.id, upload) {
        Err(IntakeError::Validation(ValidationError::InvalidPdfSignature { .. })) => {}
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(blobs.paths().is_empty());
    assert!(records.documents().is_empty());
}

#[test]
fn first_typed_upload_creates_document_and_version_one() {
    let records = MemoryRecordStore::default();
    let blobs = MemoryDocumentStore::default();
    let client = client_with_passport(&records, "Ana Perez", "+34600000001", "AB123456");
    let service = service(&records, &blobs);

    let outcome = service
        .upload_document(&client.id, pdf_upload("tasa.pdf", Some(DocumentType::Tasa)))
        .expect("upload succeeds");
    let UploadOutcome::Stored { document, version } = outcome else {
        panic!("expected stored outcome");
    };

    assert_eq!(document.document_type, Some(DocumentType::Tasa));
    assert_eq!(document.current_version_number, Some(1));
    assert!(blobs.contains(&document.storage_path));
    let version = version.expect("typed upload records history");
    assert_eq!(version.recorded().map(|v| v.version_number), Some(1));
}

#[test]
fn untyped_upload_stores_without_version_history() {
    let records = MemoryRecordStore::default();
    let blobs = MemoryDocumentStore::default();
    let client = client_with_passport(&records, "Ana Perez", "+34600000001", "AB123456");
    let service = service(&records, &blobs);

    let outcome = service
        .upload_document(&client.id, pdf_upload("loose.pdf", None))
        .expect("upload succeeds");
    let UploadOutcome::Stored { document, version } = outcome else {
        panic!("expected stored outcome");
    };

    assert_eq!(document.document_type, None);
    assert!(version.is_none());
    assert!(records.versions().is_empty());
}

#[test]
fn duplicate_content_is_silently_skipped() {
    let records = MemoryRecordStore::default();
    let blobs = MemoryDocumentStore::default();
    let client = client_with_passport(&records, "Ana Perez", "+34600000001", "AB123456");
    let service = service(&records, &blobs);

    service
        .upload_document(&client.id, pdf_upload("tasa.pdf", Some(DocumentType::Tasa)))
        .expect("first upload succeeds");
    let outcome = service
        .upload_document(&client.id, pdf_upload("tasa.pdf", Some(DocumentType::Tasa)))
        .expect("retry is a silent success");

    match outcome {
        UploadOutcome::DuplicateSkipped { document_type, .. } => {
            assert_eq!(document_type, DocumentType::Tasa)
        }
        other => panic!("expected duplicate skip, got {other:?}"),
    }
    assert_eq!(records.versions().len(), 1);
    assert_eq!(records.documents().len(), 1);
}

#[test]
fn typed_reupload_updates_the_slot_in_place() {
    let records = MemoryRecordStore::default();
    let blobs = MemoryDocumentStore::default();
    let client = client_with_passport(&records, "Ana Perez", "+34600000001", "AB123456");
    let service = service(&records, &blobs);

    let UploadOutcome::Stored { document: first, .. } = service
        .upload_document(&client.id, pdf_upload("tasa-v1.pdf", Some(DocumentType::Tasa)))
        .expect("first upload succeeds")
    else {
        panic!("expected stored outcome");
    };
    service
        .review_document(&first.id, ReviewAction::Rejected, Some("wrong year"), "staff")
        .expect("rejection succeeds");

    let UploadOutcome::Stored { document: second, .. } = service
        .upload_document(&client.id, pdf_upload("tasa-v2.pdf", Some(DocumentType::Tasa)))
        .expect("re-upload succeeds")
    else {
        panic!("expected stored outcome");
    };

    // Same row, fresh content, history grown by one.
    assert_eq!(second.id, first.id);
    assert_ne!(second.storage_path, first.storage_path);
    assert_eq!(second.current_version_number, Some(2));
    assert_eq!(records.documents().len(), 1);
    assert_eq!(records.versions().len(), 2);
    // Review verdicts survive re-upload; staff re-reviews explicitly.
    assert_eq!(second.review.status, ReviewStatus::Rejected);
}

#[test]
fn reuploading_older_bytes_after_a_newer_version_is_a_new_version() {
    let records = MemoryRecordStore::default();
    let blobs = MemoryDocumentStore::default();
    let client = client_with_passport(&records, "Ana Perez", "+34600000001", "AB123456");
    let service = service(&records, &blobs);

    for filename in ["tasa-v1.pdf", "tasa-v2.pdf", "tasa-v1.pdf"] {
        service
            .upload_document(&client.id, pdf_upload(filename, Some(DocumentType::Tasa)))
            .expect("upload succeeds");
    }

    // Duplicate detection only looks at the latest version's hash, so
    // resubmitting v1 bytes after v2 exists creates version 3.
    assert_eq!(records.versions().len(), 3);
}

#[test]
fn get_or_create_client_is_keyed_by_phone() {
    let records = MemoryRecordStore::default();
    let blobs = MemoryDocumentStore::default();
    let service = service(&records, &blobs);

    let created = service
        .get_or_create_client("+34600000009", Some("Nuevo Cliente"))
        .expect("client created");
    let found = service
        .get_or_create_client("+34600000009", None)
        .expect("client found");
    assert_eq!(created.id, found.id);

    let renamed = service
        .get_or_create_client("+34600000009", Some("Nuevo C. Renombrado"))
        .expect("client renamed");
    assert_eq!(renamed.id, created.id);
    assert_eq!(renamed.name, "Nuevo C. Renombrado");
}

#[test]
fn portal_expediente_requires_a_valid_token() {
    let records = MemoryRecordStore::default();
    let blobs = MemoryDocumentStore::default();
    let client = client_with_passport(&records, "Ana Perez", "+34600000001", "AB123456");
    let service = service(&records, &blobs);

    match service.portal_expediente(&client.id, "") {
        Err(IntakeError::Unauthorized(_)) => {}
        other => panic!("expected unauthorized, got {other:?}"),
    }
    match service.portal_expediente(&client.id, "not-a-token") {
        Err(IntakeError::Unauthorized(_)) => {}
        other => panic!("expected unauthorized, got {other:?}"),
    }
}

#[test]
fn portal_checklist_tracks_each_requirement_through_review() {
    let records = MemoryRecordStore::default();
    let blobs = MemoryDocumentStore::default();
    let client = client_with_passport(&records, "Ana Perez", "+34600000001", "AB123456");
    let service = service(&records, &blobs);
    let token = service
        .portal_auth(&client.id, "+34600000001")
        .expect("portal auth succeeds")
        .token;

    let view = service
        .portal_expediente(&client.id, &token)
        .expect("empty case still renders");
    assert_eq!(view.checklist.len(), 2);
    assert!(view
        .checklist
        .iter()
        .all(|entry| entry.status == ChecklistStatus::Missing));

    let UploadOutcome::Stored { document: tasa, .. } = service
        .upload_document(&client.id, pdf_upload("tasa.pdf", Some(DocumentType::Tasa)))
        .expect("upload succeeds")
    else {
        panic!("expected stored outcome");
    };

    let view = service
        .portal_expediente(&client.id, &token)
        .expect("view renders");
    let tasa_row = &view.checklist[0];
    assert_eq!(tasa_row.document_type, DocumentType::Tasa);
    assert_eq!(tasa_row.status, ChecklistStatus::Uploaded);
    assert_eq!(tasa_row.document_id, Some(tasa.id));
    assert_eq!(view.checklist[1].status, ChecklistStatus::Missing);

    service
        .review_document(&tasa.id, ReviewAction::Rejected, Some("borrosa"), "staff")
        .expect("rejection succeeds");
    let view = service
        .portal_expediente(&client.id, &token)
        .expect("view renders");
    assert_eq!(view.checklist[0].status, ChecklistStatus::Rejected);
    assert_eq!(view.checklist[0].message, "Rechazado: borrosa");

    service
        .review_document(&tasa.id, ReviewAction::Accepted, None, "staff")
        .expect("re-review succeeds");
    let view = service
        .portal_expediente(&client.id, &token)
        .expect("view renders");
    assert_eq!(view.checklist[0].status, ChecklistStatus::Accepted);
    assert_eq!(view.checklist[0].label, "Comprobante TASA");
}
