use crate::infra::{InMemoryDocumentStore, InMemoryRecordStore};
use clap::Args;
use expediente::config::IntakeConfig;
use expediente::error::AppError;
use expediente::workflows::intake::{
    ClientId, Document, DocumentType, DocumentUpload, ExportRequest, IntakeError, IntakeService,
    IntakeSettings, RecordStore, ReviewAction, UploadOutcome,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Phone number identifying the demo client.
    #[arg(long, default_value = "+34600111222")]
    pub(crate) phone: String,
    /// Display name for the demo client.
    #[arg(long, default_value = "Carlos Demo")]
    pub(crate) name: String,
    /// Passport or NIE recorded on the demo client.
    #[arg(long, default_value = "X1234567A")]
    pub(crate) passport: String,
    /// Skip the export portion of the demo.
    #[arg(long)]
    pub(crate) skip_export: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        phone,
        name,
        passport,
        skip_export,
    } = args;

    let records = Arc::new(InMemoryRecordStore::default());
    let blobs = Arc::new(InMemoryDocumentStore::default());
    let service = IntakeService::new(
        records.clone(),
        blobs,
        IntakeSettings::from(&IntakeConfig::default()),
    );

    println!("Expediente intake demo");

    let mut client = service
        .get_or_create_client(&phone, Some(&name))
        .map_err(AppError::from)?;
    client.passport_or_nie = Some(passport);
    let client = records
        .update_client(client)
        .map_err(|err| AppError::from(IntakeError::from(err)))?;
    println!("  client {} ({}) registered", client.name, client.id);

    let tasa = store_demo_pdf(&service, &client.id, "tasa_790.pdf", DocumentType::Tasa, "fee")?;
    let identity = store_demo_pdf(
        &service,
        &client.id,
        "nie_card.pdf",
        DocumentType::PassportNie,
        "identity",
    )?;
    println!(
        "  uploaded {} (v{}) and {} (v{})",
        tasa.original_filename,
        tasa.current_version_number.unwrap_or(0),
        identity.original_filename,
        identity.current_version_number.unwrap_or(0),
    );

    for document in [&tasa, &identity] {
        service
            .review_document(&document.id, ReviewAction::Accepted, None, "demo-reviewer")
            .map_err(AppError::from)?;
    }
    println!("  both documents accepted");

    let (archive, folder) = service
        .generate_expediente(&client.id, true)
        .map_err(AppError::from)?;
    println!("  expediente '{folder}.zip' assembled ({} bytes)", archive.len());

    if skip_export {
        return Ok(());
    }

    let session = service
        .portal_auth(&client.id, &phone)
        .map_err(AppError::from)?;
    let request = ExportRequest {
        requested_by: Some("client".to_string()),
        ..ExportRequest::default()
    };
    let receipt = service
        .create_export(&client.id, &request, Some(&session.token))
        .map_err(AppError::from)?;
    println!(
        "  export {} registered at {} (expires in {}s)",
        receipt.export_job_id, receipt.storage_path, receipt.expires_in
    );

    Ok(())
}

fn store_demo_pdf(
    service: &IntakeService<InMemoryRecordStore, InMemoryDocumentStore>,
    client_id: &ClientId,
    filename: &str,
    document_type: DocumentType,
    marker: &str,
) -> Result<Document, AppError> {
    let bytes = format!("%PDF-1.4\n{marker}\n%%EOF").into_bytes();
    let upload = DocumentUpload {
        filename: Some(filename.to_string()),
        content_type: "application/pdf".to_string(),
        bytes,
        document_type: Some(document_type),
        actor: "demo".to_string(),
    };

    match service
        .upload_document(client_id, upload)
        .map_err(AppError::from)?
    {
        UploadOutcome::Stored { document, .. } => Ok(document),
        UploadOutcome::DuplicateSkipped { document_type, .. } => Err(AppError::from(
            IntakeError::Conflict(format!("demo upload for {document_type} already stored")),
        )),
    }
}
