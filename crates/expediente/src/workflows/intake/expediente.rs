//! Case-file assembly: completeness checking against the required
//! document policy and deterministic ZIP construction.

use std::io::{Cursor, Write};
use std::sync::Arc;

use tracing::info;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::domain::{ClientId, Document, DocumentType};
use super::repository::{DocumentStore, RecordStore};
use super::service::IntakeError;

/// How a required document is named inside the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveLabel {
    /// A fixed prefix, e.g. `Tasa`.
    Fixed(&'static str),
    /// `NIE` or `Pasaporte`, decided by the client's identity number.
    IdentityKind,
}

/// One entry of the completeness policy. The policy is an ordered list
/// so adding a third required type never touches the algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentRequirement {
    pub document_type: DocumentType,
    pub label: ArchiveLabel,
}

/// The standard two-document policy: fee receipt plus identity document.
pub fn default_requirements() -> Vec<DocumentRequirement> {
    vec![
        DocumentRequirement {
            document_type: DocumentType::Tasa,
            label: ArchiveLabel::Fixed("Tasa"),
        },
        DocumentRequirement {
            document_type: DocumentType::PassportNie,
            label: ArchiveLabel::IdentityKind,
        },
    ]
}

/// Lowercase, spaces to underscores, strip everything outside
/// `[A-Za-z0-9_-]`. Used for folder and entry names.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c == ' ' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Spanish NIE pattern: X/Y/Z, seven digits, one trailing letter,
/// case-insensitive.
pub fn is_nie(value: &str) -> bool {
    let bytes = value.trim().as_bytes();
    bytes.len() == 9
        && matches!(bytes[0].to_ascii_uppercase(), b'X' | b'Y' | b'Z')
        && bytes[1..8].iter().all(u8::is_ascii_digit)
        && bytes[8].is_ascii_alphabetic()
}

/// Archive label for the identity document slot.
pub fn identity_label(passport_or_nie: &str) -> &'static str {
    if is_nie(passport_or_nie) {
        "NIE"
    } else {
        "Pasaporte"
    }
}

/// Builds expediente ZIPs from the latest qualifying document per
/// required type.
pub struct ExpedienteAssembler<R, S> {
    records: Arc<R>,
    blobs: Arc<S>,
    requirements: Vec<DocumentRequirement>,
}

impl<R, S> ExpedienteAssembler<R, S>
where
    R: RecordStore,
    S: DocumentStore,
{
    pub fn new(records: Arc<R>, blobs: Arc<S>) -> Self {
        Self::with_requirements(records, blobs, default_requirements())
    }

    pub fn with_requirements(
        records: Arc<R>,
        blobs: Arc<S>,
        requirements: Vec<DocumentRequirement>,
    ) -> Self {
        Self {
            records,
            blobs,
            requirements,
        }
    }

    /// Generate the case-file ZIP for a client, returning the archive
    /// bytes and the folder name (which is also the download name minus
    /// the `.zip` suffix).
    ///
    /// With `accepted_only`, only documents that passed review qualify
    /// and the missing-document labels gain an `_ACCEPTED` suffix. Every
    /// gap is reported, not just the first. Any storage read failure
    /// aborts the whole operation; no partial archive is ever returned.
    pub fn generate(
        &self,
        client_id: &ClientId,
        accepted_only: bool,
    ) -> Result<(Vec<u8>, String), IntakeError> {
        let client = self
            .records
            .get_client(client_id)
            .map_err(IntakeError::Repository)?
            .ok_or(IntakeError::NotFound("client"))?;

        let passport = client
            .passport_or_nie
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| IntakeError::MissingDocuments {
                missing: vec!["passport_or_nie field".to_string()],
            })?;

        let documents = self
            .records
            .get_client_documents(client_id)
            .map_err(IntakeError::Repository)?;

        // Documents arrive newest-upload-first; the first match per
        // required type wins.
        let mut winners: Vec<Option<&Document>> = vec![None; self.requirements.len()];
        for document in &documents {
            if accepted_only && !document.review.is_accepted() {
                continue;
            }
            let Some(document_type) = document.document_type else {
                continue;
            };
            for (slot, requirement) in winners.iter_mut().zip(&self.requirements) {
                if requirement.document_type == document_type && slot.is_none() {
                    *slot = Some(document);
                }
            }
        }

        let missing: Vec<String> = self
            .requirements
            .iter()
            .zip(&winners)
            .filter(|(_, winner)| winner.is_none())
            .map(|(requirement, _)| {
                let code = requirement.document_type.code();
                if accepted_only {
                    format!("{code}_ACCEPTED")
                } else {
                    code.to_string()
                }
            })
            .collect();
        if !missing.is_empty() {
            return Err(IntakeError::MissingDocuments { missing });
        }

        let name = sanitize_name(&client.name);
        let folder = format!("{}_{}", name, sanitize_name(passport));
        let identity = identity_label(passport);

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for (requirement, winner) in self.requirements.iter().zip(&winners) {
            let Some(document) = winner else {
                continue;
            };
            let bytes = self.blobs.get(&document.storage_path)?;
            let prefix = match requirement.label {
                ArchiveLabel::Fixed(prefix) => prefix,
                ArchiveLabel::IdentityKind => identity,
            };
            let entry = format!("{folder}/{prefix}_{name}.pdf");
            writer
                .start_file(&entry, options)
                .map_err(|err| IntakeError::Archive(err.to_string()))?;
            writer
                .write_all(&bytes)
                .map_err(|err| IntakeError::Archive(err.to_string()))?;
        }

        let archive = writer
            .finish()
            .map_err(|err| IntakeError::Archive(err.to_string()))?
            .into_inner();

        info!(
            client_id = %client_id,
            accepted_only,
            size = archive.len(),
            "generated expediente {folder}.zip"
        );

        Ok((archive, folder))
    }
}
