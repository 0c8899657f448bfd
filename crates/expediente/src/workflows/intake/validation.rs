//! Pure upload validation. Gates every storage write, so it performs no
//! I/O and never mutates anything.

/// Size ceiling for a single PDF upload.
pub const MAX_PDF_SIZE_BYTES: usize = 10 * 1024 * 1024;

/// Fallback name when sanitization leaves nothing usable.
pub const DEFAULT_FILENAME: &str = "document.pdf";

const ALLOWED_PDF_MIME: &str = "application/pdf";

/// Rejection reasons for uploads and review/export inputs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{filename}: empty file")]
    EmptyFile { filename: String },
    #[error("{filename}: file exceeds max size ({limit_mib}MB)")]
    FileTooLarge { filename: String, limit_mib: usize },
    #[error("{filename}: invalid MIME type '{content_type}'")]
    UnsupportedMime {
        filename: String,
        content_type: String,
    },
    #[error("{filename}: invalid PDF signature")]
    InvalidPdfSignature { filename: String },
    #[error("rejection note is required when action is 'rejected'")]
    MissingReviewNote,
    #[error("expires_in must be between {min} and {max} seconds")]
    ExpiryOutOfRange { min: i64, max: i64 },
}

/// Return a safe filename without directory traversal or unsafe chars,
/// always ending in `.pdf`.
pub fn sanitize_filename(filename: Option<&str>) -> String {
    let raw = filename.unwrap_or("").trim();
    // Strip directory components from either separator convention. A
    // trailing separator is ignored, so "docs/" names "docs".
    let base = raw
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("");

    if base.is_empty() {
        return DEFAULT_FILENAME.to_string();
    }

    let mut sanitized: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if !sanitized.to_ascii_lowercase().ends_with(".pdf") {
        sanitized.push_str(".pdf");
    }

    sanitized
}

/// Check for the `%PDF-` marker, allowing a short binary preamble.
fn has_pdf_signature(content: &[u8]) -> bool {
    if content.is_empty() {
        return false;
    }
    let window = &content[..content.len().min(1024)];
    window.windows(5).any(|chunk| chunk == b"%PDF-")
}

/// Validate an uploaded file as a safe PDF, returning the sanitized
/// filename. Checks run in order: emptiness, size ceiling, declared
/// MIME type, byte signature.
pub fn validate_pdf_upload(
    filename: Option<&str>,
    content_type: &str,
    content: &[u8],
    max_size_bytes: usize,
) -> Result<String, ValidationError> {
    let sanitized = sanitize_filename(filename);

    if content.is_empty() {
        return Err(ValidationError::EmptyFile {
            filename: sanitized,
        });
    }

    if content.len() > max_size_bytes {
        return Err(ValidationError::FileTooLarge {
            filename: sanitized,
            limit_mib: max_size_bytes / (1024 * 1024),
        });
    }

    if content_type != ALLOWED_PDF_MIME {
        return Err(ValidationError::UnsupportedMime {
            filename: sanitized,
            content_type: content_type.to_string(),
        });
    }

    if !has_pdf_signature(content) {
        return Err(ValidationError::InvalidPdfSignature {
            filename: sanitized,
        });
    }

    Ok(sanitized)
}
