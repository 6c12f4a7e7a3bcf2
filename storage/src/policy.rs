use common::error::AppError;

/// MIME types accepted for uploads.
pub const ACCEPTED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "application/pdf", "text/csv"];

pub fn is_accepted_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ACCEPTED_CONTENT_TYPES.contains(&essence.as_str())
}

/// Why an upload was refused before reaching the blob store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadRejection {
    FileTooLarge,
    UnexpectedField,
    FieldValueTooLong,
    UnsupportedType,
}

impl UploadRejection {
    pub fn message(&self) -> &'static str {
        match self {
            UploadRejection::FileTooLarge => "Upload failed: File too large",
            UploadRejection::UnexpectedField => "Upload failed: Unexpected or too many fields",
            UploadRejection::FieldValueTooLong => "Upload failed: Field value too long",
            UploadRejection::UnsupportedType => "Unsupported File Type",
        }
    }
}

impl From<UploadRejection> for AppError {
    fn from(rejection: UploadRejection) -> Self {
        AppError::BadRequest(rejection.message().to_string())
    }
}
