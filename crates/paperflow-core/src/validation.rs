//! Upload validation module
//!
//! Pre-storage checks for incoming files. Failures here reject a single
//! file of a batch; sibling files are unaffected.

/// Content types accepted as documents.
const DOCUMENT_CONTENT_TYPES: &[&str] = &["application/pdf"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Unsupported content type '{0}'. Accepted: PDF or image files")]
    UnsupportedContentType(String),

    #[error("File '{0}' is empty")]
    EmptyFile(String),

    #[error("File '{filename}' is {size_bytes} bytes, exceeding the limit of {limit_bytes}")]
    FileTooLarge {
        filename: String,
        size_bytes: usize,
        limit_bytes: usize,
    },

    #[error("File part is missing a filename")]
    MissingFilename,
}

/// Validates upload candidates against the configured size limit and the
/// accepted content types (PDF documents and any `image/*`).
#[derive(Debug, Clone)]
pub struct UploadValidator {
    max_file_size_bytes: usize,
}

impl UploadValidator {
    pub fn new(max_file_size_bytes: usize) -> Self {
        Self {
            max_file_size_bytes,
        }
    }

    pub fn validate(
        &self,
        filename: &str,
        content_type: &str,
        size_bytes: usize,
    ) -> Result<(), ValidationError> {
        if filename.trim().is_empty() {
            return Err(ValidationError::MissingFilename);
        }

        if !Self::is_accepted_content_type(content_type) {
            return Err(ValidationError::UnsupportedContentType(
                content_type.to_string(),
            ));
        }

        if size_bytes == 0 {
            return Err(ValidationError::EmptyFile(filename.to_string()));
        }

        if size_bytes > self.max_file_size_bytes {
            return Err(ValidationError::FileTooLarge {
                filename: filename.to_string(),
                size_bytes,
                limit_bytes: self.max_file_size_bytes,
            });
        }

        Ok(())
    }

    pub fn is_accepted_content_type(content_type: &str) -> bool {
        let normalized = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim()
            .to_ascii_lowercase();
        DOCUMENT_CONTENT_TYPES.contains(&normalized.as_str())
            || normalized.starts_with("image/")
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> UploadValidator {
        UploadValidator::new(10 * 1024 * 1024)
    }

    #[test]
    fn test_accepts_pdf() {
        assert!(validator()
            .validate("invoice.pdf", "application/pdf", 2048)
            .is_ok());
    }

    #[test]
    fn test_accepts_any_image_subtype() {
        let v = validator();
        assert!(v.validate("scan.jpg", "image/jpeg", 2048).is_ok());
        assert!(v.validate("scan.png", "image/png", 2048).is_ok());
        assert!(v.validate("scan.heic", "image/heic", 2048).is_ok());
    }

    #[test]
    fn test_accepts_content_type_with_parameters() {
        assert!(validator()
            .validate("scan.jpg", "image/jpeg; charset=binary", 2048)
            .is_ok());
    }

    #[test]
    fn test_rejects_unsupported_type() {
        let err = validator()
            .validate("notes.txt", "text/plain", 2048)
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnsupportedContentType("text/plain".to_string())
        );
    }

    #[test]
    fn test_rejects_empty_file() {
        let err = validator()
            .validate("invoice.pdf", "application/pdf", 0)
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptyFile("invoice.pdf".to_string()));
    }

    #[test]
    fn test_rejects_oversized_file() {
        let v = UploadValidator::new(1024);
        let err = v
            .validate("invoice.pdf", "application/pdf", 2048)
            .unwrap_err();
        assert!(matches!(err, ValidationError::FileTooLarge { .. }));
    }

    #[test]
    fn test_rejects_missing_filename() {
        let err = validator()
            .validate("  ", "application/pdf", 2048)
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingFilename);
    }
}
