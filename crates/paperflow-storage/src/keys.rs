//! Shared key generation for storage backends.
//!
//! Key format: `uploads/{timestamp_ms}-{normalized_filename}`. The timestamp
//! prefix makes concurrent uploads of identically named files collision
//! resistant while keeping the original name recognizable.

use paperflow_core::constants::STORAGE_PREFIX;

/// Collapse every whitespace run in a filename to a single underscore.
pub fn normalize_filename(filename: &str) -> String {
    let mut out = String::with_capacity(filename.len());
    let mut in_whitespace = false;
    for c in filename.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('_');
                in_whitespace = true;
            }
        } else {
            out.push(c);
            in_whitespace = false;
        }
    }
    out
}

/// The name a file is stored under: `{timestamp_ms}-{normalized}`.
pub fn stored_filename(original_filename: &str, timestamp_ms: i64) -> String {
    format!("{}-{}", timestamp_ms, normalize_filename(original_filename))
}

/// The name a file is stored under, prefixed with the current time.
pub fn stored_filename_now(original_filename: &str) -> String {
    stored_filename(original_filename, chrono::Utc::now().timestamp_millis())
}

/// Full storage key for a stored filename.
pub fn storage_key(stored_filename: &str) -> String {
    format!("{}/{}", STORAGE_PREFIX, stored_filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace_runs() {
        assert_eq!(normalize_filename("march invoice.pdf"), "march_invoice.pdf");
        assert_eq!(
            normalize_filename("march \t invoice.pdf"),
            "march_invoice.pdf"
        );
        assert_eq!(normalize_filename(" scan.pdf "), "_scan.pdf_");
        assert_eq!(normalize_filename("scan.pdf"), "scan.pdf");
    }

    #[test]
    fn test_stored_filename_has_timestamp_prefix() {
        assert_eq!(
            stored_filename("my scan.pdf", 1690000000000),
            "1690000000000-my_scan.pdf"
        );
    }

    #[test]
    fn test_storage_key_is_prefixed() {
        assert_eq!(
            storage_key("1690000000000-scan.pdf"),
            "uploads/1690000000000-scan.pdf"
        );
    }
}
