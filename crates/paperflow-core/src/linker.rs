//! Record linker
//!
//! Associates a freshly processed document with an existing invoice.
//! Pure over its inputs; the caller persists the association. Rules are
//! applied in strict precedence, first satisfied rule wins, and within a
//! rule the first candidate in iteration order wins. No match is a valid
//! silent outcome.

use crate::models::{DocumentRecord, Invoice};
use serde::Serialize;

/// The association a linker pass produced. Ephemeral; never stored as its
/// own entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkResult {
    pub document_id: uuid::Uuid,
    pub doc_num: String,
}

/// Find the invoice a document belongs to, if any.
///
/// Precedence:
/// 1. uploader username equality (both sides present)
/// 2. stored filename equality
/// 3. storage URL equality
/// 4. invoice doc_num appears case-insensitively in the original filename,
///    after stripping a leading numeric timestamp prefix
pub fn link_document(document: &DocumentRecord, candidates: &[Invoice]) -> Option<LinkResult> {
    if let Some(uploader) = document.uploader_username.as_deref() {
        for invoice in candidates {
            if invoice.uploader_username.as_deref() == Some(uploader) {
                return Some(result(document, invoice));
            }
        }
    }

    for invoice in candidates {
        if invoice.document_filename.as_deref() == Some(document.filename.as_str()) {
            return Some(result(document, invoice));
        }
    }

    for invoice in candidates {
        if invoice.document_url.as_deref() == Some(document.storage_url.as_str()) {
            return Some(result(document, invoice));
        }
    }

    let haystack = strip_timestamp_prefix(&document.original_filename).to_lowercase();
    let matches: Vec<&Invoice> = candidates
        .iter()
        .filter(|invoice| {
            !invoice.doc_num.is_empty() && haystack.contains(&invoice.doc_num.to_lowercase())
        })
        .collect();

    if matches.len() > 1 {
        tracing::warn!(
            document_id = %document.id,
            original_filename = %document.original_filename,
            candidates = matches.len(),
            "Multiple invoices match the document filename; using the first"
        );
    }

    matches.first().map(|invoice| result(document, invoice))
}

fn result(document: &DocumentRecord, invoice: &Invoice) -> LinkResult {
    LinkResult {
        document_id: document.id,
        doc_num: invoice.doc_num.clone(),
    }
}

/// Drop a leading `<digits>-` produced by the storage key generator, so a
/// stored name like `1690000000-INV1001.pdf` still matches on `INV1001`.
fn strip_timestamp_prefix(name: &str) -> &str {
    let digits = name.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits > 0 && name.as_bytes().get(digits) == Some(&b'-') {
        &name[digits + 1..]
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn document(original_filename: &str) -> DocumentRecord {
        DocumentRecord {
            id: Uuid::new_v4(),
            storage_key: "uploads/1690000000-scan.pdf".to_string(),
            storage_url: "https://files.example.com/uploads/1690000000-scan.pdf".to_string(),
            filename: "1690000000-scan.pdf".to_string(),
            original_filename: original_filename.to_string(),
            content_type: "application/pdf".to_string(),
            size_bytes: 1024,
            uploader_id: None,
            uploader_username: None,
            created_at: Utc::now(),
        }
    }

    fn invoice(doc_num: &str) -> Invoice {
        Invoice {
            id: Uuid::new_v4(),
            doc_num: doc_num.to_string(),
            customer_name: None,
            total_amount: None,
            doc_date: None,
            status: None,
            uploader_username: None,
            document_url: None,
            document_filename: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_no_candidates_is_silent() {
        assert_eq!(link_document(&document("scan.pdf"), &[]), None);
    }

    #[test]
    fn test_username_match_has_top_precedence() {
        let mut doc = document("scan.pdf");
        doc.uploader_username = Some("maria".to_string());

        let mut by_name = invoice("INV1");
        by_name.document_filename = Some(doc.filename.clone());
        let mut by_user = invoice("INV2");
        by_user.uploader_username = Some("maria".to_string());

        let result = link_document(&doc, &[by_name, by_user]).unwrap();
        assert_eq!(result.doc_num, "INV2");
    }

    #[test]
    fn test_username_rule_skipped_when_document_has_none() {
        let doc = document("scan.pdf");
        let mut candidate = invoice("INV1");
        candidate.uploader_username = None;
        // Both None must not count as equal.
        assert_eq!(link_document(&doc, &[candidate]), None);
    }

    #[test]
    fn test_filename_match() {
        let doc = document("scan.pdf");
        let mut candidate = invoice("INV1");
        candidate.document_filename = Some("1690000000-scan.pdf".to_string());
        let result = link_document(&doc, &[candidate]).unwrap();
        assert_eq!(result.doc_num, "INV1");
    }

    #[test]
    fn test_url_match() {
        let doc = document("scan.pdf");
        let mut candidate = invoice("INV1");
        candidate.document_url =
            Some("https://files.example.com/uploads/1690000000-scan.pdf".to_string());
        let result = link_document(&doc, &[candidate]).unwrap();
        assert_eq!(result.doc_num, "INV1");
    }

    #[test]
    fn test_doc_num_substring_is_case_insensitive() {
        let doc = document("inv1001-march.pdf");
        let result = link_document(&doc, &[invoice("INV1001")]).unwrap();
        assert_eq!(result.doc_num, "INV1001");
    }

    #[test]
    fn test_doc_num_matches_after_timestamp_prefix_strip() {
        let doc = document("1690000000-INV1001-scan.pdf");
        let result = link_document(&doc, &[invoice("INV1001")]).unwrap();
        assert_eq!(result.doc_num, "INV1001");
    }

    #[test]
    fn test_timestamp_prefix_is_not_matched_against() {
        // "2024" only occurs inside the stripped prefix.
        let doc = document("20240101-scan.pdf");
        assert_eq!(link_document(&doc, &[invoice("2024")]), None);
    }

    #[test]
    fn test_multiple_substring_matches_take_first() {
        let doc = document("INV1001-INV1002.pdf");
        let result = link_document(&doc, &[invoice("INV1002"), invoice("INV1001")]).unwrap();
        assert_eq!(result.doc_num, "INV1002");
    }

    #[test]
    fn test_empty_doc_num_never_matches() {
        let doc = document("scan.pdf");
        assert_eq!(link_document(&doc, &[invoice("")]), None);
    }

    #[test]
    fn test_strip_timestamp_prefix() {
        assert_eq!(strip_timestamp_prefix("1690000000-scan.pdf"), "scan.pdf");
        assert_eq!(strip_timestamp_prefix("scan.pdf"), "scan.pdf");
        assert_eq!(strip_timestamp_prefix("-scan.pdf"), "-scan.pdf");
        assert_eq!(strip_timestamp_prefix("123"), "123");
    }
}
