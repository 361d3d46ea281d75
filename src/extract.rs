//! Attachment text extraction.
//!
//! Extractors may fail; [`extract_text`] is the boundary that absorbs those
//! failures, logs them and caps what it hands back to the assistant.
//! [`DocumentExtractor`] picks the PDF or plain-text extractor from the
//! content itself, not the file name.

use lopdf::Document;
use thiserror::Error;
use tracing::{debug, warn};

/// Longest document text kept from one attachment, in characters
pub const MAX_DOCUMENT_CHARS: usize = 20_000;

/// Pages read from one PDF attachment
pub const MAX_PDF_PAGES: usize = 50;

/// Bytes inspected when sniffing for binary content
const SNIFF_LEN: usize = 1024;

const PDF_MAGIC: &[u8] = b"%PDF";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ExtractError {
    #[error("unsupported document format: {0}")]
    Unsupported(String),

    #[error("{0} looks like binary data")]
    Binary(String),

    #[error("could not read PDF {name}: {reason}")]
    Pdf { name: String, reason: String },
}

/// Turns attachment bytes into plain text.
pub trait TextExtractor {
    fn extract(&self, name: &str, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// Extractor for text-like attachments (notes, markdown, code, CSV).
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, name: &str, bytes: &[u8]) -> Result<String, ExtractError> {
        if bytes.starts_with(PDF_MAGIC) {
            return Err(ExtractError::Unsupported("pdf".to_string()));
        }
        let head = &bytes[..bytes.len().min(SNIFF_LEN)];
        if head.contains(&0) {
            return Err(ExtractError::Binary(name.to_string()));
        }
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

/// Text layer of a PDF, first `MAX_PDF_PAGES` pages only.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, name: &str, bytes: &[u8]) -> Result<String, ExtractError> {
        let pdf_error = |e: lopdf::Error| ExtractError::Pdf {
            name: name.to_string(),
            reason: e.to_string(),
        };

        let doc = Document::load_mem(bytes).map_err(pdf_error)?;
        let pages = doc.get_pages();
        if pages.len() > MAX_PDF_PAGES {
            debug!("{:?} has {} pages, reading the first {}", name, pages.len(), MAX_PDF_PAGES);
        }
        let page_numbers: Vec<u32> = pages.keys().copied().take(MAX_PDF_PAGES).collect();
        doc.extract_text(&page_numbers).map_err(pdf_error)
    }
}

/// Dispatches on the attachment's leading bytes: PDFs go to
/// [`PdfExtractor`], everything else to [`PlainTextExtractor`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentExtractor {
    pdf: PdfExtractor,
    plain: PlainTextExtractor,
}

impl TextExtractor for DocumentExtractor {
    fn extract(&self, name: &str, bytes: &[u8]) -> Result<String, ExtractError> {
        if bytes.starts_with(PDF_MAGIC) {
            self.pdf.extract(name, bytes)
        } else {
            self.plain.extract(name, bytes)
        }
    }
}

/// Extract, trim and cap attachment text.
///
/// Never fails: extractor errors and empty documents both come back as
/// `None`, meaning "no document context available".
pub fn extract_text(extractor: &dyn TextExtractor, name: &str, bytes: &[u8]) -> Option<String> {
    match extractor.extract(name, bytes) {
        Ok(text) => {
            let text = text.trim();
            if text.is_empty() {
                warn!("No text extracted from {:?}", name);
                return None;
            }
            let capped = truncate_chars(text, MAX_DOCUMENT_CHARS);
            debug!("Extracted {} chars from {:?}", capped.chars().count(), name);
            Some(capped)
        }
        Err(e) => {
            warn!("Extraction failed for {:?}: {}", name, e);
            None
        }
    }
}

/// First `max_chars` characters of `text`, cut on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    /// Single-page PDF with one line of Courier text per entry in `lines`.
    fn create_test_pdf(lines: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
        ];
        for line in lines {
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("Td", vec![0.into(), (-14).into()]));
        }
        operations.push(Operation::new("ET", vec![]));
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    struct FailingExtractor;

    impl TextExtractor for FailingExtractor {
        fn extract(&self, name: &str, _bytes: &[u8]) -> Result<String, ExtractError> {
            Err(ExtractError::Unsupported(name.to_string()))
        }
    }

    #[test]
    fn test_plain_text_is_trimmed() {
        let text = extract_text(&PlainTextExtractor, "notes.txt", b"  paging notes \n").unwrap();
        assert_eq!(text, "paging notes");
    }

    #[test]
    fn test_pdf_and_binary_are_rejected() {
        let pdf = PlainTextExtractor.extract("slides.pdf", b"%PDF-1.7 ...");
        assert_eq!(pdf, Err(ExtractError::Unsupported("pdf".to_string())));

        let binary = PlainTextExtractor.extract("image.png", &[0x89, b'P', b'N', b'G', 0, 0]);
        assert_eq!(binary, Err(ExtractError::Binary("image.png".to_string())));
    }

    #[test]
    fn test_failures_and_blank_documents_become_none() {
        assert_eq!(extract_text(&FailingExtractor, "x.pdf", b"whatever"), None);
        assert_eq!(extract_text(&PlainTextExtractor, "blank.txt", b"   \n\t"), None);
    }

    #[test]
    fn test_text_is_capped() {
        let long = "a".repeat(MAX_DOCUMENT_CHARS + 50);
        let text = extract_text(&PlainTextExtractor, "long.txt", long.as_bytes()).unwrap();
        assert_eq!(text.chars().count(), MAX_DOCUMENT_CHARS);
    }

    #[test]
    fn test_pdf_text_layer_is_extracted() {
        let pdf = create_test_pdf(&["Unit 4 notes", "Paging and virtual memory"]);
        assert!(pdf.starts_with(PDF_MAGIC));

        let text = PdfExtractor.extract("unit4.pdf", &pdf).unwrap();
        assert!(text.contains("Paging and virtual memory"), "got {:?}", text);
    }

    #[test]
    fn test_document_extractor_dispatches_on_content() {
        let pdf = create_test_pdf(&["Round robin scheduling"]);
        // Name is irrelevant; the bytes decide.
        let text = extract_text(&DocumentExtractor::default(), "notes.txt", &pdf).unwrap();
        assert!(text.contains("Round robin scheduling"));

        let plain = extract_text(&DocumentExtractor::default(), "slides.pdf", b"stack and queue").unwrap();
        assert_eq!(plain, "stack and queue");
    }

    #[test]
    fn test_broken_pdf_is_an_error_not_a_panic() {
        let err = PdfExtractor.extract("broken.pdf", b"%PDF-1.7 not really").unwrap_err();
        assert!(matches!(err, ExtractError::Pdf { ref name, .. } if name == "broken.pdf"));
        assert_eq!(extract_text(&DocumentExtractor::default(), "broken.pdf", b"%PDF-1.7 not really"), None);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
        assert_eq!(truncate_chars("", 3), "");
    }
}
