use crate::error::IngestError;
use lopdf::Document;
use std::path::Path;
use tracing::debug;

/// Text of one PDF page, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

pub trait PdfExtractor: Send + Sync {
    /// Returns the non-blank pages of the file at `path`. An empty result is
    /// not an error here; callers decide what an empty document means.
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError> {
        let document =
            Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::PdfParse(error.to_string()))?;

            if text.trim().is_empty() {
                debug!(page = page_no, "skipping blank page");
                continue;
            }

            pages.push(PageText {
                number: page_no,
                text,
            });
        }

        Ok(pages)
    }
}
