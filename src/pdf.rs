//! Per-page text recovery from PDF uploads

use crate::error::PageError;
use lopdf::Document;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, warn};

/// Text of every page of a PDF, one entry per page in page order.
///
/// A document that cannot be loaded has no pages. A page whose text cannot be
/// extracted keeps its slot as a [`PageError`]. Panics raised by the PDF
/// parser on corrupt input are contained and treated the same way.
#[derive(Debug, Clone, Default)]
pub struct PdfPages {
    pages: Vec<Result<String, PageError>>,
}

impl PdfPages {
    /// Load a PDF from memory and extract each page's text
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let loaded = catch_unwind(AssertUnwindSafe(|| {
            Document::load_mem(bytes).map(|doc| {
                let numbers: Vec<u32> = doc.get_pages().into_keys().collect();
                (doc, numbers)
            })
        }));

        let (doc, numbers) = match loaded {
            Ok(Ok(loaded)) => loaded,
            Ok(Err(e)) => {
                warn!("PDF could not be loaded, treating as empty: {e}");
                return Self::default();
            }
            Err(_) => {
                warn!("PDF parser panicked while loading, treating as empty");
                return Self::default();
            }
        };

        let pages: Vec<Result<String, PageError>> = numbers
            .into_iter()
            .map(|page| extract_page(&doc, page))
            .collect();

        debug!("Loaded PDF with {} page(s)", pages.len());

        Self { pages }
    }

    /// Wrap already-extracted page results
    #[must_use]
    pub const fn from_pages(pages: Vec<Result<String, PageError>>) -> Self {
        Self { pages }
    }

    #[must_use]
    pub const fn page_count(&self) -> usize {
        self.pages.len()
    }

    #[must_use]
    pub fn page_texts(&self) -> &[Result<String, PageError>] {
        &self.pages
    }

    #[must_use]
    pub fn into_page_texts(self) -> Vec<Result<String, PageError>> {
        self.pages
    }
}

fn extract_page(doc: &Document, page: u32) -> Result<String, PageError> {
    match catch_unwind(AssertUnwindSafe(|| doc.extract_text(&[page]))) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(PageError {
            page,
            reason: e.to_string(),
        }),
        Err(_) => Err(PageError {
            page,
            reason: "parser panicked".into(),
        }),
    }
}
