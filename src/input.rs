//! Raw recipient input: pasted text plus PDF page text

use crate::error::PageError;
use crate::extract::{RecipientExtractor, RecipientSet};
use crate::pdf::PdfPages;
use tracing::warn;

/// Text gathered from one request, consumed by a single extraction
#[derive(Debug, Clone, Default)]
pub struct RawInput {
    pasted: String,
    pages: Vec<Result<String, PageError>>,
}

impl RawInput {
    /// Start from the free-text form field (may be empty)
    pub fn new(pasted: impl Into<String>) -> Self {
        Self {
            pasted: pasted.into(),
            pages: Vec::new(),
        }
    }

    /// Append one successfully extracted page
    #[must_use]
    pub fn with_page(mut self, text: impl Into<String>) -> Self {
        self.pages.push(Ok(text.into()));
        self
    }

    /// Append page results, failures included
    #[must_use]
    pub fn with_pages<I>(mut self, pages: I) -> Self
    where
        I: IntoIterator<Item = Result<String, PageError>>,
    {
        self.pages.extend(pages);
        self
    }

    /// Append every page of a PDF upload
    #[must_use]
    pub fn with_pdf(self, bytes: &[u8]) -> Self {
        self.with_pages(PdfPages::from_bytes(bytes).into_page_texts())
    }

    #[must_use]
    pub fn pasted(&self) -> &str {
        &self.pasted
    }

    #[must_use]
    pub const fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Union of the pasted-text set and each readable page's set.
    ///
    /// Unreadable pages are logged and skipped.
    #[must_use]
    pub fn extract(self, extractor: &RecipientExtractor) -> RecipientSet {
        let mut recipients = extractor.extract(&self.pasted);

        for page in self.pages {
            match page {
                Ok(text) => recipients = recipients.union(extractor.extract(&text)),
                Err(e) => warn!("Skipping page: {e}"),
            }
        }

        recipients
    }
}
