use once_cell::sync::OnceCell;
use pdfium_render::prelude::*;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("pdfium library unavailable: {0}")]
    LibraryUnavailable(String),
    #[error("load pdf: {0}")]
    Load(String),
}

/// Pulls plain text out of a stored document.
pub trait TextExtractor: Send + Sync + 'static {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// Placeholder recorded for a document that could not be parsed at all.
pub fn extraction_placeholder(err: &ExtractError) -> String {
    format!("[text extraction failed: {err}]")
}

/// Extracts PDF text with the system pdfium library, bound on first use.
#[derive(Default)]
pub struct PdfiumExtractor {
    pdfium: OnceCell<Pdfium>,
}

impl PdfiumExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// A failed bind is not remembered, so a library installed later is picked up.
    fn pdfium(&self) -> Result<&Pdfium, ExtractError> {
        self.pdfium.get_or_try_init(|| {
            let bindings = Pdfium::bind_to_system_library()
                .map_err(|err| ExtractError::LibraryUnavailable(err.to_string()))?;
            debug!("bound system pdfium library");
            Ok(Pdfium::new(bindings))
        })
    }
}

impl TextExtractor for PdfiumExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let document = self
            .pdfium()?
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|err| ExtractError::Load(err.to_string()))?;

        let pages = document.pages();
        let mut page_texts = Vec::with_capacity(pages.len() as usize);
        for page_index in 0..pages.len() {
            // An unreadable page contributes no text.
            let text = pages
                .get(page_index)
                .map(|page| page_text(&page))
                .unwrap_or_default();
            if text.is_empty() {
                debug!(page_index, "pdf page produced no text");
            }
            page_texts.push(text);
        }

        Ok(page_texts.join("\n"))
    }
}

fn page_text(page: &PdfPage<'_>) -> String {
    match page.text() {
        Ok(text) => text.all(),
        Err(_) => String::new(),
    }
}
