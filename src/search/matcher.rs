use std::sync::Arc;

use futures_util::{future, stream, StreamExt};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use tokio::task;
use tracing::{debug, warn};

use crate::{models::StoredObject, storage::ObjectStorage};

use super::extract::{extraction_placeholder, TextExtractor};

pub const DOCUMENT_EXTENSION: &str = ".pdf";

static WAYBILL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:waybill|gu[ií]a|tracking|rastreo)\s*(?:no\.?|n[uú]m(?:ero)?\.?|#)?\s*:?\s*([0-9][0-9 ]{7,})",
    )
    .expect("waybill pattern is valid")
});

/// Text pulled out of one candidate document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentText {
    Extracted(String),
    /// The document could not be parsed; holds the placeholder shown to users.
    Failed(String),
}

impl DocumentText {
    pub fn as_str(&self) -> &str {
        match self {
            DocumentText::Extracted(text) | DocumentText::Failed(text) => text,
        }
    }

    pub fn matches(&self, keyword: &str) -> bool {
        match self {
            DocumentText::Extracted(text) => keyword_matches(keyword, text),
            DocumentText::Failed(_) => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DocumentMatch {
    pub object: StoredObject,
    pub text: String,
}

/// Looks for a keyword inside the guide documents of one storage folder.
#[derive(Clone)]
pub struct DocumentMatcher {
    storage: Arc<dyn ObjectStorage>,
    extractor: Arc<dyn TextExtractor>,
    guide_tokens: Vec<String>,
    list_limit: usize,
}

impl DocumentMatcher {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        extractor: Arc<dyn TextExtractor>,
        guide_tokens: Vec<String>,
        list_limit: usize,
    ) -> Self {
        Self {
            storage,
            extractor,
            guide_tokens,
            list_limit,
        }
    }

    /// Every file under `prefix`. Listing failures yield an empty folder.
    pub async fn list_all(&self, prefix: &str) -> Vec<StoredObject> {
        match self.storage.list_objects(prefix, self.list_limit).await {
            Ok(objects) => objects
                .into_iter()
                .filter(|object| !object.is_directory_marker())
                .collect(),
            Err(err) => {
                warn!(%prefix, error = %err, "failed to list folder");
                Vec::new()
            }
        }
    }

    pub async fn candidates(&self, prefix: &str) -> Vec<StoredObject> {
        self.list_all(prefix)
            .await
            .into_iter()
            .filter(|object| is_candidate(&object.key, &self.guide_tokens))
            .collect()
    }

    /// Returns the first candidate under `prefix` whose text contains `keyword`.
    /// Candidates after the first hit are never fetched.
    pub async fn find_matching(&self, prefix: &str, keyword: &str) -> Option<DocumentMatch> {
        let candidates = self.candidates(prefix).await;
        debug!(%prefix, candidates = candidates.len(), "scanning guide candidates");

        let texts = stream::iter(candidates).then(|object| async move {
            let text = self.load_text(&object.key).await;
            (object, text)
        });
        let mut hits = Box::pin(texts.filter_map(|(object, text)| {
            future::ready(match text {
                Some(text) if text.matches(keyword) => Some(DocumentMatch {
                    object,
                    text: text.as_str().to_string(),
                }),
                _ => None,
            })
        }));

        let hit = hits.next().await;
        if let Some(hit) = &hit {
            debug!(key = %hit.object.key, %keyword, "keyword found in document");
        }
        hit
    }

    /// Fetches and extracts one document. `None` when the bytes are unavailable.
    pub async fn load_text(&self, key: &str) -> Option<DocumentText> {
        let bytes = match self.storage.get_object(key).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(%key, error = %err, "failed to fetch document");
                return None;
            }
        };

        let extractor = self.extractor.clone();
        let result = task::spawn_blocking(move || extractor.extract_text(&bytes)).await;
        let text = match result {
            Ok(Ok(text)) => DocumentText::Extracted(text),
            Ok(Err(err)) => {
                warn!(%key, error = %err, "text extraction failed");
                DocumentText::Failed(extraction_placeholder(&err))
            }
            Err(join_err) => {
                warn!(%key, error = %join_err, "text extraction task panicked");
                DocumentText::Failed(format!("[text extraction failed: {join_err}]"))
            }
        };
        Some(text)
    }
}

/// A guide candidate is a PDF whose file name carries one of `guide_tokens`.
pub fn is_candidate(key: &str, guide_tokens: &[String]) -> bool {
    let name = crate::models::file_name(key).to_lowercase();
    name.ends_with(DOCUMENT_EXTENSION)
        && guide_tokens
            .iter()
            .any(|token| name.contains(token.as_str()))
}

pub fn strip_whitespace(input: &str) -> String {
    input.chars().filter(|ch| !ch.is_whitespace()).collect()
}

/// Raw substring first, then the whitespace-free forms, then escaped
/// case-insensitive regexes over the whitespace-free text.
pub fn keyword_matches(keyword: &str, text: &str) -> bool {
    if keyword.is_empty() {
        return false;
    }
    if text.contains(keyword) {
        return true;
    }

    let compact_keyword = strip_whitespace(keyword);
    let compact_text = strip_whitespace(text);
    if !compact_keyword.is_empty() && compact_text.contains(&compact_keyword) {
        return true;
    }

    escaped_regex_matches(keyword, &compact_text)
        || escaped_regex_matches(&compact_keyword, &compact_text)
}

fn escaped_regex_matches(needle: &str, haystack: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    RegexBuilder::new(&regex::escape(needle))
        .case_insensitive(true)
        .build()
        .map(|pattern| pattern.is_match(haystack))
        .unwrap_or(false)
}

/// Best-effort tracking number shown next to a matched guide.
pub fn extract_waybill(text: &str) -> Option<String> {
    WAYBILL_PATTERN
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|code| code.as_str().trim().to_string())
        .filter(|code| !code.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> Vec<String> {
        vec!["guia".into(), "descarga".into()]
    }

    #[test]
    fn verbatim_keyword_matches() {
        assert!(keyword_matches("1234 5678", "WAYBILL 1234 5678"));
    }

    #[test]
    fn whitespace_differences_are_ignored() {
        assert!(keyword_matches("12345678", "WAYBILL 1234 5678"));
        assert!(keyword_matches("1234 5678", "WAYBILL 1234\n5678"));
        assert!(keyword_matches("12 34 56 78", "guia: 1234\r\n 5678"));
    }

    #[test]
    fn regex_steps_ignore_case() {
        assert!(keyword_matches("abc 123", "folio ABC123"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        assert!(keyword_matches("a.b", "x a.b y"));
        assert!(!keyword_matches("a.b", "axb"));
        assert!(!keyword_matches("(1+2)", "12"));
    }

    #[test]
    fn absent_or_blank_keyword_does_not_match() {
        assert!(!keyword_matches("99999999", "WAYBILL 1234 5678"));
        assert!(!keyword_matches("", "anything"));
        assert!(!keyword_matches("   ", "anything"));
    }

    #[test]
    fn failed_extraction_never_matches() {
        let text = DocumentText::Failed("[text extraction failed: load pdf: bad]".into());
        assert!(!text.matches("failed"));
        assert!(DocumentText::Extracted("failed".into()).matches("failed"));
    }

    #[test]
    fn candidates_need_pdf_extension_and_guide_token() {
        assert!(is_candidate("PED-1/guia_descarga.pdf", &tokens()));
        assert!(is_candidate("PED-1/Guia.PDF", &tokens()));
        assert!(!is_candidate("PED-1/guia.jpg", &tokens()));
        assert!(!is_candidate("PED-1/comprobante.pdf", &tokens()));
        assert!(!is_candidate("guia/comprobante.pdf", &tokens()));
    }

    #[test]
    fn waybill_code_follows_its_label() {
        assert_eq!(
            extract_waybill("WAYBILL 1234 5678\nShipper: ACME"),
            Some("1234 5678".to_string())
        );
        assert_eq!(
            extract_waybill("Número de Guía: 987654321012"),
            Some("987654321012".to_string())
        );
        assert_eq!(
            extract_waybill("Tracking #: 11112222"),
            Some("11112222".to_string())
        );
        assert_eq!(extract_waybill("Guia 1234"), None);
        assert_eq!(extract_waybill("no label 12345678"), None);
    }
}
