use crate::config::SearchVocabulary;
use crate::models::file_name;

/// Files of one order split by what their name says they are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Categorized<T> {
    pub comprobantes: Vec<T>,
    pub facturas: Vec<T>,
    pub otros: Vec<T>,
}

impl<T> Default for Categorized<T> {
    fn default() -> Self {
        Self {
            comprobantes: Vec::new(),
            facturas: Vec::new(),
            otros: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Comprobante,
    Factura,
    Otro,
}

/// Proof-of-payment tokens win over invoice tokens when a name carries both.
pub fn classify(key: &str, vocabulary: &SearchVocabulary) -> FileCategory {
    let name = file_name(key).to_lowercase();
    let has_any = |tokens: &[String]| tokens.iter().any(|token| name.contains(token.as_str()));

    if has_any(&vocabulary.proof_tokens) {
        FileCategory::Comprobante
    } else if has_any(&vocabulary.invoice_tokens) {
        FileCategory::Factura
    } else {
        FileCategory::Otro
    }
}

/// Partitions `files` by name, dropping the one whose key equals `excluded_key`.
pub fn categorize<T>(
    files: impl IntoIterator<Item = T>,
    excluded_key: Option<&str>,
    vocabulary: &SearchVocabulary,
    key_of: impl Fn(&T) -> &str,
) -> Categorized<T> {
    let mut buckets = Categorized::default();
    for file in files {
        let key = key_of(&file);
        if excluded_key == Some(key) {
            continue;
        }
        match classify(key, vocabulary) {
            FileCategory::Comprobante => buckets.comprobantes.push(file),
            FileCategory::Factura => buckets.facturas.push(file),
            FileCategory::Otro => buckets.otros.push(file),
        }
    }
    buckets
}
