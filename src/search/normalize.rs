use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Canonical form used to compare client names: NFD, combining marks dropped,
/// lower-cased. "José" and "JOSE" both become "jose".
pub fn normalize_client_name(input: &str) -> String {
    input
        .nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .collect::<String>()
        .to_lowercase()
}

/// True when the normalized `stored` value contains the normalized `query`.
pub fn client_matches(stored: &str, normalized_query: &str) -> bool {
    normalize_client_name(stored).contains(normalized_query)
}
