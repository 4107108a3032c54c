use std::env;

use anyhow::{Context, Result};
use url::Url;

pub const DEFAULT_GUIDE_TOKENS: &[&str] = &["guia", "descarga", "guide", "download"];
pub const DEFAULT_PROOF_TOKENS: &[&str] = &["comprobante"];
pub const DEFAULT_INVOICE_TOKENS: &[&str] = &["factura"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    pub cors_allowed_origin: Option<String>,
    pub aws_endpoint_url: Option<String>,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_region: String,
    pub s3_bucket: String,
    pub sheets_api_base: String,
    pub sheets_spreadsheet_id: String,
    pub sheets_range: String,
    pub sheets_api_key: Option<String>,
    pub sheets_access_token: Option<String>,
    pub orders_cache_ttl_secs: u64,
    pub presign_ttl_secs: u64,
    pub admin_scan_limit: usize,
    pub folder_list_limit: usize,
    pub vocabulary: SearchVocabulary,
}

/// Business vocabulary used to pick candidate documents and bucket files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchVocabulary {
    pub guide_tokens: Vec<String>,
    pub proof_tokens: Vec<String>,
    pub invoice_tokens: Vec<String>,
}

impl Default for SearchVocabulary {
    fn default() -> Self {
        Self {
            guide_tokens: owned(DEFAULT_GUIDE_TOKENS),
            proof_tokens: owned(DEFAULT_PROOF_TOKENS),
            invoice_tokens: owned(DEFAULT_INVOICE_TOKENS),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("SERVER_PORT must be a valid u16")?;
        let cors_allowed_origin = env::var("CORS_ALLOWED_ORIGIN").ok();
        let aws_endpoint_url = env::var("AWS_ENDPOINT_URL").ok();
        let aws_access_key_id = env::var("AWS_ACCESS_KEY_ID").ok();
        let aws_secret_access_key = env::var("AWS_SECRET_ACCESS_KEY").ok();
        let aws_region = env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());
        let s3_bucket = env::var("S3_BUCKET").context("S3_BUCKET must be set")?;
        let sheets_api_base = env::var("SHEETS_API_BASE")
            .unwrap_or_else(|_| "https://sheets.googleapis.com".to_string());
        Url::parse(&sheets_api_base).context("SHEETS_API_BASE must be a valid URL")?;
        let sheets_spreadsheet_id =
            env::var("SHEETS_SPREADSHEET_ID").context("SHEETS_SPREADSHEET_ID must be set")?;
        let sheets_range = env::var("SHEETS_RANGE").unwrap_or_else(|_| "datos_pedidos".to_string());
        let sheets_api_key = env::var("SHEETS_API_KEY").ok();
        let sheets_access_token = env::var("SHEETS_ACCESS_TOKEN").ok();
        let orders_cache_ttl_secs = env::var("ORDERS_CACHE_TTL_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .context("ORDERS_CACHE_TTL_SECS must be an integer")?;
        let presign_ttl_secs = env::var("PRESIGN_TTL_SECS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .context("PRESIGN_TTL_SECS must be an integer")?;
        let admin_scan_limit = env::var("ADMIN_SCAN_LIMIT")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .context("ADMIN_SCAN_LIMIT must be an integer")?;
        let folder_list_limit = env::var("FOLDER_LIST_LIMIT")
            .unwrap_or_else(|_| "1000".to_string())
            .parse()
            .context("FOLDER_LIST_LIMIT must be an integer")?;

        let vocabulary = SearchVocabulary {
            guide_tokens: token_list_from_env("SEARCH_GUIDE_TOKENS", DEFAULT_GUIDE_TOKENS),
            proof_tokens: token_list_from_env("SEARCH_PROOF_TOKENS", DEFAULT_PROOF_TOKENS),
            invoice_tokens: token_list_from_env("SEARCH_INVOICE_TOKENS", DEFAULT_INVOICE_TOKENS),
        };

        Ok(Self {
            server_host,
            server_port,
            cors_allowed_origin,
            aws_endpoint_url,
            aws_access_key_id,
            aws_secret_access_key,
            aws_region,
            s3_bucket,
            sheets_api_base,
            sheets_spreadsheet_id,
            sheets_range,
            sheets_api_key,
            sheets_access_token,
            orders_cache_ttl_secs,
            presign_ttl_secs,
            admin_scan_limit,
            folder_list_limit,
            vocabulary,
        })
    }

    pub fn sheets_auth_mode(&self) -> &'static str {
        match (&self.sheets_access_token, &self.sheets_api_key) {
            (Some(_), _) => "access-token",
            (None, Some(_)) => "api-key",
            (None, None) => "anonymous",
        }
    }
}

fn token_list_from_env(name: &str, defaults: &[&str]) -> Vec<String> {
    match env::var(name) {
        Ok(raw) => {
            let parsed = parse_token_list(&raw);
            if parsed.is_empty() {
                owned(defaults)
            } else {
                parsed
            }
        }
        Err(_) => owned(defaults),
    }
}

fn parse_token_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|token| token.trim().to_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::{parse_token_list, SearchVocabulary};

    #[test]
    fn parses_comma_separated_tokens() {
        let tokens = parse_token_list(" Guia, DESCARGA ,,waybill ");
        assert_eq!(tokens, vec!["guia", "descarga", "waybill"]);
    }

    #[test]
    fn blank_list_parses_to_nothing() {
        assert!(parse_token_list(" , ,").is_empty());
    }

    #[test]
    fn default_vocabulary_covers_receipts_and_invoices() {
        let vocabulary = SearchVocabulary::default();
        assert!(vocabulary.guide_tokens.contains(&"guia".to_string()));
        assert_eq!(vocabulary.proof_tokens, vec!["comprobante"]);
        assert_eq!(vocabulary.invoice_tokens, vec!["factura"]);
    }
}
