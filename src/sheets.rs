use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::{sync::Mutex, time::sleep};
use tracing::{debug, warn};

use crate::config::AppConfig;

const QUOTA_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("spreadsheet quota exceeded: {0}")]
    Quota(String),
    #[error("spreadsheet request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("spreadsheet transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

pub type SheetsResult<T> = Result<T, SheetsError>;

/// A data row keyed by header name. Cells past the end of a short row are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetRow {
    cells: HashMap<String, String>,
}

impl SheetRow {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            cells: pairs.into_iter().collect(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }
}

#[async_trait]
pub trait TabularStore: Send + Sync + 'static {
    /// Returns every data row in sheet order.
    async fn list_rows(&self) -> SheetsResult<Vec<SheetRow>>;
}

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Reads the order sheet through the Google Sheets values API.
pub struct GoogleSheetsStore {
    client: Mutex<Client>,
    api_base: String,
    spreadsheet_id: String,
    range: String,
    api_key: Option<String>,
    access_token: Option<String>,
}

impl GoogleSheetsStore {
    /// Unauthenticated store; credentials are filled in by `from_config`.
    pub fn new(
        api_base: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        range: impl Into<String>,
    ) -> Self {
        Self {
            client: Mutex::new(Client::new()),
            api_base: api_base.into(),
            spreadsheet_id: spreadsheet_id.into(),
            range: range.into(),
            api_key: None,
            access_token: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            api_key: config.sheets_api_key.clone(),
            access_token: config.sheets_access_token.clone(),
            ..Self::new(
                config.sheets_api_base.clone(),
                config.sheets_spreadsheet_id.clone(),
                config.sheets_range.clone(),
            )
        }
    }

    fn values_url(&self) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.api_base.trim_end_matches('/'),
            utf8_percent_encode(&self.spreadsheet_id, NON_ALPHANUMERIC),
            utf8_percent_encode(&self.range, NON_ALPHANUMERIC),
        )
    }

    async fn fetch_values(&self) -> SheetsResult<Vec<Vec<Value>>> {
        let client = self.client.lock().await.clone();
        let mut request = client.get(self.values_url());
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        } else if let Some(key) = &self.api_key {
            request = request.query(&[("key", key)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, body));
        }

        let data: ValuesResponse = response.json().await?;
        Ok(data.values)
    }

    async fn reconnect(&self) {
        let mut guard = self.client.lock().await;
        *guard = Client::new();
    }
}

#[async_trait]
impl TabularStore for GoogleSheetsStore {
    async fn list_rows(&self) -> SheetsResult<Vec<SheetRow>> {
        let values = match self.fetch_values().await {
            Err(SheetsError::Quota(reason)) => {
                warn!(%reason, "spreadsheet quota hit; reconnecting and retrying once");
                sleep(QUOTA_RETRY_DELAY).await;
                self.reconnect().await;
                self.fetch_values().await?
            }
            other => other?,
        };

        let rows = rows_from_values(values);
        debug!(rows = rows.len(), "loaded spreadsheet rows");
        Ok(rows)
    }
}

fn classify_failure(status: StatusCode, body: String) -> SheetsError {
    let lowered = body.to_lowercase();
    if status == StatusCode::TOO_MANY_REQUESTS
        || lowered.contains("quota")
        || lowered.contains("rate_limit_exceeded")
    {
        SheetsError::Quota(format!("status {status}"))
    } else {
        SheetsError::Status {
            status: status.as_u16(),
            body,
        }
    }
}

/// Turns a values grid whose first row is the header into keyed rows.
pub fn rows_from_values(values: Vec<Vec<Value>>) -> Vec<SheetRow> {
    let mut lines = values.into_iter();
    let Some(header) = lines.next() else {
        return Vec::new();
    };
    let header: Vec<String> = header.iter().map(cell_text).collect();

    lines
        .map(|line| {
            SheetRow::from_pairs(
                header
                    .iter()
                    .zip(line.iter())
                    .filter(|(name, _)| !name.is_empty())
                    .map(|(name, cell)| (name.clone(), cell_text(cell))),
            )
        })
        .collect()
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => String::new(),
    }
}

struct CachedRows {
    fetched_at: Instant,
    rows: Vec<SheetRow>,
}

/// Serves the last successful row set for a fixed time-to-live.
pub struct CachedTabularStore<S> {
    inner: S,
    ttl: Duration,
    cached: Mutex<Option<CachedRows>>,
}

impl<S: TabularStore> CachedTabularStore<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl<S: TabularStore> TabularStore for CachedTabularStore<S> {
    async fn list_rows(&self) -> SheetsResult<Vec<SheetRow>> {
        let mut guard = self.cached.lock().await;
        if let Some(cached) = guard.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                return Ok(cached.rows.clone());
            }
        }

        let rows = self.inner.list_rows().await?;
        *guard = Some(CachedRows {
            fetched_at: Instant::now(),
            rows: rows.clone(),
        });
        Ok(rows)
    }
}
