#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, ensure, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::Router;
use http_body_util::BodyExt;
use pedidos_search::config::{AppConfig, SearchVocabulary};
use pedidos_search::models::{
    StoredObject, COL_CLIENT, COL_ID, COL_INVOICE_FOLIO, COL_PAYMENT_STATUS, COL_STATUS,
};
use pedidos_search::routes;
use pedidos_search::search::extract::{ExtractError, TextExtractor};
use pedidos_search::sheets::{SheetRow, SheetsError, SheetsResult, TabularStore};
use pedidos_search::state::AppState;
use pedidos_search::storage::ObjectStorage;
use serde_json::Value;
use tokio::sync::Mutex;
use tower::util::ServiceExt;

/// In-memory bucket that records every object fetch.
#[derive(Default)]
pub struct FakeStorage {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    fetched: Mutex<Vec<String>>,
    unavailable: Mutex<bool>,
    failing_prefixes: Mutex<HashSet<String>>,
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn list_objects(&self, prefix: &str, max_results: usize) -> Result<Vec<StoredObject>> {
        if *self.unavailable.lock().await {
            bail!("storage unavailable");
        }
        if self.failing_prefixes.lock().await.contains(prefix) {
            bail!("listing {prefix} failed");
        }
        let guard = self.objects.lock().await;
        Ok(guard
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .take(max_results)
            .map(|(key, bytes)| StoredObject {
                key: key.clone(),
                size: bytes.len() as u64,
                last_modified: None,
            })
            .collect())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        if *self.unavailable.lock().await {
            bail!("storage unavailable");
        }
        self.fetched.lock().await.push(key.to_string());
        let guard = self.objects.lock().await;
        guard
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow!("object {key} missing"))
    }

    async fn presign_get_object(&self, key: &str, expires_in: Duration) -> Result<String> {
        let guard = self.objects.lock().await;
        ensure!(guard.contains_key(key), "object {key} missing");
        Ok(format!(
            "https://fake-storage/{key}?expires_in={}",
            expires_in.as_secs()
        ))
    }
}

impl FakeStorage {
    pub async fn put(&self, key: &str, bytes: impl Into<Vec<u8>>) {
        self.objects
            .lock()
            .await
            .insert(key.to_string(), bytes.into());
    }

    pub async fn fetched(&self) -> Vec<String> {
        self.fetched.lock().await.clone()
    }

    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().await = unavailable;
    }

    pub async fn fail_listing(&self, prefix: &str) {
        self.failing_prefixes.lock().await.insert(prefix.to_string());
    }
}

/// Treats stored bytes as the document's text; invalid UTF-8 fails extraction.
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        String::from_utf8(bytes.to_vec()).map_err(|err| ExtractError::Load(err.to_string()))
    }
}

#[derive(Default)]
pub struct FakeSheet {
    rows: Mutex<Vec<SheetRow>>,
    failing: Mutex<bool>,
}

#[async_trait]
impl TabularStore for FakeSheet {
    async fn list_rows(&self) -> SheetsResult<Vec<SheetRow>> {
        if *self.failing.lock().await {
            return Err(SheetsError::Status {
                status: 500,
                body: "backend error".into(),
            });
        }
        Ok(self.rows.lock().await.clone())
    }
}

impl FakeSheet {
    pub async fn push_order(&self, id: &str, client: &str) {
        let row = SheetRow::from_pairs(
            [
                (COL_ID, id.to_string()),
                (COL_CLIENT, client.to_string()),
                (COL_INVOICE_FOLIO, format!("F-{id}")),
                (COL_STATUS, "Pendiente".to_string()),
                (COL_PAYMENT_STATUS, "Pagado".to_string()),
            ]
            .into_iter()
            .map(|(column, value)| (column.to_string(), value)),
        );
        self.rows.lock().await.push(row);
    }

    pub async fn set_failing(&self, failing: bool) {
        *self.failing.lock().await = failing;
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        cors_allowed_origin: None,
        aws_endpoint_url: None,
        aws_access_key_id: None,
        aws_secret_access_key: None,
        aws_region: "us-east-1".to_string(),
        s3_bucket: "test-bucket".to_string(),
        sheets_api_base: "http://127.0.0.1:9".to_string(),
        sheets_spreadsheet_id: "test-sheet".to_string(),
        sheets_range: "datos_pedidos".to_string(),
        sheets_api_key: None,
        sheets_access_token: None,
        orders_cache_ttl_secs: 0,
        presign_ttl_secs: 600,
        admin_scan_limit: 100,
        folder_list_limit: 1000,
        vocabulary: SearchVocabulary::default(),
    }
}

pub struct TestApp {
    router: Router,
    storage: Arc<FakeStorage>,
    sheet: Arc<FakeSheet>,
}

impl TestApp {
    pub fn new() -> Self {
        let storage = Arc::new(FakeStorage::default());
        let sheet = Arc::new(FakeSheet::default());
        let state = AppState::new(
            test_config(),
            sheet.clone(),
            storage.clone(),
            Arc::new(PlainTextExtractor),
        );
        let router = routes::create_router(state);

        Self {
            router,
            storage,
            sheet,
        }
    }

    pub fn storage(&self) -> Arc<FakeStorage> {
        self.storage.clone()
    }

    pub fn sheet(&self) -> Arc<FakeSheet> {
        self.sheet.clone()
    }

    pub async fn get(&self, path: &str) -> Result<hyper::Response<Body>> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(path)
            .body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn get_json(&self, path: &str) -> Result<(hyper::StatusCode, Value)> {
        let response = self.get(path).await?;
        let status = response.status();
        let body = body_to_vec(response.into_body()).await?;
        Ok((status, serde_json::from_slice(&body)?))
    }
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

/// Keys listed in one bucket of a search result.
pub fn bucket_keys(result: &Value, bucket: &str) -> Vec<String> {
    result[bucket]
        .as_array()
        .map(|files| {
            files
                .iter()
                .filter_map(|file| file["key"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
