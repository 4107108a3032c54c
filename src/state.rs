use std::{sync::Arc, time::Duration};

use tracing::error;

use crate::{
    config::AppConfig,
    error::AppResult,
    models::{orders_from_rows, Order},
    search::{extract::TextExtractor, resolver::ResolverMode, OrderSearch, SearchContext},
    sheets::TabularStore,
    storage::ObjectStorage,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sheet: Arc<dyn TabularStore>,
    pub search: OrderSearch,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        sheet: Arc<dyn TabularStore>,
        storage: Arc<dyn ObjectStorage>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        let search = OrderSearch::from_config(&config, storage, extractor);
        Self {
            config: Arc::new(config),
            sheet,
            search,
        }
    }

    pub async fn load_orders(&self) -> AppResult<Vec<Order>> {
        let rows = self.sheet.list_rows().await.map_err(|err| {
            error!(error = %err, "failed to load order sheet");
            err
        })?;
        Ok(orders_from_rows(&rows))
    }

    pub fn search_context(&self, resolver_mode: ResolverMode) -> SearchContext {
        SearchContext::new(
            resolver_mode,
            Duration::from_secs(self.config.presign_ttl_secs),
        )
    }
}
