use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    config::{AppConfig, SearchVocabulary},
    models::{FileLink, Order, SearchResult, StoredObject},
    storage::ObjectStorage,
};

pub mod categorize;
pub mod extract;
pub mod matcher;
pub mod normalize;
pub mod resolver;

use categorize::categorize;
use extract::TextExtractor;
use matcher::{extract_waybill, DocumentMatch, DocumentMatcher};
use normalize::{client_matches, normalize_client_name};
use resolver::{FolderResolver, ResolverMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchState {
    Idle,
    Scanning,
    Matched,
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    /// Text inside a guide document, optionally restricted to one client.
    Guide {
        keyword: String,
        client: Option<String>,
    },
    Client {
        name: String,
    },
}

/// Per-request settings handed in by the caller.
#[derive(Debug, Clone, Copy)]
pub struct SearchContext {
    pub resolver_mode: ResolverMode,
    pub presign_ttl: Duration,
}

impl SearchContext {
    pub fn new(resolver_mode: ResolverMode, presign_ttl: Duration) -> Self {
        Self {
            resolver_mode,
            presign_ttl,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub state: SearchState,
    pub scanned: usize,
    pub results: Vec<SearchResult>,
}

/// Tracks one scan through `Idle -> Scanning -> Matched | Exhausted`.
struct Scan {
    state: SearchState,
    scanned: usize,
    results: Vec<SearchResult>,
}

impl Scan {
    fn new() -> Self {
        Self {
            state: SearchState::Idle,
            scanned: 0,
            results: Vec::new(),
        }
    }

    fn visit(&mut self) {
        self.state = SearchState::Scanning;
        self.scanned += 1;
    }

    fn matched(mut self, result: SearchResult) -> SearchOutcome {
        self.results.push(result);
        self.state = SearchState::Matched;
        self.finish()
    }

    fn exhausted(mut self) -> SearchOutcome {
        self.state = SearchState::Exhausted;
        self.finish()
    }

    fn finish(self) -> SearchOutcome {
        SearchOutcome {
            state: self.state,
            scanned: self.scanned,
            results: self.results,
        }
    }
}

#[derive(Clone)]
pub struct OrderSearch {
    storage: Arc<dyn ObjectStorage>,
    resolver: FolderResolver,
    matcher: DocumentMatcher,
    vocabulary: SearchVocabulary,
}

impl OrderSearch {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        extractor: Arc<dyn TextExtractor>,
        vocabulary: SearchVocabulary,
        folder_list_limit: usize,
        admin_scan_limit: usize,
    ) -> Self {
        let resolver = FolderResolver::new(storage.clone(), admin_scan_limit);
        let matcher = DocumentMatcher::new(
            storage.clone(),
            extractor,
            vocabulary.guide_tokens.clone(),
            folder_list_limit,
        );
        Self {
            storage,
            resolver,
            matcher,
            vocabulary,
        }
    }

    pub fn from_config(
        config: &AppConfig,
        storage: Arc<dyn ObjectStorage>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        Self::new(
            storage,
            extractor,
            config.vocabulary.clone(),
            config.folder_list_limit,
            config.admin_scan_limit,
        )
    }

    pub fn resolver(&self) -> &FolderResolver {
        &self.resolver
    }

    pub async fn run(
        &self,
        ctx: &SearchContext,
        orders: &[Order],
        query: &SearchQuery,
    ) -> SearchOutcome {
        match query {
            SearchQuery::Guide { keyword, client } => {
                self.by_guide(ctx, orders, keyword, client.as_deref()).await
            }
            SearchQuery::Client { name } => self.by_client(ctx, orders, name).await,
        }
    }

    /// Newest order first; stops at the first order with a guide containing `keyword`.
    pub async fn by_guide(
        &self,
        ctx: &SearchContext,
        orders: &[Order],
        keyword: &str,
        client: Option<&str>,
    ) -> SearchOutcome {
        let mut scan = Scan::new();
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return scan.exhausted();
        }

        let client_filter = client
            .map(normalize_client_name)
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        for order in orders.iter().rev() {
            if let Some(filter) = &client_filter {
                if !client_matches(&order.client, filter) {
                    continue;
                }
            }
            scan.visit();

            let Some(prefix) = self.resolver.resolve(&order.id, ctx.resolver_mode).await else {
                debug!(order_id = %order.id, "no folder for order; skipping");
                continue;
            };

            if let Some(hit) = self.matcher.find_matching(&prefix, keyword).await {
                info!(order_id = %order.id, key = %hit.object.key, %keyword, "guide search matched");
                let result = self.matched_result(ctx, order, prefix, hit).await;
                return scan.matched(result);
            }
        }

        info!(%keyword, scanned = scan.scanned, "guide search found no match");
        scan.exhausted()
    }

    /// Every order whose client contains `name`, ignoring case and accents.
    pub async fn by_client(
        &self,
        ctx: &SearchContext,
        orders: &[Order],
        name: &str,
    ) -> SearchOutcome {
        let mut scan = Scan::new();
        let query = normalize_client_name(name.trim());
        if query.is_empty() {
            return scan.exhausted();
        }

        for order in orders.iter().rev() {
            scan.visit();
            if !client_matches(&order.client, &query) {
                continue;
            }

            let Some(prefix) = self.resolver.resolve(&order.id, ctx.resolver_mode).await else {
                debug!(order_id = %order.id, "no folder for order; skipping");
                continue;
            };

            let result = self.folder_result(ctx, order, prefix).await;
            scan.results.push(result);
        }

        info!(
            client = %query,
            scanned = scan.scanned,
            results = scan.results.len(),
            "client search finished"
        );
        scan.exhausted()
    }

    /// Categorized files of a single order, or `None` when its folder is unknown.
    pub async fn order_files(&self, ctx: &SearchContext, order: &Order) -> Option<SearchResult> {
        let prefix = self.resolver.resolve(&order.id, ctx.resolver_mode).await?;
        Some(self.folder_result(ctx, order, prefix).await)
    }

    async fn matched_result(
        &self,
        ctx: &SearchContext,
        order: &Order,
        prefix: String,
        hit: DocumentMatch,
    ) -> SearchResult {
        let files = self.matcher.list_all(&prefix).await;
        let buckets = categorize(files, Some(hit.object.key.as_str()), &self.vocabulary, |file| {
            file.key.as_str()
        });

        SearchResult {
            order: order.clone(),
            waybill: extract_waybill(&hit.text),
            coincidentes: vec![self.link(ctx, hit.object).await],
            comprobantes: self.links(ctx, buckets.comprobantes).await,
            facturas: self.links(ctx, buckets.facturas).await,
            otros: self.links(ctx, buckets.otros).await,
            prefix,
        }
    }

    async fn folder_result(&self, ctx: &SearchContext, order: &Order, prefix: String) -> SearchResult {
        let files = self.matcher.list_all(&prefix).await;
        let buckets = categorize(files, None, &self.vocabulary, |file| file.key.as_str());

        SearchResult {
            order: order.clone(),
            waybill: None,
            coincidentes: Vec::new(),
            comprobantes: self.links(ctx, buckets.comprobantes).await,
            facturas: self.links(ctx, buckets.facturas).await,
            otros: self.links(ctx, buckets.otros).await,
            prefix,
        }
    }

    async fn links(&self, ctx: &SearchContext, objects: Vec<StoredObject>) -> Vec<FileLink> {
        let mut links = Vec::with_capacity(objects.len());
        for object in objects {
            links.push(self.link(ctx, object).await);
        }
        links
    }

    async fn link(&self, ctx: &SearchContext, object: StoredObject) -> FileLink {
        let url = match self
            .storage
            .presign_get_object(&object.key, ctx.presign_ttl)
            .await
        {
            Ok(url) => Some(url),
            Err(err) => {
                warn!(key = %object.key, error = %err, "failed to presign download link");
                None
            }
        };

        FileLink {
            name: object.file_name().to_string(),
            content_type: mime_guess::from_path(&object.key)
                .first_or_octet_stream()
                .to_string(),
            url,
            size: object.size,
            last_modified: object.last_modified,
            key: object.key,
        }
    }
}
