use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::SearchResult,
    search::{resolver::ResolverMode, SearchOutcome, SearchQuery, SearchState},
    state::AppState,
};

pub const NO_MATCHES_MESSAGE: &str = "no matches found";
pub const NO_CLIENT_ORDERS_MESSAGE: &str = "no pedidos found for that client";

/// Message reported when a search of this kind comes back empty.
pub fn empty_message(query: &SearchQuery) -> &'static str {
    match query {
        SearchQuery::Guide { .. } => NO_MATCHES_MESSAGE,
        SearchQuery::Client { .. } => NO_CLIENT_ORDERS_MESSAGE,
    }
}

#[derive(Debug, Deserialize)]
pub struct GuideSearchQuery {
    pub keyword: Option<String>,
    pub client: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClientSearchQuery {
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub state: SearchState,
    pub scanned: usize,
    pub results: Vec<SearchResult>,
    pub message: Option<&'static str>,
}

impl SearchResponse {
    fn from_outcome(outcome: SearchOutcome, query: &SearchQuery) -> Self {
        let message = outcome.results.is_empty().then(|| empty_message(query));
        Self {
            state: outcome.state,
            scanned: outcome.scanned,
            results: outcome.results,
            message,
        }
    }
}

pub async fn search_by_guide(
    State(state): State<AppState>,
    Query(params): Query<GuideSearchQuery>,
) -> AppResult<Json<SearchResponse>> {
    guide_search(&state, params, ResolverMode::Standard).await
}

pub async fn admin_search_by_guide(
    State(state): State<AppState>,
    Query(params): Query<GuideSearchQuery>,
) -> AppResult<Json<SearchResponse>> {
    guide_search(&state, params, ResolverMode::Administrative).await
}

pub async fn search_by_client(
    State(state): State<AppState>,
    Query(params): Query<ClientSearchQuery>,
) -> AppResult<Json<SearchResponse>> {
    client_search(&state, params, ResolverMode::Standard).await
}

pub async fn admin_search_by_client(
    State(state): State<AppState>,
    Query(params): Query<ClientSearchQuery>,
) -> AppResult<Json<SearchResponse>> {
    client_search(&state, params, ResolverMode::Administrative).await
}

async fn guide_search(
    state: &AppState,
    params: GuideSearchQuery,
    mode: ResolverMode,
) -> AppResult<Json<SearchResponse>> {
    let keyword = non_blank(params.keyword)
        .ok_or_else(|| AppError::bad_request("keyword must not be empty"))?;
    let client = non_blank(params.client);

    let query = SearchQuery::Guide { keyword, client };

    let orders = state.load_orders().await?;
    let ctx = state.search_context(mode);
    let outcome = state.search.run(&ctx, &orders, &query).await;

    Ok(Json(SearchResponse::from_outcome(outcome, &query)))
}

async fn client_search(
    state: &AppState,
    params: ClientSearchQuery,
    mode: ResolverMode,
) -> AppResult<Json<SearchResponse>> {
    let name =
        non_blank(params.name).ok_or_else(|| AppError::bad_request("name must not be empty"))?;

    let query = SearchQuery::Client { name };

    let orders = state.load_orders().await?;
    let ctx = state.search_context(mode);
    let outcome = state.search.run(&ctx, &orders, &query).await;

    Ok(Json(SearchResponse::from_outcome(outcome, &query)))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
