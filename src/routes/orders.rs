use axum::{
    extract::{Path, State},
    Json,
};
use tracing::debug;

use crate::{
    error::{AppError, AppResult},
    models::SearchResult,
    search::resolver::ResolverMode,
    state::AppState,
};

/// Categorized attachments of one order, resolved with the bucket-scan fallback.
pub async fn order_files(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> AppResult<Json<SearchResult>> {
    let orders = state.load_orders().await?;
    let order = orders
        .iter()
        .find(|order| order.id == order_id.trim())
        .ok_or_else(AppError::not_found)?;

    let ctx = state.search_context(ResolverMode::Administrative);
    match state.search.order_files(&ctx, order).await {
        Some(result) => Ok(Json(result)),
        None => {
            debug!(%order_id, "order has no attachment folder");
            Err(AppError::not_found())
        }
    }
}
