use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use tokio::{net::TcpListener, signal};
use tracing_subscriber::EnvFilter;

use pedidos_search::{
    config::AppConfig,
    routes, s3,
    search::extract::PdfiumExtractor,
    sheets::{CachedTabularStore, GoogleSheetsStore},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "server",
        s3_bucket = %config.s3_bucket,
        spreadsheet = %config.sheets_spreadsheet_id,
        sheet_range = %config.sheets_range,
        sheet_auth = config.sheets_auth_mode(),
        orders_cache_ttl_secs = config.orders_cache_ttl_secs,
        "loaded search configuration"
    );

    let storage = Arc::new(s3::build_storage(&config).await?);
    let sheet = Arc::new(CachedTabularStore::new(
        GoogleSheetsStore::from_config(&config),
        Duration::from_secs(config.orders_cache_ttl_secs),
    ));
    let extractor = Arc::new(PdfiumExtractor::new());

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port)
        .parse()
        .context("SERVER_HOST/SERVER_PORT do not form a socket address")?;
    let state = AppState::new(config, sheet, storage, extractor);
    let app = routes::create_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "search server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
            tracing::info!("server received shutdown signal");
        })
        .await
        .context("server error")?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
