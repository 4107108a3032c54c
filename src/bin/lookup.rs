use std::{env, sync::Arc, time::Duration};

use anyhow::{bail, Result};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use pedidos_search::{
    config::AppConfig,
    models::orders_from_rows,
    routes::search::empty_message,
    s3,
    search::{extract::PdfiumExtractor, resolver::ResolverMode},
    sheets::{GoogleSheetsStore, TabularStore},
    OrderSearch, SearchContext, SearchQuery,
};

const USAGE: &str = "Usage: lookup resolve <order_id> | lookup guide <keyword> | lookup client <name>";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let mut args = env::args().skip(1);
    let command = args.next();
    let argument = args.collect::<Vec<_>>().join(" ");

    match (command.as_deref(), argument.trim()) {
        (Some(_), "") | (None, _) => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
        (Some("resolve"), order_id) => resolve(order_id).await,
        (Some("guide"), keyword) => {
            search(SearchQuery::Guide {
                keyword: keyword.to_string(),
                client: None,
            })
            .await
        }
        (Some("client"), name) => {
            search(SearchQuery::Client {
                name: name.to_string(),
            })
            .await
        }
        (Some(cmd), _) => bail!("Unknown command: {cmd}\n{USAGE}"),
    }
}

async fn build_search(config: &AppConfig) -> Result<OrderSearch> {
    let storage = Arc::new(s3::build_storage(config).await?);
    Ok(OrderSearch::from_config(
        config,
        storage,
        Arc::new(PdfiumExtractor::new()),
    ))
}

async fn resolve(order_id: &str) -> Result<()> {
    let config = AppConfig::from_env()?;
    let search = build_search(&config).await?;
    let prefix = search
        .resolver()
        .resolve(order_id, ResolverMode::Administrative)
        .await;

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({ "order_id": order_id, "prefix": prefix }))?
    );
    Ok(())
}

async fn search(query: SearchQuery) -> Result<()> {
    let config = AppConfig::from_env()?;
    let search = build_search(&config).await?;
    let rows = GoogleSheetsStore::from_config(&config).list_rows().await?;
    let orders = orders_from_rows(&rows);

    let ctx = SearchContext::new(
        ResolverMode::Administrative,
        Duration::from_secs(config.presign_ttl_secs),
    );
    let outcome = search.run(&ctx, &orders, &query).await;
    if outcome.results.is_empty() {
        eprintln!("{}", empty_message(&query));
    }
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
