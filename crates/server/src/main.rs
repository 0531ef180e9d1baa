//! bundlecache server entry point.
//!
//! Boots the MCP server on stdio transport. Logging goes to stderr to avoid
//! interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use bundlecache_client::TimedFetcher;
use bundlecache_core::{AppConfig, AssetManifest, CacheDb, PolicyEngine};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;
use url::Url;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    let origin = Url::parse(&config.origin).with_context(|| format!("invalid origin {}", config.origin))?;
    let manifest = match &config.manifest_path {
        Some(path) => AssetManifest::load(path, &origin)?,
        None => AssetManifest::builtin(&origin)?,
    };

    tracing::info!(
        db_path = %config.db_path.display(),
        cache_tag = %config.cache_tag,
        assets = manifest.len(),
        "Starting bundlecache server on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let fetcher = Arc::new(TimedFetcher::from_config(&config)?);
    let engine = Arc::new(PolicyEngine::with_db(config, manifest, fetcher.clone(), db)?);

    engine.handle_startup().await?;
    let installer = engine.clone();
    tokio::spawn(async move {
        if let Err(e) = installer.handle_install().await {
            tracing::warn!(error = %e, "precache failed; assets will be cached on first use");
        }
    });

    let handler = handler::BundleCacheServer::new(engine, fetcher);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
