use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use server::blob::build_blob_store;
use server::config::AppConfig;
use server::database::{ensure_indexes, init_db};
use server::repository::SeaOrmUploadRepository;
use server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = init_db(&config.database.url)
        .await
        .context("Failed to initialize database")?;
    ensure_indexes(&db).await?;

    let blob_store = build_blob_store(&config.storage)
        .await
        .context("Failed to initialize blob store")?;
    info!(backend = blob_store.backend(), "Blob store ready");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, blob_store, Arc::new(SeaOrmUploadRepository::new(db)));
    let app = server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
