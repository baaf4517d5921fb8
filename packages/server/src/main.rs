use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use mq::{MqConfig, init_mq};
use server::config::AppConfig;
use server::database;
use server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = AppConfig::load().context("Failed to load config")?;

    let db = database::init_db(&config.database.url)
        .await
        .context("Failed to initialize database")?;
    database::ensure_indexes(&db)
        .await
        .context("Failed to ensure indexes")?;

    let mq = if config.mq.enabled {
        let queue = init_mq(MqConfig {
            url: config.mq.url.clone(),
            pool_size: config.mq.pool_size,
        })
        .await
        .context("Failed to initialize MQ")?;
        info!(queue_name = %config.mq.queue_name, "MQ connected");
        Some(Arc::new(queue))
    } else {
        info!("MQ disabled, submissions will not be judged");
        None
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState {
        db,
        config,
        mq,
    };
    let app = server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
