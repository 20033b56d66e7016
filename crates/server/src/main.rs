use anyhow::Context;
use deployment::{Deployment, DeploymentConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    utils::log::init("info,sqlx=warn,tower_http=info");

    let config = DeploymentConfig::from_env()?;
    let addr = config.bind_address();
    let deployment = Deployment::new(config)
        .await
        .context("failed to initialise deployment")?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Gallery server listening on http://{}", addr);

    axum::serve(listener, server::router(deployment))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gallery server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
