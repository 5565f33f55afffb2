use anyhow::Context;

use astro_infra::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    astro_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let services = astro_api::app::build_services(&config).await?;
    let app = astro_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
