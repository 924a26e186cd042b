use anyhow::Context;
use axum::middleware::from_fn;
use claims_assistant_service::{
    ServiceConfig, build_router, correlation_id_middleware, create_app_state, init_tracing,
    telemetry::DEFAULT_FILTER,
};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env().context("Invalid service configuration")?;
    init_tracing(config.log_format, DEFAULT_FILTER);

    let state = create_app_state(&config).context("Failed to build the flow catalog")?;
    let app = build_router(state).layer(from_fn(correlation_id_middleware));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    info!(port = config.port, "Claims assistant service listening");

    axum::serve(listener, app).await?;
    Ok(())
}
