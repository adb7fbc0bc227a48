use alterego_server::api::{self, AppState};
use alterego_server::cache::ModelCache;
use alterego_server::config::Config;
use alterego_server::model::llama::LlamaRuntime;
use alterego_server::registry::ModelRegistry;
use dotenvy::dotenv;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cfg = <Config as clap::Parser>::parse();

    // logs
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let registry = match &cfg.model_catalog {
        Some(path) => ModelRegistry::from_json_file(path)?,
        None => ModelRegistry::builtin(),
    };

    // llama backend
    let runtime = LlamaRuntime::new(&cfg)?;
    let cache = ModelCache::new(Arc::new(runtime));

    let prometheus = PrometheusBuilder::new().install_recorder()?;

    let ids: Vec<&str> = registry.list().iter().map(|m| m.id.as_str()).collect();
    tracing::info!(device = %cache.device(), models_dir = %cfg.models_dir.display(), available = ?ids, "starting");

    let app = api::routes(AppState::new(registry, cache).with_metrics(prometheus));
    let listener = tokio::net::TcpListener::bind(cfg.bind_addr()).await?;

    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
