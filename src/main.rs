use interior_genie::{
    config::Config,
    palette::{ColorAnalyzer, HostedColorAnalyzer, PaletteService},
    pipeline::Pipeline,
    routes::{router, AppState},
    store::TestResponseStore,
    vertex::{OfflineTextGenerator, TextGenerator, VertexClient},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("❌ Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("👋 Shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;
    tracing::info!(
        project = %config.project_id,
        location = %config.location,
        test_mode = config.test_mode,
        "Loaded configuration"
    );

    let vertex = Arc::new(VertexClient::new(&config)?);
    let text: Arc<dyn TextGenerator> = if config.test_mode && config.access_token.is_none() {
        tracing::warn!("⚠️ TEST_MODE without GOOGLE_CLOUD_ACCESS_TOKEN, using offline design text");
        Arc::new(OfflineTextGenerator) as Arc<dyn TextGenerator>
    } else {
        vertex.clone() as Arc<dyn TextGenerator>
    };
    let hosted_colors: Option<Arc<dyn ColorAnalyzer>> = if config.test_mode {
        None
    } else {
        Some(Arc::new(HostedColorAnalyzer::new(vertex.clone())) as Arc<dyn ColorAnalyzer>)
    };

    let store = TestResponseStore::new(
        &config.test_responses_dir,
        config.test_mode && !config.per_request_test_responses,
    );
    let pipeline = Pipeline::new(text, vertex, store, config.test_mode, &config.output_root);

    let state = AppState {
        store: Arc::default(),
        pipeline: Arc::new(pipeline),
        palettes: Arc::new(PaletteService::new(hosted_colors)),
    };

    let app = router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}
