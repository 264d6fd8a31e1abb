use actix_web::{App, HttpServer};
use anyhow::Context;
use storefront::config::AppConfig;
use storefront::state::AppState;
use storefront::web::configure_app;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("Configuration error")?;
    init_tracing(config.log_json);

    tracing::info!(data_dir = %config.data_dir.display(), "Starting storefront server...");

    let host = config.server_host.clone();
    let port = config.server_port;
    let state = AppState::initialise(config).context("Failed to open the store")?;
    let store_handle = state.clone();

    HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(move |cfg| configure_app(cfg, state))
    })
    .bind((host.as_str(), port))
    .with_context(|| format!("Failed to bind {host}:{port}"))?
    .run()
    .await?;

    let flushed = store_handle.store.flush().await?;
    tracing::info!(bytes = flushed, "Store flushed, shutting down.");
    Ok(())
}
