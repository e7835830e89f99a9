use std::sync::Arc;

use anyhow::Context;
use movies_api::{
    AppState,
    auth::BearerToken,
    boxoffice::HttpBoxOfficeClient,
    build_router,
    config::Config,
    db::{self, PoolOptions},
    enrichment::Enricher,
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,movies_api=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Config::from_env().context("failed to load configuration")?;

    let db = db::connect_and_migrate(&config.database_url, &PoolOptions::from(&config))
        .await
        .context("failed to open database")?;

    let http = reqwest::Client::builder()
        .user_agent("movies-api/0.1")
        .connect_timeout(config.boxoffice_timeout)
        .timeout(config.boxoffice_timeout)
        .build()?;
    let provider = HttpBoxOfficeClient::new(
        http,
        config.boxoffice_url.clone(),
        config.boxoffice_api_key.clone(),
        config.boxoffice_rps,
    );
    let enricher = Enricher::new(Arc::new(provider), config.boxoffice_timeout);

    let state = Arc::new(AppState::new(
        db,
        enricher,
        BearerToken::new(config.auth_token.clone()),
        config.health_timeout,
    ));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.addr))?;
    info!(addr = %config.addr, "listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "unable to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(err) => {
                error!(error = %err, "unable to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
