//! # StudioBook API Server
//!
//! HTTP server for booking recording studios and their equipment.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/studiobook \
//! JWT_SECRET=$(openssl rand -hex 32) \
//! REDIS_URL=redis://localhost:6379 \
//! cargo run -p studiobook-api
//! ```

use std::net::SocketAddr;
use studiobook_api::{
    app::{build_router, AppState},
    config::Config,
    middleware::rate_limit::RateLimiter,
};
use studiobook_shared::db::{
    migrations::run_migrations,
    pool::{close_pool, create_pool, DatabaseConfig},
};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "studiobook_api=debug,studiobook_shared=debug,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    init_tracing(config.is_production());
    install_panic_hook();

    tracing::info!(
        environment = ?config.api.environment,
        "StudioBook API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    if config.database.run_migrations {
        run_migrations(&pool).await?;
    }

    let rate_limiter = match config.rate_limit.redis_url.as_deref() {
        Some(url) => Some(
            RateLimiter::connect(
                url,
                config.rate_limit.window_secs,
                config.rate_limit.max_requests,
            )
            .await?,
        ),
        None => {
            tracing::warn!("REDIS_URL not set, rate limiting is disabled");
            None
        }
    };

    let address = config.bind_address();
    let mut state = AppState::new(pool.clone(), config);
    if let Some(limiter) = rate_limiter {
        state = state.with_rate_limiter(limiter);
    }
    let app = build_router(state);

    let listener = TcpListener::bind(&address).await?;
    tracing::info!(address = %address, "Listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}

/// JSON logs in production, human-readable output elsewhere
fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Routes panics outside request handlers through tracing as well
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        tracing::error!(panic = %info, location = %location, "Panic");
        default_hook(info);
    }));
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
