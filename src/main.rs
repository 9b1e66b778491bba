use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use auth_backend::{
    AppState,
    config::Config,
    routes::{self, user::PgUserRepository},
    session::{SessionManager, providers::memory},
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load configuration");

    // Providers must be registered before any manager is built.
    memory::register();

    let sessions = Arc::new(
        SessionManager::new(
            &config.session_provider,
            &config.session_cookie_name,
            config.session_max_idle_secs,
        )
        .expect("Failed to create session manager"),
    );
    let shutdown = CancellationToken::new();
    let gc = Arc::clone(&sessions).spawn_gc(shutdown.clone());

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'auth_backend';")
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    let state = AppState {
        config: config.clone(),
        users: Arc::new(PgUserRepository::new(pool)),
        sessions,
    };

    let router = routes::router(state);

    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        router,
    )
    .with_graceful_shutdown(shutdown_signal(shutdown))
    .await
    .expect("Failed to start server");

    if let Err(e) = gc.await {
        tracing::error!("session gc task failed: {}", e);
    }
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
    shutdown.cancel();
}
