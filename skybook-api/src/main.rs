use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skybook_api::{app, AppState, AuthConfig};
use skybook_booking::BookingServices;
use skybook_core::payment::ApprovingGateway;
use skybook_core::SystemClock;
use skybook_store::{Config, DbClient, PostgresStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skybook_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Skybook API on port {}", config.server.port);

    let db = DbClient::new(&config.database)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    let services = BookingServices::new(
        Arc::new(PostgresStore::new(db.pool.clone())),
        Arc::new(ApprovingGateway),
        Arc::new(SystemClock),
        config.business_rules.clone(),
    );

    let app_state = AppState {
        services,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
        db: Some(db),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
