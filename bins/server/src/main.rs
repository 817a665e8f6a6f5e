//! Edumart API Server
//!
//! Main entry point for the earnings and payout backend.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use edumart_api::{AppState, FinanceService, create_router};
use edumart_db::{NotificationRepository, connect};
use edumart_shared::config::{CacheBackend, LogConfig};
use edumart_shared::email::{EmailService, LogMailer, Mailer};
use edumart_shared::jwt::JwtService;
use edumart_shared::{AppConfig, CacheStore, MokaCacheStore, RedisCacheStore};

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "edumart=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if log.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn cache_store(config: &AppConfig) -> anyhow::Result<Arc<dyn CacheStore>> {
    match config.cache.backend {
        CacheBackend::Moka => Ok(Arc::new(MokaCacheStore::new(config.cache.max_capacity))),
        CacheBackend::Redis => {
            let url = config
                .cache
                .redis_url
                .as_deref()
                .context("cache.redis_url is required for the redis backend")?;
            Ok(Arc::new(RedisCacheStore::connect(url)?))
        }
    }
}

fn mailer(config: &AppConfig) -> anyhow::Result<Arc<dyn Mailer>> {
    if config.email.enabled {
        info!(
            smtp_host = %config.email.smtp_host,
            smtp_port = %config.email.smtp_port,
            "Email service configured"
        );
        Ok(Arc::new(EmailService::new(config.email.clone())?))
    } else {
        warn!("Email delivery disabled, messages will be logged");
        Ok(Arc::new(LogMailer))
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.log);

    let db = connect(&config.database).await?;
    info!("Connected to database");

    let cache = cache_store(&config)?;
    info!(backend = ?config.cache.backend, "Cache configured");

    let notifications = Arc::new(NotificationRepository::new(db.clone()));
    let finance = FinanceService::new(
        &db,
        &config,
        cache,
        mailer(&config)?,
        notifications.clone(),
    );

    let state = AppState {
        db,
        jwt: Arc::new(JwtService::new(&config.jwt)),
        finance: Arc::new(finance),
        notifications,
    };

    let app = create_router(
        state,
        Duration::from_secs(config.server.request_timeout_secs),
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
