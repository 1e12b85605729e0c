//! murmur-session 服务入口

use std::net::SocketAddr;
use std::sync::Arc;

use murmur_adapter_mysql::MysqlRecordStore;
use murmur_adapter_redis::RedisCache;
use murmur_config::ConfigHandle;
use murmur_ports::{DistributedCache, RecordStore};
use murmur_session::api::{self, SessionService};
use murmur_session::cache::LocalCache;
use murmur_session::reload::ReloadCoordinator;
use murmur_session::resolver::SessionResolver;
use murmur_session::sweeper::ExpirySweeper;
use murmur_telemetry::{init_tracing, init_tracing_json};
use secrecy::ExposeSecret;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigHandle::load("config")?;
    let cfg = config.snapshot();

    if cfg.is_production() {
        init_tracing_json(&cfg.telemetry.log_level);
    } else {
        init_tracing(&cfg.telemetry.log_level);
    }

    info!(
        app_name = %cfg.app_name,
        version = env!("CARGO_PKG_VERSION"),
        "Starting session service"
    );
    info!(host = %cfg.server.host, port = cfg.server.port, "+ Server");
    info!(max_connections = cfg.database.max_connections, "+ Database");
    info!(
        max_entries = cfg.cache.max_entries,
        ttl_secs = cfg.cache.ttl_secs,
        sweep_interval_secs = cfg.cache.sweep_interval_secs,
        "+ Cache"
    );
    info!(
        expire_hours = cfg.session.expire_hours,
        clean_interval_minutes = cfg.session.clean_interval_minutes,
        "+ Session"
    );

    let redis_conn =
        murmur_adapter_redis::create_connection_manager(cfg.redis.url.expose_secret()).await?;
    let dcache: Arc<dyn DistributedCache> = Arc::new(RedisCache::new(redis_conn));

    let pool = murmur_adapter_mysql::create_pool(
        cfg.database.url.expose_secret(),
        cfg.database.max_connections,
    )
    .await?;
    let store: Arc<dyn RecordStore> = Arc::new(MysqlRecordStore::new(pool));

    let local = LocalCache::new(config.clone());
    let resolver = Arc::new(SessionResolver::new(local, dcache, store.clone()));

    let sweeper = ExpirySweeper::new(store.clone(), &cfg.session);
    if std::env::var("SESSION_DISABLE_SWEEPER").is_ok() {
        info!("Session sweeper is disabled");
    } else {
        sweeper.start();
    }
    let coordinator = Arc::new(ReloadCoordinator::new(config.clone(), store, sweeper));

    let service = Arc::new(SessionService::new(resolver, coordinator, config.clone()));
    let app = api::http::router(service);

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Session service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// 等待关闭信号
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
