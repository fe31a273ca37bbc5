use std::{net::SocketAddr, sync::Arc};
use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sbl_dash_backend::{
  build_router,
  config::Config,
  market::dashboard::Dashboard,
  midwares::{app_state::AppState, cache::{CacheStore, MemoryCache, RedisCache}, postgres::PostgresDBPool},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,sqlx=warn".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = Config::from_env().context("loading configuration")?;

  let postgres = Arc::new(PostgresDBPool::new(&config.db));
  let cache: Arc<dyn CacheStore> = match &config.redis_url {
    Some(url) => Arc::new(RedisCache::new(url, config.redis_timeout).context("opening redis client")?),
    None => {
      info!("REDIS_URL not set, caching series in memory");
      Arc::new(MemoryCache::new())
    }
  };

  let dashboard = Dashboard::new(postgres.clone(), cache, config.dashboard_settings());
  let bind_addr = config.bind_addr;
  let app = build_router(AppState::new(config, dashboard));

  let listener = TcpListener::bind(bind_addr).await.with_context(|| format!("binding to {bind_addr}"))?;
  info!("dashboard listening on {}", bind_addr);

  axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("running server")?;

  postgres.close().await;
  info!("shutdown complete");
  Ok(())
}

async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      tracing::error!("failed to listen for ctrl-c: {}", e);
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
      Ok(mut sig) => { sig.recv().await; },
      Err(e) => {
        tracing::error!("failed to listen for SIGTERM: {}", e);
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
  info!("shutdown signal received");
}
