pub mod config;
pub mod market;
pub mod midwares;
pub mod route_handlers;

use axum::{http::HeaderValue, middleware, routing::get, Router};
use tower_http::{cors::{AllowOrigin, Any, CorsLayer}, services::{ServeDir, ServeFile}, trace::TraceLayer};
use tracing::{info, warn};

use midwares::app_state::{ip_tracker, AppState};
use route_handlers::dashboard::{health_handler, securities_handler, series_handler, top_tables_handler};

pub fn build_router(state: AppState) -> Router {
  let cors = match state.config.cors_allow_origin.as_deref().map(HeaderValue::from_str) {
    Some(Ok(origin)) => CorsLayer::new().allow_origin(AllowOrigin::exact(origin)).allow_methods(Any).allow_headers(Any),
    Some(Err(e)) => {
      warn!("ignoring invalid CORS_ALLOW_ORIGIN: {}", e);
      CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    },
    None => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
  };

  let static_dir = state.config.static_dir.clone();

  let mut app = Router::new()
    .route("/health", get(health_handler))
    .route("/api/securities", get(securities_handler))
    .route("/api/top", get(top_tables_handler))
    .route("/api/series", get(series_handler))
    .with_state(state);

  // single page app: unknown paths fall back to index.html
  if let Some(dir) = static_dir {
    info!("serving frontend from {}", dir.display());
    let index = dir.join("index.html");
    app = app.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
  }

  app
    .layer(middleware::from_fn(ip_tracker))
    .layer(TraceLayer::new_for_http())
    .layer(cors)
}
