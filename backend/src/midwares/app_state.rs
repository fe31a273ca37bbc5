use std::{net::SocketAddr, sync::Arc};
use axum::{
  extract::{ConnectInfo, Request}, http::StatusCode, middleware::Next, response::{IntoResponse, Response}, Json
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

use crate::{config::Config, market::dashboard::Dashboard};

// Request context containing IP information
#[derive(Clone, Debug)]
pub struct RequestContext {
  pub remote_ip: String,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AppError {
  #[error("no data for {0}")]
  NoData(String),
  #[error("bad request: {0}")]
  BadRequest(String),
  #[error("data source unavailable: {0}")]
  DataSourceUnavailable(String),
  #[error("query failed: {0}")]
  Query(String),
  #[error("internal error: {0}")]
  InternalError(String),
}

impl AppError {
  pub fn status(&self) -> StatusCode {
    match self {
      Self::NoData(_) => StatusCode::NOT_FOUND,
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::DataSourceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
      Self::Query(_) | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<sqlx::Error> for AppError {
  fn from(e: sqlx::Error) -> Self {
    match e {
      sqlx::Error::PoolTimedOut
      | sqlx::Error::PoolClosed
      | sqlx::Error::Io(_)
      | sqlx::Error::Tls(_)
      | sqlx::Error::WorkerCrashed => Self::DataSourceUnavailable(e.to_string()),
      sqlx::Error::Database(_)
      | sqlx::Error::RowNotFound
      | sqlx::Error::ColumnNotFound(_)
      | sqlx::Error::ColumnDecode { .. }
      | sqlx::Error::Decode(_)
      | sqlx::Error::TypeNotFound { .. } => Self::Query(e.to_string()),
      other => Self::InternalError(other.to_string()),
    }
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> axum::response::Response {
    let status = self.status();
    if status.is_server_error() {
      error!(%status, "request failed: {}", self);
    }

    let body = Json(json!({"error": self.to_string(), "code": status.as_u16()}));

    (status, body).into_response()
  }
}

/// Everything a handler needs, built once in `main` and dropped on shutdown.
#[derive(Clone)]
pub struct AppState {
  pub config: Arc<Config>,
  pub dashboard: Arc<Dashboard>,
}

impl AppState {
  pub fn new(config: Config, dashboard: Dashboard) -> Self {
    Self { config: Arc::new(config), dashboard: Arc::new(dashboard) }
  }
}

// IP tracking Middleware
pub async fn ip_tracker(
  ConnectInfo(addr): ConnectInfo<SocketAddr>,
  mut req: Request,
  next: Next
) -> Response {

  // proxy header first, socket address as fallback
  let remote_ip = req.headers()
    .get("x-forwarded-for")
    .and_then(|h| h.to_str().ok())
    .and_then(|h| h.split(',').next())
    .map(|h| h.trim().to_string())
    .filter(|h| !h.is_empty())
    .unwrap_or_else(|| addr.ip().to_string());
  debug!(%remote_ip, path = %req.uri().path(), "incoming request");

  req.extensions_mut().insert(RequestContext { remote_ip });

  next.run(req).await
}
