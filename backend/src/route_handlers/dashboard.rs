use axum::{extract::{Query, State}, http::StatusCode, response::IntoResponse, Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
  market::record::{SecuritySeries, TopTables},
  midwares::app_state::{AppError, AppState, RequestContext}
};

#[derive(Debug, Deserialize)]
pub struct SeriesQuery {
  pub security_name: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HealthCheckResponse {
  pub code: u16,
  pub status: String,
}

pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
  match state.dashboard.ping().await {
    Ok(()) => (StatusCode::OK, Json(HealthCheckResponse { code: 200, status: "ok".into() })),
    Err(e) => {
      warn!("health check failed: {}", e);
      (StatusCode::SERVICE_UNAVAILABLE, Json(HealthCheckResponse { code: 503, status: "database unreachable".into() }))
    }
  }
}

pub async fn securities_handler(
  State(state): State<AppState>,
) -> Result<Json<Vec<String>>, AppError> {
  let names = state.dashboard.security_names().await?;
  Ok(Json(names))
}

pub async fn top_tables_handler(
  State(state): State<AppState>,
  Extension(req_ctx): Extension<RequestContext>,
) -> Result<Json<TopTables>, AppError> {
  info!(remote_ip = %req_ctx.remote_ip, "top tables requested");
  let tables = state.dashboard.top_tables().await?;
  Ok(Json(tables))
}

pub async fn series_handler(
  State(state): State<AppState>,
  Extension(req_ctx): Extension<RequestContext>,
  Query(query): Query<SeriesQuery>,
) -> Result<Json<SecuritySeries>, AppError> {
  info!(remote_ip = %req_ctx.remote_ip, security_name = %query.security_name, "series requested");
  let series = state.dashboard.security_series(&query.security_name).await?;
  Ok(Json(series))
}
