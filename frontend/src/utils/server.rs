use std::{collections::BTreeMap, fmt};
use chrono::NaiveDateTime;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize};

/// Blank means "same origin as the page".
const API_BASE_URL: Option<&str> = option_env!("API_BASE_URL");
const REFRESH_SECS: Option<&str> = option_env!("REFRESH_SECS");
const DEFAULT_REFRESH_SECS: u64 = 60;
const FALLBACK_ORIGIN: &str = "http://127.0.0.1:7575";

/* Server Responses */
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarketRecord {
  pub security_name: String,
  pub datetime: NaiveDateTime,
  pub lending_pool: Option<Decimal>,
  pub borrowing_rate: Option<Decimal>,
  #[serde(default)]
  pub extra: BTreeMap<String, serde_json::Value>,
  #[serde(default)]
  pub borrowed: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TopTables {
  pub as_of: Option<NaiveDateTime>,
  pub positive: Vec<MarketRecord>,
  pub negative: Vec<MarketRecord>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SecuritySeries {
  pub security_name: String,
  pub records: Vec<MarketRecord>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
  error: String,
}

// App Errors
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
  NoData(String),
  DataSourceUnavailable(String),
  ServerError(String),
  ReqwestError(String),
  DeserializeError(String),
  WasmError(String),
}

impl std::error::Error for AppError {}

impl fmt::Display for AppError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AppError::NoData(msg) => write!(f, "No data: {}", msg),
      AppError::DataSourceUnavailable(msg) => write!(f, "Data source unavailable: {}", msg),
      AppError::ServerError(msg) => write!(f, "Server error: {}", msg),
      AppError::ReqwestError(msg) => write!(f, "Reqwest error: {}", msg),
      AppError::DeserializeError(msg) => write!(f, "Deserialize error: {}", msg),
      AppError::WasmError(msg) => write!(f, "Wasm error: {}", msg),
    }
  }
}

impl AppError {
  fn from_status(status: StatusCode, body: &str) -> Self {
    let msg = serde_json::from_str::<ErrorBody>(body).map(|b| b.error).unwrap_or_else(|_| body.to_string());
    match status {
      StatusCode::NOT_FOUND => AppError::NoData(msg),
      StatusCode::SERVICE_UNAVAILABLE => AppError::DataSourceUnavailable(msg),
      _ => AppError::ServerError(format!("{} {}", status.as_u16(), msg)),
    }
  }
}

/// Seconds between top-table refreshes, `None` when the page loads once.
pub fn refresh_interval() -> Option<u64> {
  parse_refresh(REFRESH_SECS)
}

fn parse_refresh(raw: Option<&str>) -> Option<u64> {
  let secs = raw.and_then(|s| s.trim().parse::<u64>().ok()).unwrap_or(DEFAULT_REFRESH_SECS);
  (secs > 0).then_some(secs)
}

fn page_origin() -> Result<String, AppError> {
  let window = web_sys::window().ok_or_else(|| AppError::WasmError("no global window".into()))?;
  window.location().origin().map_err(|e| AppError::WasmError(format!("{:?}", e)))
}

#[derive(Debug, Clone)]
pub struct ApiClient {
  client: reqwest::Client,
  base_url: String,
}

impl ApiClient {
  pub fn new() -> Self {
    let base_url = match API_BASE_URL.map(str::trim).filter(|u| !u.is_empty()) {
      Some(url) => url.to_string(),
      None => page_origin().unwrap_or_else(|_| FALLBACK_ORIGIN.to_string()),
    };
    Self::with_base_url(base_url)
  }

  pub fn with_base_url(base_url: impl Into<String>) -> Self {
    let base_url = base_url.into().trim_end_matches('/').to_string();
    Self { client: reqwest::Client::new(), base_url }
  }

  pub fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, AppError> {
    let resp = self.client
      .get(self.url(path))
      .query(query)
      .send()
      .await
      .map_err(|e| AppError::ReqwestError(e.to_string()))?;

    let status = resp.status();
    let body = resp.text().await.map_err(|e| AppError::ReqwestError(e.to_string()))?;
    if !status.is_success() {
      return Err(AppError::from_status(status, &body));
    }
    serde_json::from_str(&body).map_err(|e| AppError::DeserializeError(e.to_string()))
  }

  pub async fn securities(&self) -> Result<Vec<String>, AppError> {
    self.get_json("/api/securities", &[]).await
  }

  pub async fn top_tables(&self) -> Result<TopTables, AppError> {
    self.get_json("/api/top", &[]).await
  }

  pub async fn series(&self, security_name: &str) -> Result<SecuritySeries, AppError> {
    self.get_json("/api/series", &[("security_name", security_name)]).await
  }
}
