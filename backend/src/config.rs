use std::{collections::HashMap, net::SocketAddr, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

use crate::{market::dashboard::DashboardSettings, midwares::postgres::TableName};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
  #[error("missing environment variable {0}")]
  Missing(String),
  #[error("invalid value for {0}: {1:?}")]
  Invalid(String, String),
  #[error("unreadable env file: {0}")]
  EnvFile(String),
}

#[derive(Debug, Clone)]
pub struct DbConfig {
  pub database: String,
  pub user: String,
  pub password: String,
  pub host: String,
  pub port: u16,
  pub table: TableName,
  pub max_connections: u32,
  pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
  pub db: DbConfig,
  pub bind_addr: SocketAddr,
  pub redis_url: Option<String>,
  pub redis_timeout: Duration,
  pub cache_timeout: Duration,
  pub series_limit: i64,
  pub top_k: usize,
  pub static_dir: Option<PathBuf>,
  pub cors_allow_origin: Option<String>,
}

impl Config {
  /// Reads `.env` (if present) and then the process environment. Keys set
  /// in the file win: login shells always export `USER`, which would
  /// otherwise shadow the database role.
  pub fn from_env() -> Result<Self, ConfigError> {
    let file = match dotenvy::dotenv_iter() {
      Ok(iter) => collect_env_file(iter)?,
      Err(e) if e.not_found() => HashMap::new(),
      Err(e) => return Err(ConfigError::EnvFile(e.to_string())),
    };
    Self::layered(file)
  }

  /// Same layering as `from_env` with an explicit file.
  pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let iter = dotenvy::from_path_iter(path.as_ref()).map_err(|e| ConfigError::EnvFile(e.to_string()))?;
    Self::layered(collect_env_file(iter)?)
  }

  fn layered(file: HashMap<String, String>) -> Result<Self, ConfigError> {
    Self::from_lookup(|key| file.get(key).cloned().or_else(|| std::env::var(key).ok()))
  }

  pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>
  {
    let optional = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let required = |key: &str| optional(key).ok_or_else(|| ConfigError::Missing(key.to_string()));
    let or_default = |key: &str, default: &str| optional(key).unwrap_or_else(|| default.to_string());

    let port = parse_value::<u16>("DB_PORT", &or_default("DB_PORT", "5432"))?;
    let max_connections = parse_value::<u32>("DB_MAX_CONNECTIONS", &or_default("DB_MAX_CONNECTIONS", "8"))?;
    let acquire_timeout_secs = parse_value::<u64>("DB_ACQUIRE_TIMEOUT_SECS", &or_default("DB_ACQUIRE_TIMEOUT_SECS", "10"))?;
    let table = TableName::parse(&or_default("SBL_TABLE", "npg_sgx_sbl_prd"))?;

    let db = DbConfig {
      database: required("DATABASE")?,
      user: optional("DB_USER").or_else(|| optional("USER")).ok_or_else(|| ConfigError::Missing("USER".into()))?,
      // empty passwords are legal for trust auth
      password: lookup("PASSWORD").ok_or_else(|| ConfigError::Missing("PASSWORD".into()))?,
      host: required("HOST")?,
      port,
      table,
      max_connections: positive("DB_MAX_CONNECTIONS", max_connections)?,
      acquire_timeout_secs,
    };

    let bind_addr = parse_value::<SocketAddr>("BIND_ADDR", &or_default("BIND_ADDR", "0.0.0.0:7575"))?;
    let cache_secs = parse_value::<u64>("CACHE_TIMEOUT_SECS", &or_default("CACHE_TIMEOUT_SECS", "7200"))?;
    let series_limit = parse_value::<i64>("SERIES_LIMIT", &or_default("SERIES_LIMIT", "141"))?;
    let top_k = parse_value::<usize>("TOP_K", &or_default("TOP_K", "15"))?;
    let redis_timeout_ms = parse_value::<u64>("REDIS_TIMEOUT_MS", &or_default("REDIS_TIMEOUT_MS", "500"))?;

    Ok(Self {
      db,
      bind_addr,
      redis_url: optional("REDIS_URL"),
      redis_timeout: Duration::from_millis(positive("REDIS_TIMEOUT_MS", redis_timeout_ms)?),
      cache_timeout: Duration::from_secs(positive("CACHE_TIMEOUT_SECS", cache_secs)?),
      series_limit: positive("SERIES_LIMIT", series_limit)?,
      top_k: positive("TOP_K", top_k)?,
      static_dir: optional("STATIC_DIR").map(PathBuf::from),
      cors_allow_origin: optional("CORS_ALLOW_ORIGIN"),
    })
  }

  pub fn dashboard_settings(&self) -> DashboardSettings {
    DashboardSettings {
      cache_timeout: self.cache_timeout,
      series_limit: self.series_limit,
      top_k: self.top_k,
    }
  }
}

fn collect_env_file<I>(iter: I) -> Result<HashMap<String, String>, ConfigError>
where
  I: Iterator<Item = Result<(String, String), dotenvy::Error>>
{
  iter
    .map(|item| item.map_err(|e| ConfigError::EnvFile(e.to_string())))
    .collect()
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
  raw.parse::<T>().map_err(|_| ConfigError::Invalid(key.to_string(), raw.to_string()))
}

fn positive<T: PartialOrd + Default + ToString>(key: &str, value: T) -> Result<T, ConfigError> {
  if value > T::default() {
    Ok(value)
  } else {
    Err(ConfigError::Invalid(key.to_string(), value.to_string()))
  }
}
