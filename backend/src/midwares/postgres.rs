use std::{collections::BTreeMap, fmt, time::Duration};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sqlx::{postgres::{PgConnectOptions, PgPoolOptions}, types::Json, FromRow, PgPool};
use tracing::info;

use crate::{config::{ConfigError, DbConfig}, market::{record::MarketRecord, source::MarketSource}};
use super::app_state::AppError;

/// A validated, quoted table identifier (`table` or `schema.table`).
///
/// Values always go through bind parameters; the table name is the only
/// piece of SQL text that comes from outside, so it is checked here.
#[derive(Debug, Clone, PartialEq)]
pub struct TableName(String);

impl TableName {
  pub fn parse(raw: &str) -> Result<Self, ConfigError> {
    let parts: Vec<&str> = raw.split('.').collect();
    if parts.is_empty() || parts.len() > 2 {
      return Err(ConfigError::Invalid("SBL_TABLE".into(), raw.to_string()));
    }

    let mut quoted = Vec::with_capacity(parts.len());
    for part in parts {
      let valid = part
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
      if !valid {
        return Err(ConfigError::Invalid("SBL_TABLE".into(), raw.to_string()));
      }
      quoted.push(format!("\"{}\"", part));
    }

    Ok(Self(quoted.join(".")))
  }
}

impl fmt::Display for TableName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

// governed columns are cast so any numeric storage type decodes to Decimal;
// everything else rides along as jsonb
const RECORD_COLUMNS: &str = "
  t.security_name::text AS security_name,
  t.datetime::timestamp AS datetime,
  t.lending_pool::numeric AS lending_pool,
  t.borrowing_rate::numeric AS borrowing_rate,
  to_jsonb(t) - 'security_name' - 'datetime' - 'lending_pool' - 'borrowing_rate' AS extra";

pub fn security_names_sql(table: &TableName) -> String {
  format!("SELECT DISTINCT security_name::text FROM {table} WHERE security_name IS NOT NULL ORDER BY 1")
}

pub fn latest_hour_sql(table: &TableName) -> String {
  format!(
    "WITH latest AS (SELECT date_trunc('hour', max(datetime::timestamp)) AS bucket FROM {table})
    SELECT {RECORD_COLUMNS}
    FROM {table} t, latest
    WHERE t.datetime::timestamp >= latest.bucket
      AND t.datetime::timestamp < latest.bucket + interval '1 hour'
    ORDER BY t.datetime, t.security_name"
  )
}

pub fn security_window_sql(table: &TableName) -> String {
  format!(
    "SELECT {RECORD_COLUMNS}
    FROM {table} t
    WHERE t.security_name = $1
      AND t.datetime IS NOT NULL
    ORDER BY t.datetime DESC
    LIMIT $2"
  )
}

#[derive(Debug, FromRow)]
struct MarketRow {
  security_name: String,
  datetime: NaiveDateTime,
  lending_pool: Option<Decimal>,
  borrowing_rate: Option<Decimal>,
  extra: Option<Json<BTreeMap<String, serde_json::Value>>>,
}

impl From<MarketRow> for MarketRecord {
  fn from(row: MarketRow) -> Self {
    Self {
      security_name: row.security_name,
      datetime: row.datetime,
      lending_pool: row.lending_pool,
      borrowing_rate: row.borrowing_rate,
      extra: row.extra.map(|j| j.0).unwrap_or_default(),
      borrowed: None,
    }
  }
}

#[derive(Clone)]
pub struct PostgresDBPool {
  pool: PgPool,
  names_sql: String,
  latest_sql: String,
  window_sql: String,
}

impl PostgresDBPool {
  /// Builds the pool lazily: no connection is opened until the first query,
  /// so the server starts even while the database is down.
  pub fn new(db: &DbConfig) -> Self {
    info!(host = %db.host, port = db.port, database = %db.database, "postgres db pool initializing");

    let options = PgConnectOptions::new()
      .host(&db.host)
      .port(db.port)
      .username(&db.user)
      .password(&db.password)
      .database(&db.database);

    let pool = PgPoolOptions::new()
      .max_connections(db.max_connections)
      .acquire_timeout(Duration::from_secs(db.acquire_timeout_secs))
      .connect_lazy_with(options);

    Self::with_pool(pool, &db.table)
  }

  pub fn with_pool(pool: PgPool, table: &TableName) -> Self {
    Self {
      pool,
      names_sql: security_names_sql(table),
      latest_sql: latest_hour_sql(table),
      window_sql: security_window_sql(table),
    }
  }

  pub async fn close(&self) {
    self.pool.close().await;
    info!("postgres db pool closed");
  }
}

#[async_trait]
impl MarketSource for PostgresDBPool {
  async fn security_names(&self) -> Result<Vec<String>, AppError> {
    let names = sqlx::query_scalar::<_, String>(&self.names_sql)
      .fetch_all(&self.pool)
      .await?;
    Ok(names)
  }

  async fn latest_hour(&self) -> Result<Vec<MarketRecord>, AppError> {
    let rows = sqlx::query_as::<_, MarketRow>(&self.latest_sql)
      .fetch_all(&self.pool)
      .await?;
    Ok(rows.into_iter().map(MarketRecord::from).collect())
  }

  async fn security_window(&self, security_name: &str, limit: i64) -> Result<Vec<MarketRecord>, AppError> {
    let rows = sqlx::query_as::<_, MarketRow>(&self.window_sql)
      .bind(security_name)
      .bind(limit)
      .fetch_all(&self.pool)
      .await?;
    Ok(rows.into_iter().map(MarketRecord::from).collect())
  }

  async fn ping(&self) -> Result<(), AppError> {
    sqlx::query("SELECT 1").execute(&self.pool).await?;
    Ok(())
  }
}
