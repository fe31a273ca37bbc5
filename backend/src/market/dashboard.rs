use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

use crate::midwares::{app_state::AppError, cache::{series_key, CacheStore}};
use super::{
  metrics::{append_borrowed, order_window, snapshot_hour, top_largest, top_smallest},
  record::{SecuritySeries, TopTables},
  source::MarketSource,
};

#[derive(Debug, Clone)]
pub struct DashboardSettings {
  pub cache_timeout: Duration,
  pub series_limit: i64,
  pub top_k: usize,
}

impl Default for DashboardSettings {
  fn default() -> Self {
    Self { cache_timeout: Duration::from_secs(2 * 60 * 60), series_limit: 141, top_k: 15 }
  }
}

/// Glue between the table, the derived column and the result cache.
pub struct Dashboard {
  source: Arc<dyn MarketSource>,
  cache: Arc<dyn CacheStore>,
  settings: DashboardSettings,
}

impl Dashboard {
  pub fn new(source: Arc<dyn MarketSource>, cache: Arc<dyn CacheStore>, settings: DashboardSettings) -> Self {
    Self { source, cache, settings }
  }

  pub async fn security_names(&self) -> Result<Vec<String>, AppError> {
    self.source.security_names().await
  }

  /// Recomputed on every call; the refresh timer is the only caller.
  pub async fn top_tables(&self) -> Result<TopTables, AppError> {
    let mut latest = self.source.latest_hour().await?;
    append_borrowed(&mut latest);

    let tables = TopTables {
      as_of: snapshot_hour(&latest),
      positive: top_largest(&latest, self.settings.top_k),
      negative: top_smallest(&latest, self.settings.top_k),
    };
    info!(rows = latest.len(), positive = tables.positive.len(), negative = tables.negative.len(), "built top tables");
    Ok(tables)
  }

  /// Series for one security, served from cache while the entry is fresh.
  pub async fn security_series(&self, security_name: &str) -> Result<SecuritySeries, AppError> {
    if security_name.trim().is_empty() {
      return Err(AppError::BadRequest("security_name must not be blank".into()));
    }

    let key = series_key(security_name);
    match self.cache.get(&key).await {
      Ok(Some(bytes)) => match rmp_serde::from_slice::<SecuritySeries>(&bytes) {
        Ok(series) => {
          debug!(security_name, "series cache hit");
          return Ok(series);
        },
        Err(e) => warn!(security_name, "dropping undecodable cache entry: {}", e),
      },
      Ok(None) => debug!(security_name, "series cache miss"),
      Err(e) => warn!(security_name, "cache read failed, querying directly: {}", e),
    }

    let window = self.source.security_window(security_name, self.settings.series_limit).await?;
    if window.is_empty() {
      // not cached: the name may start reporting later
      return Err(AppError::NoData(security_name.to_string()));
    }

    let series = SecuritySeries {
      security_name: security_name.to_string(),
      records: order_window(window),
    };

    match rmp_serde::to_vec_named(&series) {
      Ok(bytes) => {
        if let Err(e) = self.cache.set(&key, bytes, self.settings.cache_timeout).await {
          warn!(security_name, "cache write failed: {}", e);
        }
      },
      Err(e) => warn!(security_name, "could not encode series for cache: {}", e),
    }

    Ok(series)
  }

  /// Liveness of the data source, for `/health`.
  pub async fn ping(&self) -> Result<(), AppError> {
    self.source.ping().await
  }
}
