use async_trait::async_trait;

use crate::midwares::app_state::AppError;
use super::record::MarketRecord;

/// Read side of the lending table.
///
/// Implementations return raw rows; the derived `borrowed` column and the
/// ranking are applied by [`crate::market::dashboard::Dashboard`].
#[async_trait]
pub trait MarketSource: Send + Sync {
  /// Distinct security names, sorted.
  async fn security_names(&self) -> Result<Vec<String>, AppError>;

  /// Every row in the most recent hour bucket, ordered by time then name.
  async fn latest_hour(&self) -> Result<Vec<MarketRecord>, AppError>;

  /// Up to `limit` most recent rows for one security, newest first.
  async fn security_window(&self, security_name: &str, limit: i64) -> Result<Vec<MarketRecord>, AppError>;

  async fn ping(&self) -> Result<(), AppError>;
}
