use std::{sync::{atomic::{AtomicUsize, Ordering}, Arc}, time::Duration};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tokio::{net::TcpListener, time::{timeout, Instant}};

use sbl_dash_backend::{
  market::{dashboard::{Dashboard, DashboardSettings}, record::MarketRecord, source::MarketSource},
  midwares::{app_state::AppError, cache::{CacheError, CacheStore, RedisCache}},
};

const OP_TIMEOUT: Duration = Duration::from_millis(200);

/// Accepts connections and holds them open without ever replying.
async fn silent_redis() -> String {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    let mut held = Vec::new();
    while let Ok((socket, _)) = listener.accept().await {
      held.push(socket);
    }
  });
  format!("redis://{}", addr)
}

struct OneSecurity {
  window_calls: AtomicUsize,
}

#[async_trait]
impl MarketSource for OneSecurity {
  async fn security_names(&self) -> Result<Vec<String>, AppError> {
    Ok(vec!["D05".into()])
  }

  async fn latest_hour(&self) -> Result<Vec<MarketRecord>, AppError> {
    Ok(vec![])
  }

  async fn security_window(&self, security_name: &str, _limit: i64) -> Result<Vec<MarketRecord>, AppError> {
    self.window_calls.fetch_add(1, Ordering::SeqCst);
    let day = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
    Ok(vec![
      MarketRecord::new(security_name, day.and_hms_opt(10, 0, 0).unwrap(), Some(Decimal::from(480)), None),
      MarketRecord::new(security_name, day.and_hms_opt(9, 0, 0).unwrap(), Some(Decimal::from(500)), None),
    ])
  }

  async fn ping(&self) -> Result<(), AppError> {
    Ok(())
  }
}

#[tokio::test]
async fn unresponsive_redis_times_out_instead_of_hanging() {
  let cache = RedisCache::new(&silent_redis().await, OP_TIMEOUT).unwrap();

  let started = Instant::now();
  let read = timeout(Duration::from_secs(5), cache.get("sbl:series:abc")).await.expect("get stalled");
  assert!(matches!(read, Err(CacheError::Timeout(_)) | Err(CacheError::Redis(_))), "got {read:?}");

  let write = timeout(Duration::from_secs(5), cache.set("sbl:series:abc", vec![1], Duration::from_secs(60)))
    .await
    .expect("set stalled");
  assert!(write.is_err());
  assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn series_falls_through_to_the_database_when_redis_is_silent() {
  let source = Arc::new(OneSecurity { window_calls: AtomicUsize::new(0) });
  let cache = Arc::new(RedisCache::new(&silent_redis().await, OP_TIMEOUT).unwrap());
  let dash = Dashboard::new(source.clone(), cache, DashboardSettings::default());

  let series = timeout(Duration::from_secs(5), dash.security_series("D05"))
    .await
    .expect("series request stalled on the cache")
    .unwrap();
  assert_eq!(series.records.len(), 2);
  assert_eq!(series.records[0].borrowed, Some(Decimal::from(-20)));

  // still served, and still from the source, on the next request
  let again = timeout(Duration::from_secs(5), dash.security_series("D05")).await.expect("second request stalled").unwrap();
  assert_eq!(again, series);
  assert_eq!(source.window_calls.load(Ordering::SeqCst), 2);
}
