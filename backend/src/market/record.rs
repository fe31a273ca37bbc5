use std::collections::BTreeMap;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One row of the lending table.
///
/// `extra` carries every column the dashboard does not interpret so the
/// tables can still show them. `borrowed` is the only field written after
/// retrieval (see [`crate::market::metrics::append_borrowed`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
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

impl MarketRecord {
  pub fn new(security_name: &str, datetime: NaiveDateTime, lending_pool: Option<Decimal>, borrowing_rate: Option<Decimal>) -> Self {
    Self {
      security_name: security_name.to_string(),
      datetime,
      lending_pool,
      borrowing_rate,
      extra: BTreeMap::new(),
      borrowed: None,
    }
  }
}

/// Payload of the two ranked tables built from the latest hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopTables {
  pub as_of: Option<NaiveDateTime>,
  pub positive: Vec<MarketRecord>,
  pub negative: Vec<MarketRecord>,
}

/// Chart + table payload for one security, newest row first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecuritySeries {
  pub security_name: String,
  pub records: Vec<MarketRecord>,
}
