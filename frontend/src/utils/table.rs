use std::collections::BTreeSet;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::server::MarketRecord;

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Header row for a set of records: fixed columns, then every extra column
/// seen in any row (sorted), then `borrowed`.
pub fn columns(records: &[MarketRecord]) -> Vec<String> {
  let extra: BTreeSet<&String> = records.iter().flat_map(|r| r.extra.keys()).collect();

  let mut cols: Vec<String> = ["security_name", "datetime", "lending_pool", "borrowing_rate"]
    .iter()
    .map(|c| c.to_string())
    .collect();
  cols.extend(extra.into_iter().cloned());
  cols.push("borrowed".to_string());
  cols
}

pub fn fmt_decimal(value: Option<Decimal>) -> String {
  value.map(|v| v.normalize().to_string()).unwrap_or_default()
}

pub fn fmt_datetime(dt: &NaiveDateTime) -> String {
  dt.format(DATETIME_FORMAT).to_string()
}

fn fmt_json(value: Option<&serde_json::Value>) -> String {
  match value {
    None | Some(serde_json::Value::Null) => String::new(),
    Some(serde_json::Value::String(s)) => s.clone(),
    Some(other) => other.to_string(),
  }
}

pub fn cell(record: &MarketRecord, column: &str) -> String {
  match column {
    "security_name" => record.security_name.clone(),
    "datetime" => fmt_datetime(&record.datetime),
    "lending_pool" => fmt_decimal(record.lending_pool),
    "borrowing_rate" => fmt_decimal(record.borrowing_rate),
    "borrowed" => fmt_decimal(record.borrowed),
    other => fmt_json(record.extra.get(other)),
  }
}

/// One row of display strings per record, aligned with `columns`.
pub fn rows(records: &[MarketRecord], columns: &[String]) -> Vec<Vec<String>> {
  records.iter().map(|r| columns.iter().map(|c| cell(r, c)).collect()).collect()
}
