use std::cmp::Ordering;
use chrono::{DurationRound, NaiveDateTime, TimeDelta};

use super::record::MarketRecord;

/// Fills `borrowed` with the first-order difference of `lending_pool`,
/// taken in the order the slice is already in.
///
/// The first record never has a predecessor, so it stays `None`. A gap in
/// `lending_pool` on either side also yields `None`.
pub fn append_borrowed(records: &mut [MarketRecord]) {
  let mut prev = None;
  for record in records.iter_mut() {
    record.borrowed = match (prev, record.lending_pool) {
      (Some(p), Some(cur)) => cur.checked_sub(p),
      _ => None,
    };
    prev = record.lending_pool;
  }
}

/// Orders a single-security window for display: diff in ascending time,
/// then newest first.
pub fn order_window(mut records: Vec<MarketRecord>) -> Vec<MarketRecord> {
  records.sort_by(|a, b| (&a.security_name, a.datetime).cmp(&(&b.security_name, b.datetime)));
  append_borrowed(&mut records);
  records.sort_by(|a, b| b.datetime.cmp(&a.datetime));
  records
}

fn rank(records: &[MarketRecord], k: usize, cmp: impl Fn(&MarketRecord, &MarketRecord) -> Ordering) -> Vec<MarketRecord> {
  let mut rankable: Vec<&MarketRecord> = records.iter().filter(|r| r.borrowed.is_some()).collect();
  // stable sort: ties keep input order
  rankable.sort_by(|a, b| cmp(a, b));
  rankable.into_iter().take(k).cloned().collect()
}

/// The `k` records with the largest `borrowed`, largest first.
pub fn top_largest(records: &[MarketRecord], k: usize) -> Vec<MarketRecord> {
  rank(records, k, |a, b| b.borrowed.cmp(&a.borrowed))
}

/// The `k` records with the smallest `borrowed`, smallest first.
pub fn top_smallest(records: &[MarketRecord], k: usize) -> Vec<MarketRecord> {
  rank(records, k, |a, b| a.borrowed.cmp(&b.borrowed))
}

/// Hour bucket the latest snapshot belongs to.
pub fn snapshot_hour(records: &[MarketRecord]) -> Option<NaiveDateTime> {
  records
    .iter()
    .map(|r| r.datetime)
    .max()
    .and_then(|dt| dt.duration_trunc(TimeDelta::hours(1)).ok())
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::NaiveDate;
  use rand::{seq::SliceRandom, Rng};
  use rust_decimal::Decimal;
  use std::collections::HashSet;

  fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap().and_hms_opt(hour, minute, 0).unwrap()
  }

  fn rec(name: &str, dt: NaiveDateTime, pool: Option<i64>) -> MarketRecord {
    MarketRecord::new(name, dt, pool.map(Decimal::from), None)
  }

  fn with_borrowed(name: &str, borrowed: Option<i64>) -> MarketRecord {
    let mut r = rec(name, at(10, 0), Some(0));
    r.borrowed = borrowed.map(Decimal::from);
    r
  }

  #[test]
  fn first_record_has_no_borrowed() {
    let mut records = vec![rec("A", at(9, 0), Some(100)), rec("A", at(10, 0), Some(130)), rec("A", at(11, 0), Some(90))];
    append_borrowed(&mut records);
    let diffs: Vec<Option<Decimal>> = records.iter().map(|r| r.borrowed).collect();
    assert_eq!(diffs, vec![None, Some(Decimal::from(30)), Some(Decimal::from(-40))]);
  }

  #[test]
  fn gap_in_lending_pool_breaks_the_diff() {
    let mut records = vec![rec("A", at(9, 0), Some(100)), rec("A", at(10, 0), None), rec("A", at(11, 0), Some(90)), rec("A", at(12, 0), Some(95))];
    append_borrowed(&mut records);
    let diffs: Vec<Option<Decimal>> = records.iter().map(|r| r.borrowed).collect();
    assert_eq!(diffs, vec![None, None, None, Some(Decimal::from(5))]);
  }

  #[test]
  fn empty_input_is_fine() {
    let mut records: Vec<MarketRecord> = vec![];
    append_borrowed(&mut records);
    assert!(top_largest(&records, 15).is_empty());
    assert!(top_smallest(&records, 15).is_empty());
    assert_eq!(snapshot_hour(&records), None);
  }

  #[test]
  fn window_diffs_ascending_and_returns_descending() {
    // arrives newest first, the way the window query returns it
    let records = vec![rec("A", at(12, 0), Some(110)), rec("A", at(10, 0), Some(100)), rec("A", at(11, 0), Some(120))];
    let ordered = order_window(records);

    let times: Vec<NaiveDateTime> = ordered.iter().map(|r| r.datetime).collect();
    assert_eq!(times, vec![at(12, 0), at(11, 0), at(10, 0)]);

    let diffs: Vec<Option<Decimal>> = ordered.iter().map(|r| r.borrowed).collect();
    assert_eq!(diffs, vec![Some(Decimal::from(-10)), Some(Decimal::from(20)), None]);
  }

  #[test]
  fn top_k_orders_and_excludes_missing() {
    let records = vec![
      with_borrowed("A", Some(5)),
      with_borrowed("B", None),
      with_borrowed("C", Some(-3)),
      with_borrowed("D", Some(12)),
      with_borrowed("E", Some(0)),
    ];

    let largest = top_largest(&records, 3);
    let names: Vec<&str> = largest.iter().map(|r| r.security_name.as_str()).collect();
    assert_eq!(names, vec!["D", "A", "E"]);

    let smallest = top_smallest(&records, 15);
    let names: Vec<&str> = smallest.iter().map(|r| r.security_name.as_str()).collect();
    // fewer than k rankable rows: everything except the missing one
    assert_eq!(names, vec!["C", "E", "A", "D"]);
  }

  #[test]
  fn ties_keep_input_order() {
    let records = vec![with_borrowed("first", Some(7)), with_borrowed("second", Some(7)), with_borrowed("third", Some(1))];
    let largest = top_largest(&records, 2);
    assert_eq!(largest[0].security_name, "first");
    assert_eq!(largest[1].security_name, "second");

    let smallest = top_smallest(&records, 3);
    assert_eq!(smallest[1].security_name, "first");
    assert_eq!(smallest[2].security_name, "second");
  }

  #[test]
  fn largest_and_smallest_are_disjoint_past_thirty_distinct_values() {
    let mut rng = rand::rng();
    for _ in 0..50 {
      let n = rng.random_range(31..200);
      let mut values: Vec<i64> = (0..n as i64).map(|v| v * 3 - 100).collect();
      values.shuffle(&mut rng);

      let records: Vec<MarketRecord> = values
        .iter()
        .enumerate()
        .map(|(i, v)| with_borrowed(&format!("S{i}"), Some(*v)))
        .collect();

      let largest = top_largest(&records, 15);
      let smallest = top_smallest(&records, 15);
      assert_eq!(largest.len(), 15);
      assert_eq!(smallest.len(), 15);

      let big: HashSet<&str> = largest.iter().map(|r| r.security_name.as_str()).collect();
      let small: HashSet<&str> = smallest.iter().map(|r| r.security_name.as_str()).collect();
      assert!(big.is_disjoint(&small));
      assert!(big.union(&small).count() <= 30);

      let min_big = largest.iter().filter_map(|r| r.borrowed).min().unwrap();
      let max_small = smallest.iter().filter_map(|r| r.borrowed).max().unwrap();
      assert!(min_big > max_small);
    }
  }

  #[test]
  fn snapshot_hour_truncates_latest_timestamp() {
    let records = vec![rec("A", at(14, 5), Some(1)), rec("B", at(14, 45), Some(2))];
    assert_eq!(snapshot_hour(&records), Some(at(14, 0)));
  }
}
