#![allow(non_snake_case)]

use dioxus::prelude::*;
use crate::utils::{server::MarketRecord, table::{columns, rows}};

#[component]
pub fn DataTable(title: String, records: ReadOnlySignal<Vec<MarketRecord>>) -> Element {
  let cols = use_memo(move || columns(&records()));
  let body = use_memo(move || rows(&records(), &cols()));

  rsx! {
    div {
      class: "table-card",
      h3 { "{title}" }
      if body().is_empty() {
        p { class: "table-empty", "No rows" }
      } else {
        div {
          class: "table-scroll",
          table {
            thead {
              tr {
                for col in cols() {
                  th { "{col}" }
                }
              }
            }
            tbody {
              for row in body() {
                tr {
                  for value in row {
                    td { "{value}" }
                  }
                }
              }
            }
          }
        }
      }
    }
  }
}
