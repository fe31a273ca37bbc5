#![allow(non_snake_case)]

use std::time::Duration;
use dioxus::{logger::tracing::{info, warn}, prelude::*};

use crate::components::{subplot::DatetimeSubplots, table::DataTable};
use crate::utils::{server::{refresh_interval, ApiClient, AppError, TopTables}, table::fmt_datetime};

#[component]
pub fn Dashboard() -> Element {
  let api = use_hook(ApiClient::new);
  let mut selected = use_signal(|| None::<String>);
  let mut top = use_signal(|| None::<Result<TopTables, AppError>>);

  let securities = use_resource({
    let api = api.clone();
    move || {
      let api = api.clone();
      async move { api.securities().await }
    }
  });

  // default to the first name once the list arrives
  use_effect(move || {
    if let Some(Ok(names)) = &*securities.read() {
      if selected.peek().is_none() {
        selected.set(names.first().cloned());
      }
    }
  });

  let series = use_resource({
    let api = api.clone();
    move || {
      let api = api.clone();
      let name = selected();
      async move {
        match name {
          Some(name) => api.series(&name).await.map(Some),
          None => Ok(None),
        }
      }
    }
  });

  use_future({
    let api = api.clone();
    move || {
      let api = api.clone();
      async move {
        let interval = refresh_interval();
        loop {
          let result = api.top_tables().await;
          if let Err(e) = &result {
            warn!("top tables refresh failed: {}", e);
          }
          top.set(Some(result));
          match interval {
            Some(secs) => async_std::task::sleep(Duration::from_secs(secs)).await,
            None => {
              info!("refresh disabled, top tables loaded once");
              break;
            }
          }
        }
      }
    }
  });

  rsx! {
    div {
      class: "dashboard",
      section {
        class: "top-tables",
        h2 { "Top Values Tables" }
        match &*top.read() {
          None => rsx! { p { class: "loading", "Loading latest hour..." } },
          Some(Err(e)) => rsx! { p { class: "error", "{e}" } },
          Some(Ok(tables)) => {
            let as_of = tables.as_of.as_ref().map(fmt_datetime).unwrap_or_else(|| "no data".to_string());
            rsx! {
              p { class: "as-of", "As of {as_of}" }
              div {
                class: "table-row",
                DataTable { title: "Top 15 Positive Data".to_string(), records: tables.positive.clone() }
                DataTable { title: "Top 15 Negative Data".to_string(), records: tables.negative.clone() }
              }
            }
          }
        }
      }
      section {
        class: "subplots",
        h2 { "Datetime Subplots" }
        match &*securities.read() {
          None => rsx! { p { class: "loading", "Loading securities..." } },
          Some(Err(e)) => rsx! { p { class: "error", "{e}" } },
          Some(Ok(names)) if names.is_empty() => rsx! { p { class: "error", "No securities available" } },
          Some(Ok(names)) => rsx! {
            select {
              class: "security-select",
              value: selected().unwrap_or_default(),
              onchange: move |evt| selected.set(Some(evt.value())),
              for name in names.iter() {
                option { key: "{name}", value: "{name}", "{name}" }
              }
            }
          }
        }
        match &*series.read() {
          None => rsx! { p { class: "loading", "Loading series..." } },
          Some(Ok(None)) => rsx! {},
          Some(Ok(Some(series))) => rsx! {
            DatetimeSubplots { security_name: series.security_name.clone(), records: series.records.clone() }
            DataTable { title: format!("{} series", series.security_name), records: series.records.clone() }
          },
          Some(Err(AppError::NoData(_))) => rsx! { p { class: "empty", "No data for selection" } },
          Some(Err(e)) => rsx! { p { class: "error", "{e}" } },
        }
      }
    }
  }
}
