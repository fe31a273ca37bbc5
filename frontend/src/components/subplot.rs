#![allow(non_snake_case)]

use charming::{component::{Axis, Grid, Title}, element::{AxisLabel, AxisPointer, AxisPointerType, AxisType, LineStyle, NameLocation, SplitLine, TextStyle, Tooltip, Trigger}, series::Line, Chart, WasmRenderer};
use dioxus::{logger::tracing::error, prelude::*};
use rust_decimal::{prelude::ToPrimitive, Decimal};

use crate::utils::server::MarketRecord;

static CANVAS_ID_SUBPLOTS: &str = "datetime-subplots";
const GRAPH_BG: &str = "#082255";
const GRAPH_LINE: &str = "#007ACE";
const TICK_FORMAT: &str = "%H:%M\n%b %d, %Y";
const PANEL_TITLES: [&str; 3] = ["Lending Pool", "Borrowing Rate", "Borrowed"];

/// Chart-ready columns, oldest point first.
#[derive(Debug, Clone, PartialEq)]
pub struct SubplotData {
  pub labels: Vec<String>,
  pub panels: [Vec<f64>; 3],
}

fn point(value: Option<Decimal>) -> f64 {
  value.and_then(|v| v.to_f64()).unwrap_or(f64::NAN)
}

impl SubplotData {
  pub fn from_records(records: &[MarketRecord]) -> Self {
    let mut ordered: Vec<&MarketRecord> = records.iter().collect();
    ordered.sort_by_key(|r| r.datetime);

    Self {
      labels: ordered.iter().map(|r| r.datetime.format(TICK_FORMAT).to_string()).collect(),
      panels: [
        ordered.iter().map(|r| point(r.lending_pool)).collect(),
        ordered.iter().map(|r| point(r.borrowing_rate)).collect(),
        ordered.iter().map(|r| point(r.borrowed)).collect(),
      ],
    }
  }
}

fn build_chart(security_name: &str, data: &SubplotData) -> Chart {
  let mut chart = Chart::new()
    .title(
      Title::new()
      .text(security_name)
      .left("center")
      .text_style(
        TextStyle::new()
        .color("#ffffff")
        .font_size(18)
      )
    )
    .background_color(GRAPH_BG)
    .tooltip(
      Tooltip::new()
      .trigger(Trigger::Axis)
      .axis_pointer(AxisPointer::new().type_(AxisPointerType::Cross))
    );

  // three stacked panels sharing one time axis
  for (idx, title) in PANEL_TITLES.iter().enumerate() {
    let top = 8 + idx * 31;
    chart = chart
      .grid(
        Grid::new()
        .left("8%")
        .right("4%")
        .top(format!("{}%", top))
        .height("22%")
      )
      .x_axis(
        Axis::new()
        .type_(AxisType::Category)
        .grid_index(idx as f64)
        .data(data.labels.clone())
        .axis_label(
          AxisLabel::new()
          .color("#cccccc")
        )
      )
      .y_axis(
        Axis::new()
        .type_(AxisType::Value)
        .grid_index(idx as f64)
        .name(*title)
        .name_location(NameLocation::Middle)
        .name_gap(60.0)
        .name_text_style(
          TextStyle::new()
          .color("#ffffff")
          .font_size(14)
        )
        .scale(true)
        .split_line(
          SplitLine::new()
          .line_style(
            LineStyle::new()
            .color("#1f3b73")
          )
        )
        .axis_label(
          AxisLabel::new()
          .color("#cccccc")
        )
      )
      .series(
        Line::new()
        .name(*title)
        .x_axis_index(idx as f64)
        .y_axis_index(idx as f64)
        .show_symbol(false)
        .line_style(
          LineStyle::new()
          .color(GRAPH_LINE)
        )
        .data(data.panels[idx].clone())
      );
  }
  chart
}

/// One window listener per page; it looks the chart up on each call, so a
/// remount or a not-yet-initialised chart needs nothing extra.
const RESIZE_HOOK: &str = r#"
            var millis = 150;
            setTimeout(function() {
                const element = document.getElementById('datetime-subplots');
                if (!element) { console.log('no subplot element found'); return; }
                if (window.sblSubplotResize) { return; }
                window.sblSubplotResize = function() {
                  const el = document.getElementById('datetime-subplots');
                  const chart = el && echarts.getInstanceByDom(el);
                  if (chart) { chart.resize(); }
                };
                window.addEventListener('resize', window.sblSubplotResize);
            }, millis);
          "#;

#[component]
pub fn DatetimeSubplots(security_name: ReadOnlySignal<String>, records: ReadOnlySignal<Vec<MarketRecord>>) -> Element {
  let renderer = use_signal(|| WasmRenderer::new_opt(None, None));

  use_effect(move || {
    let data = SubplotData::from_records(&records());
    let chart = build_chart(&security_name(), &data);

    if let Err(e) = renderer.read_unchecked().render(CANVAS_ID_SUBPLOTS, &chart) {
      error!("failed to render subplots: {:?}", e);
    }
  });

  rsx! {
    div {
      id: CANVAS_ID_SUBPLOTS,
      style: "height: 1000px; width: 100%;",
      onmounted: move |_evt| {
        document::eval(RESIZE_HOOK);
      }
    }
  }
}
