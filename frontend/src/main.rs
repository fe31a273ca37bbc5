#![allow(non_snake_case)]
mod pages;
mod components;
mod utils;

use components::template::Template;
use dioxus::prelude::*;
use pages::dashboard::Dashboard;

const ECHARTS_CDN: &str = "https://cdn.jsdelivr.net/npm/echarts@5.5.1/dist/echarts.min.js";

#[derive(Routable, PartialEq, Clone)]
enum Route {
  #[layout(Template)]
  #[route("/")]
  Dashboard {},
  #[route("/:..route")]
  PageNotFound { route: Vec<String> }
}

fn main() {
  dioxus::launch(App);
}

fn App() -> Element {
  static CSS: Asset = asset!("/assets/main.css");

  rsx! {
    document::Title { "Dashboard" }
    document::Stylesheet { href: CSS }
    document::Script { src: ECHARTS_CDN }
    Router::<Route> {}
  }
}

#[component]
fn PageNotFound(route: Vec<String>) -> Element {
  rsx! {
    h1 { "Page not found" }
    p { "We are terribly sorry, but the page you requested doesn't exist." }
    pre { color: "red", "log:\nattemped to navigate to: {route:?}" }
  }
}
