use dioxus::prelude::*;
use crate::Route;

#[component]
pub fn Template() -> Element {
  rsx! {
    Header { }
    Outlet::<Route> {}
    Footer { }
  }
}

#[component]
fn Header() -> Element {
  rsx!{
    nav {
      div {
        class: "nav-container",
        Link {
          class: "logo",
          active_class: "nav-active",
          to: Route::Dashboard { },
          "Dashboard",
        }
        p {
          class: "nav-subtitle",
          "Securities lending pool, borrowing rate and borrowed quantity"
        }
      }
    }
  }
}

#[component]
fn Footer() -> Element {
  rsx!{
    footer {
      div {
        class: "footer-container",
        div {
          class: "copyright",
          p { "Data: SGX securities borrowing and lending" }
        }
      }
    }
  }
}
