pub mod app_state;
pub mod cache;
pub mod postgres;
