pub mod dashboard;
pub mod metrics;
pub mod record;
pub mod source;
