pub mod server;
pub mod table;
