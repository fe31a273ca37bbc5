pub mod subplot;
pub mod table;
pub mod template;
