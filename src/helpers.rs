pub mod cache;
pub mod money;
