pub mod cache;
pub mod handler;
