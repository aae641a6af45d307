pub mod config;
pub mod error;
pub mod ingest;
pub mod query;
pub mod session;
pub mod storage;
pub mod types;
