// Trigger Archiver - batch archival of per-client trigger API responses

pub mod archiver;
pub mod auth;
pub mod clients;
pub mod config;
pub mod db;
pub mod models;
pub mod storage;
pub mod trigger;
pub mod types;

// Re-exports for convenience
pub use archiver::Archiver;
pub use config::Config;
pub use models::RunSummary;
pub use types::{AppError, AppResult};
