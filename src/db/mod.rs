use crate::config::DatabaseConfig;
use crate::types::{AppError, AppResult};
use sqlx::postgres::{PgPool, PgPoolOptions};

pub mod operations;

pub use operations::*;

pub async fn create_pool(config: &DatabaseConfig) -> AppResult<PgPool> {
    let url = config
        .url
        .as_deref()
        .ok_or_else(|| AppError::Config("DATABASE_URL is not set".to_string()))?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect(url)
        .await?;

    // Test connection
    sqlx::query("SELECT 1").fetch_one(&pool).await?;

    Ok(pool)
}
