//! MySQL 连接池管理

use murmur_errors::{AppError, AppResult};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::time::Duration;

/// 创建 MySQL 连接池
pub async fn create_pool(url: &str, max_connections: u32) -> AppResult<MySqlPool> {
    MySqlPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(url)
        .await
        .map_err(|e| AppError::database(format!("Failed to create MySQL pool: {}", e)))
}
