//! Redis 分布式缓存实现

use async_trait::async_trait;
use murmur_errors::{AppError, AppResult};
use murmur_ports::DistributedCache;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;

/// Redis 缓存
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl DistributedCache for RedisCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(key)
            .await
            .map_err(|e| AppError::internal(format!("Redis get failed: {}", e)))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let mut conn = self.conn.clone();
        conn.set_ex(key, value, ttl.as_secs())
            .await
            .map_err(|e| AppError::internal(format!("Redis set failed: {}", e)))
    }
}
