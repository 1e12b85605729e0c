//! 分布式缓存 trait 定义

use async_trait::async_trait;
use murmur_errors::AppResult;
use std::time::Duration;

/// 分布式缓存 trait
///
/// 值为十进制整数字符串（包括哨兵值 "-1"）。
#[async_trait]
pub trait DistributedCache: Send + Sync {
    /// 获取缓存值，键不存在时返回 None
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// 设置缓存值和过期时间
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;
}
