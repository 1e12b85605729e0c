//! murmur-adapter-redis - Redis 分布式缓存适配器

mod cache;
mod connection;

pub use cache::RedisCache;
pub use connection::{check_connection, create_connection_manager};
