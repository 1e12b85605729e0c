//! murmur-session - 会话解析服务
//!
//! 将不透明的会话令牌解析为用户 ID：本地缓存 → 分布式缓存 → 记录存储
//! 三级查询，未命中结果负缓存，后台任务批量清理过期记录。

pub mod api;
pub mod cache;
pub mod domain;
pub mod reload;
pub mod resolver;
pub mod sweeper;

#[cfg(test)]
pub(crate) mod testutil;
