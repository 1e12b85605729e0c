//! 有界 TTL 本地缓存
//!
//! 读取时惰性判断过期；容量满时随机淘汰一项（有意不做 LRU）。
//! 后台 janitor 定期两阶段清理过期项：读锁下收集，写锁下复查后删除，
//! 写锁持有时间只覆盖实际删除。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use murmur_config::ConfigHandle;
use parking_lot::RwLock;
use rand::Rng;
use tokio::time::Instant;

use crate::domain::CachedUid;

const JANITOR_STARTUP_DELAY: Duration = Duration::from_secs(1);

struct Entry {
    value: CachedUid,
    expires_at: Instant,
}

/// 本地缓存
///
/// TTL 与最大容量在每次写入时从配置句柄读取，修改配置后对新写入
/// 立即生效，无需重启。
pub struct LocalCache {
    items: RwLock<HashMap<String, Entry>>,
    config: ConfigHandle,
}

impl LocalCache {
    /// 创建缓存并启动 janitor 任务
    ///
    /// janitor 持有弱引用，缓存被丢弃后自行退出。
    pub fn new(config: ConfigHandle) -> Arc<Self> {
        let cache = Arc::new(Self {
            items: RwLock::new(HashMap::new()),
            config,
        });
        Self::spawn_janitor(&cache);
        cache
    }

    /// 读取缓存值；键不存在或已过期时返回 None
    ///
    /// 过期项不在读取路径上删除。
    pub fn get(&self, key: &str) -> Option<CachedUid> {
        let now = Instant::now();
        let items = self.items.read();
        match items.get(key) {
            Some(entry) if now < entry.expires_at => Some(entry.value),
            _ => None,
        }
    }

    /// 写入缓存值，重置过期时间
    ///
    /// 新键在容量已满时先随机淘汰一个现有键；已存在的键只覆盖。
    pub fn set(&self, key: &str, value: CachedUid) {
        let cfg = self.config.cache();
        let expires_at = Instant::now() + Duration::from_secs(cfg.ttl_secs);

        let mut items = self.items.write();
        if items.len() >= cfg.max_entries && !items.contains_key(key) {
            Self::evict_random(&mut items);
        }
        items.insert(key.to_string(), Entry { value, expires_at });
    }

    /// 删除一个键；不存在时为空操作
    pub fn delete(&self, key: &str) {
        self.items.write().remove(key);
    }

    /// 随机淘汰一个缓存项；调用方必须已持有写锁
    fn evict_random(items: &mut HashMap<String, Entry>) {
        if items.is_empty() {
            return;
        }
        let keys: Vec<String> = items.keys().cloned().collect();
        let idx = rand::thread_rng().gen_range(0..keys.len());
        items.remove(&keys[idx]);
    }

    /// 两阶段清理过期项
    fn purge_expired(&self) {
        let now = Instant::now();

        // 第一阶段：读锁下收集过期键
        let expired: Vec<String> = {
            let items = self.items.read();
            items
                .iter()
                .filter(|(_, entry)| now >= entry.expires_at)
                .map(|(key, _)| key.clone())
                .collect()
        };

        if expired.is_empty() {
            return;
        }

        // 第二阶段：写锁下复查过期时间，两阶段之间被刷新的项保留
        let mut items = self.items.write();
        for key in &expired {
            if let Some(entry) = items.get(key) {
                if now >= entry.expires_at {
                    items.remove(key);
                }
            }
        }
    }

    fn spawn_janitor(cache: &Arc<Self>) {
        let weak = Arc::downgrade(cache);
        tokio::spawn(async move {
            tokio::time::sleep(JANITOR_STARTUP_DELAY).await;
            loop {
                // 清理周期每轮重新读取配置
                let interval = match weak.upgrade() {
                    Some(cache) => Duration::from_secs(cache.config.cache().sweep_interval_secs),
                    None => return,
                };
                tokio::time::sleep(interval).await;
                match weak.upgrade() {
                    Some(cache) => cache.purge_expired(),
                    None => return,
                }
            }
        });
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.items.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::test_config;

    fn test_handle(ttl_secs: u64, max_entries: usize, sweep_interval_secs: u64) -> ConfigHandle {
        let mut config = test_config();
        config.cache.ttl_secs = ttl_secs;
        config.cache.max_entries = max_entries;
        config.cache.sweep_interval_secs = sweep_interval_secs;
        ConfigHandle::from_config(config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_before_and_after_ttl() {
        let cache = LocalCache::new(test_handle(5, 100, 3600));
        cache.set("k", CachedUid::Uid(7));

        assert_eq!(cache.get("k"), Some(CachedUid::Uid(7)));

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(cache.get("k"), Some(CachedUid::Uid(7)));

        // 恰好到达 TTL 即视为过期
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("k"), None);
        // 惰性过期：条目仍占据容量，直到 janitor 清理
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_at_capacity() {
        let cache = LocalCache::new(test_handle(60, 3, 3600));
        cache.set("a", CachedUid::Uid(1));
        cache.set("b", CachedUid::Uid(2));
        cache.set("c", CachedUid::Uid(3));
        assert_eq!(cache.len(), 3);

        // 新键触发淘汰恰好一项，总数不变
        cache.set("d", CachedUid::Uid(4));
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get("d"), Some(CachedUid::Uid(4)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_does_not_evict() {
        let cache = LocalCache::new(test_handle(5, 2, 3600));
        cache.set("a", CachedUid::Uid(1));
        cache.set("b", CachedUid::Uid(2));

        tokio::time::advance(Duration::from_secs(4)).await;

        // 已存在的键在容量满时只覆盖并重置 TTL
        cache.set("a", CachedUid::Uid(10));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("b"), Some(CachedUid::Uid(2)));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get("a"), Some(CachedUid::Uid(10)));
        assert_eq!(cache.get("b"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_is_unconditional() {
        let cache = LocalCache::new(test_handle(60, 100, 3600));
        cache.set("k", CachedUid::Invalid);
        cache.delete("k");
        assert_eq!(cache.get("k"), None);
        // 不存在的键为空操作
        cache.delete("missing");
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_removes_expired_keeps_refreshed() {
        let cache = LocalCache::new(test_handle(5, 100, 3600));
        cache.set("stale", CachedUid::Uid(1));
        cache.set("fresh", CachedUid::Uid(2));

        tokio::time::advance(Duration::from_secs(6)).await;
        // 过期后刷新的项必须在清理中幸存
        cache.set("fresh", CachedUid::Uid(2));

        cache.purge_expired();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("fresh"), Some(CachedUid::Uid(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_janitor_purges_in_background() {
        let cache = LocalCache::new(test_handle(5, 100, 10));
        cache.set("k", CachedUid::Uid(1));

        // 超过 TTL 和若干清理周期后 janitor 应已删除条目
        for _ in 0..10 {
            if cache.len() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_secs(10)).await;
        }
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_config_change_applies_to_new_writes() {
        let handle = test_handle(5, 100, 3600);
        let cache = LocalCache::new(handle.clone());

        let mut next = handle.snapshot();
        next.cache.ttl_secs = 60;
        handle.replace(next);

        cache.set("k", CachedUid::Uid(1));
        tokio::time::advance(Duration::from_secs(30)).await;
        // 新 TTL 无需重启即生效
        assert_eq!(cache.get("k"), Some(CachedUid::Uid(1)));
    }
}
