//! 会话解析
//!
//! 三级查询：本地缓存 → 分布式缓存 → 记录存储。未命中与各种无效
//! 结果统一负缓存，避免相同令牌反复打到记录存储。

use std::sync::Arc;
use std::time::Duration;

use murmur_errors::{AppError, AppResult};
use murmur_ports::{DbTarget, DistributedCache, RecordStore, ScalarValue, SqlRequest};
use tracing::warn;

use crate::cache::LocalCache;
use crate::domain::CachedUid;

/// 分布式缓存层的固定 TTL
const DIST_CACHE_TTL: Duration = Duration::from_secs(3600);

/// 会话解析器
pub struct SessionResolver {
    local: Arc<LocalCache>,
    dcache: Arc<dyn DistributedCache>,
    store: Arc<dyn RecordStore>,
}

fn dist_key(token: &str) -> String {
    format!("session:session:{}", token)
}

fn invalid_session(token: &str) -> AppError {
    AppError::unauthenticated(format!("invalid session: {}", token))
}

/// 将记录存储的标量变体归一化为用户 ID
fn normalize_uid(value: &ScalarValue) -> Option<i64> {
    match value {
        ScalarValue::Int(v) => Some(i64::from(*v)),
        ScalarValue::BigInt(v) => Some(*v),
        ScalarValue::Text(s) => s.parse::<i64>().ok(),
    }
}

impl SessionResolver {
    pub fn new(
        local: Arc<LocalCache>,
        dcache: Arc<dyn DistributedCache>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            local,
            dcache,
            store,
        }
    }

    /// 根据会话令牌解析用户 ID
    pub async fn resolve(&self, token: &str) -> AppResult<i64> {
        // 1. 本地缓存
        if let Some(cached) = self.local.get(token) {
            return match cached {
                CachedUid::Invalid => Err(invalid_session(token)),
                CachedUid::Uid(uid) => Ok(uid),
            };
        }

        // 2. 分布式缓存；出错、缺失或值不可解析时回落到记录存储
        match self.dcache.get(&dist_key(token)).await {
            Ok(Some(raw)) if !raw.is_empty() => {
                if let Some(cached) = CachedUid::from_wire(&raw) {
                    self.local.set(token, cached);
                    return match cached {
                        CachedUid::Invalid => Err(invalid_session(token)),
                        CachedUid::Uid(uid) => Ok(uid),
                    };
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Distributed cache lookup failed"),
        }

        // 3. 记录存储
        let req = SqlRequest::new(
            "SELECT uid FROM session_db WHERE session_id = ? LIMIT 1",
            DbTarget::Session,
        )
        .bind(ScalarValue::Text(token.to_string()));

        let resp = match self.store.execute(req).await {
            Ok(resp) => resp,
            Err(e) => {
                self.cache_invalid(token).await;
                return Err(e);
            }
        };

        let Some(row) = resp.rows.first() else {
            self.cache_invalid(token).await;
            return Err(AppError::not_found(format!("session not found: {}", token)));
        };
        let Some(value) = row.values.first() else {
            self.cache_invalid(token).await;
            return Err(AppError::internal("empty result from record store"));
        };
        let Some(uid) = normalize_uid(value) else {
            self.cache_invalid(token).await;
            return Err(AppError::validation(format!(
                "invalid uid value: {:?}",
                value
            )));
        };
        if uid <= 0 {
            self.cache_invalid(token).await;
            return Err(AppError::validation(format!("invalid uid: {}", uid)));
        }

        self.backfill(token, CachedUid::Uid(uid)).await;
        Ok(uid)
    }

    /// 创建新会话记录
    ///
    /// 不触碰任何缓存层；首次 resolve 负责回填。
    pub async fn create(&self, token: &str, uid: i64) -> AppResult<()> {
        let req = SqlRequest::new(
            "INSERT INTO session_db (session_id, uid) VALUES (?, ?)",
            DbTarget::Session,
        )
        .bind(ScalarValue::Text(token.to_string()))
        .bind(ScalarValue::BigInt(uid));

        self.store.execute(req).await?;
        Ok(())
    }

    /// 删除会话记录，并将两级缓存覆写为哨兵值
    ///
    /// 覆写而非删除：哨兵在其 TTL 内压制过期的分布式缓存命中。
    pub async fn invalidate(&self, token: &str) -> AppResult<()> {
        let req = SqlRequest::new(
            "DELETE FROM session_db WHERE session_id = ?",
            DbTarget::Session,
        )
        .bind(ScalarValue::Text(token.to_string()));

        self.store.execute(req).await?;
        self.cache_invalid(token).await;
        Ok(())
    }

    /// 回填两级缓存；分布式缓存写入是尽力而为
    async fn backfill(&self, token: &str, value: CachedUid) {
        if let Err(e) = self
            .dcache
            .set(&dist_key(token), &value.to_wire(), DIST_CACHE_TTL)
            .await
        {
            warn!(error = %e, "Failed to backfill distributed cache");
        }
        self.local.set(token, value);
    }

    async fn cache_invalid(&self, token: &str) {
        self.backfill(token, CachedUid::Invalid).await;
    }
}
