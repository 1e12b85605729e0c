//! 配置重载协调
//!
//! reload 由单把互斥锁串行化：锁只覆盖重载本身和 sweeper 重建，
//! 不阻塞 resolve/create/invalidate 流量。

use std::sync::Arc;

use murmur_config::ConfigHandle;
use murmur_errors::{AppError, AppResult};
use murmur_ports::RecordStore;
use tokio::sync::{Mutex, watch};
use tracing::info;

use crate::sweeper::ExpirySweeper;

/// 重载协调器
pub struct ReloadCoordinator {
    config: ConfigHandle,
    store: Arc<dyn RecordStore>,
    sweeper: Mutex<ExpirySweeper>,
}

impl ReloadCoordinator {
    pub fn new(config: ConfigHandle, store: Arc<dyn RecordStore>, sweeper: ExpirySweeper) -> Self {
        Self {
            config,
            store,
            sweeper: Mutex::new(sweeper),
        }
    }

    /// 重新读取配置；当且仅当 sweeper 参数变化时重建 sweeper
    ///
    /// 缓存参数（TTL、容量、janitor 周期）有意不在比较之列：
    /// LocalCache 每次写入都重新读取配置，无需重启即生效。
    pub async fn reload(&self) -> AppResult<()> {
        let mut sweeper = self.sweeper.lock().await;

        info!("Reloading config");

        let old = self.config.session();
        let config = self
            .config
            .reload()
            .map_err(|e| AppError::internal(format!("Failed to reload config: {}", e)))?;

        let changed = old.expire_hours != config.session.expire_hours
            || old.clean_interval_minutes != config.session.clean_interval_minutes;

        if changed {
            info!("Rebuilding sweeper");
            sweeper.stop();
            *sweeper = ExpirySweeper::new(self.store.clone(), &config.session);
            sweeper.start();
            info!("Sweeper rebuilt");
        }

        info!("Reload completed");
        Ok(())
    }

    pub async fn sweeper_running(&self) -> bool {
        self.sweeper.lock().await.is_running()
    }

    /// 当前 sweeper 的清理完成计数（观测钩子）
    pub async fn sweeper_completions(&self) -> watch::Receiver<u64> {
        self.sweeper.lock().await.completions()
    }
}
