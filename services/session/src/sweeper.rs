//! 过期会话清理任务
//!
//! 重复执行的后台任务：启动延迟后先清理一次，此后按固定间隔执行。
//! 每轮只向记录存储发出一条批量删除；错误仅记录日志，不重试、不上抛。
//! 参数在构造时快照，修改配置需经 reload 重建实例。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use murmur_config::SessionConfig;
use murmur_ports::{DbTarget, RecordStore, ScalarValue, SqlRequest};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const SWEEPER_STARTUP_DELAY: Duration = Duration::from_secs(10);

/// 过期会话清理器，状态为 {Stopped, Running}
pub struct ExpirySweeper {
    store: Arc<dyn RecordStore>,
    expire_hours: i64,
    interval: Duration,
    cancel: CancellationToken,
    running: Arc<AtomicBool>,
    swept: watch::Sender<u64>,
}

impl ExpirySweeper {
    pub fn new(store: Arc<dyn RecordStore>, session: &SessionConfig) -> Self {
        let (swept, _) = watch::channel(0);
        Self {
            store,
            expire_hours: session.expire_hours,
            interval: Duration::from_secs(session.clean_interval_minutes * 60),
            cancel: CancellationToken::new(),
            running: Arc::new(AtomicBool::new(false)),
            swept,
        }
    }

    /// 启动清理循环；已在运行时为空操作
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            info!("Sweeper already running");
            return;
        }

        info!(
            expire_hours = self.expire_hours,
            interval_secs = self.interval.as_secs(),
            "Session sweeper started"
        );

        let store = self.store.clone();
        let cancel = self.cancel.clone();
        let running = self.running.clone();
        let swept = self.swept.clone();
        let expire_hours = self.expire_hours;
        let interval = self.interval;

        tokio::spawn(async move {
            sweep_loop(store, cancel, swept, expire_hours, interval).await;
            running.store(false, Ordering::SeqCst);
            info!("Session sweeper stopped");
        });
    }

    /// 通知清理循环退出
    ///
    /// 取消令牌是幂等的广播信号：重复调用、无人监听时都不会阻塞。
    pub fn stop(&self) {
        if !self.running.load(Ordering::SeqCst) {
            return;
        }
        info!("Stopping sweeper");
        self.cancel.cancel();
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// 每轮清理完成后递增的计数器（观测钩子）
    pub fn completions(&self) -> watch::Receiver<u64> {
        self.swept.subscribe()
    }
}

async fn sweep_loop(
    store: Arc<dyn RecordStore>,
    cancel: CancellationToken,
    swept: watch::Sender<u64>,
    expire_hours: i64,
    interval: Duration,
) {
    tokio::select! {
        _ = cancel.cancelled() => return,
        _ = tokio::time::sleep(SWEEPER_STARTUP_DELAY) => {}
    }

    loop {
        sweep(store.as_ref(), expire_hours).await;
        swept.send_modify(|n| *n += 1);

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

/// 执行一轮清理：删除所有早于过期阈值的会话记录
///
/// 只等待请求被接受，不等待行级完成；存储侧可以异步执行。
async fn sweep(store: &dyn RecordStore, expire_hours: i64) {
    info!("Sweeping expired sessions");

    let threshold = Utc::now() - chrono::Duration::hours(expire_hours);
    let req = SqlRequest::new(
        "DELETE FROM session_db WHERE created_at < ?",
        DbTarget::Session,
    )
    .bind(ScalarValue::Text(
        threshold.format("%Y-%m-%d %H:%M:%S").to_string(),
    ));

    if let Err(e) = store.execute(req).await {
        error!(error = %e, "Failed to sweep expired sessions");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use murmur_errors::{AppError, AppResult};
    use murmur_ports::SqlResponse;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;

    struct StubStore {
        calls: AtomicUsize,
        requests: Mutex<Vec<SqlRequest>>,
        fail: bool,
    }

    impl StubStore {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
                fail,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RecordStore for StubStore {
        async fn execute(&self, req: SqlRequest) -> AppResult<SqlResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().push(req);
            if self.fail {
                Err(AppError::database("store down"))
            } else {
                Ok(SqlResponse::default())
            }
        }
    }

    fn session_config(expire_hours: i64, clean_interval_minutes: u64) -> SessionConfig {
        SessionConfig {
            expire_hours,
            clean_interval_minutes,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_issues_single_bulk_delete() {
        let store = StubStore::new(false);
        let sweeper = ExpirySweeper::new(store.clone(), &session_config(72, 30));
        sweeper.start();
        assert!(sweeper.is_running());

        let mut completions = sweeper.completions();
        completions.changed().await.unwrap();

        assert_eq!(store.calls(), 1);
        let req = store.requests.lock()[0].clone();
        assert!(req.sql.starts_with("DELETE FROM session_db WHERE created_at <"));
        assert_eq!(req.params.len(), 1);
        assert!(matches!(req.params[0], ScalarValue::Text(_)));

        sweeper.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeps_repeat_on_interval() {
        let store = StubStore::new(false);
        let sweeper = ExpirySweeper::new(store.clone(), &session_config(72, 30));
        sweeper.start();

        let mut completions = sweeper.completions();
        for _ in 0..3 {
            completions.changed().await.unwrap();
        }
        assert!(store.calls() >= 3);

        sweeper.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let store = StubStore::new(false);
        let sweeper = ExpirySweeper::new(store.clone(), &session_config(72, 30));
        sweeper.start();
        sweeper.start();

        let mut completions = sweeper.completions();
        completions.changed().await.unwrap();
        // 只有一个清理循环在跑
        assert_eq!(store.calls(), 1);

        sweeper.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent_and_safe_when_never_started() {
        let store = StubStore::new(false);

        // 从未启动时 stop 不得阻塞
        let idle = ExpirySweeper::new(store.clone(), &session_config(72, 30));
        idle.stop();
        idle.stop();

        let sweeper = ExpirySweeper::new(store.clone(), &session_config(72, 30));
        sweeper.start();
        sweeper.stop();
        sweeper.stop();
        assert!(!sweeper.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_errors_keep_loop_alive() {
        let store = StubStore::new(true);
        let sweeper = ExpirySweeper::new(store.clone(), &session_config(72, 30));
        sweeper.start();

        let mut completions = sweeper.completions();
        completions.changed().await.unwrap();
        completions.changed().await.unwrap();

        // 删除失败不会中断循环
        assert!(store.calls() >= 2);
        assert!(sweeper.is_running());

        sweeper.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_loop() {
        let store = StubStore::new(false);
        let sweeper = ExpirySweeper::new(store.clone(), &session_config(72, 30));
        sweeper.start();

        let mut completions = sweeper.completions();
        completions.changed().await.unwrap();
        sweeper.stop();
        assert!(!sweeper.is_running());

        // 实例与循环都退出后，计数通道关闭
        drop(sweeper);
        assert!(completions.changed().await.is_err());
    }
}
