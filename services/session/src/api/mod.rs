//! 服务操作层
//!
//! Set/Get/Del/Reload/Ping 五个操作与状态码；HTTP 传输在 http 模块挂载。

pub mod http;

use std::sync::Arc;

use murmur_config::ConfigHandle;
use murmur_errors::{AppError, AppResult};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::reload::ReloadCoordinator;
use crate::resolver::SessionResolver;

/// 操作结果；code 0 表示成功
#[derive(Debug, Clone, Serialize)]
pub struct ResultInfo {
    pub code: i32,
    pub msg: String,
}

impl ResultInfo {
    fn ok() -> Self {
        Self {
            code: 0,
            msg: String::new(),
        }
    }

    fn err(code: i32, msg: &str) -> Self {
        Self {
            code,
            msg: msg.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    pub result: ResultInfo,
    pub session: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub result: ResultInfo,
    pub uid: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DelResponse {
    pub result: ResultInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReloadResponse {
    pub result: ResultInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct Pong {}

/// 会话服务操作
pub struct SessionService {
    resolver: Arc<SessionResolver>,
    coordinator: Arc<ReloadCoordinator>,
    config: ConfigHandle,
}

impl SessionService {
    pub fn new(
        resolver: Arc<SessionResolver>,
        coordinator: Arc<ReloadCoordinator>,
        config: ConfigHandle,
    ) -> Self {
        Self {
            resolver,
            coordinator,
            config,
        }
    }

    /// 创建新会话，返回令牌
    ///
    /// 状态码：1 = 令牌生成失败，2 = 持久化失败。令牌不重用、不重试。
    pub async fn set(&self, uid: i64) -> SetResponse {
        if self.config.server().log_requests {
            info!("Call Set");
        }

        let token = match generate_token() {
            Ok(token) => token,
            Err(e) => {
                error!(error = %e, "Failed to generate session token");
                return SetResponse {
                    result: ResultInfo::err(1, "Failed to generate session"),
                    session: String::new(),
                };
            }
        };

        match self.resolver.create(&token, uid).await {
            Ok(()) => SetResponse {
                result: ResultInfo::ok(),
                session: token,
            },
            Err(e) => {
                error!(error = %e, "Failed to save session");
                SetResponse {
                    result: ResultInfo::err(2, "Failed to save session"),
                    session: String::new(),
                }
            }
        }
    }

    /// 解析会话；任何解析失败都折叠为状态码 1
    pub async fn get(&self, session: &str) -> GetResponse {
        if self.config.server().log_requests {
            info!("Call Get");
        }

        match self.resolver.resolve(session).await {
            Ok(uid) => GetResponse {
                result: ResultInfo::ok(),
                uid,
            },
            Err(e) => {
                debug!(error = %e, "Session resolve failed");
                GetResponse {
                    result: ResultInfo::err(1, "Session not found"),
                    uid: 0,
                }
            }
        }
    }

    /// 删除会话
    pub async fn del(&self, session: &str) -> DelResponse {
        if self.config.server().log_requests {
            info!("Call Del");
        }

        match self.resolver.invalidate(session).await {
            Ok(()) => DelResponse {
                result: ResultInfo::ok(),
            },
            Err(e) => {
                error!(error = %e, "Failed to delete session");
                DelResponse {
                    result: ResultInfo::err(1, "Failed to delete session"),
                }
            }
        }
    }

    /// 触发异步重载，立即返回成功
    pub async fn reload(&self) -> ReloadResponse {
        info!("Received reload request");

        let coordinator = self.coordinator.clone();
        tokio::spawn(async move {
            if let Err(e) = coordinator.reload().await {
                error!(error = %e, "Reload failed");
            }
        });

        ReloadResponse {
            result: ResultInfo::ok(),
        }
    }

    pub async fn ping(&self) -> Pong {
        Pong {}
    }
}

/// 生成随机会话令牌：16 字节系统熵，32 个小写十六进制字符
pub fn generate_token() -> AppResult<String> {
    let mut buf = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| AppError::internal(format!("Failed to read system entropy: {}", e)))?;
    Ok(hex::encode(buf))
}
