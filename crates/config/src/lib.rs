//! murmur-config - 配置加载库

use std::sync::Arc;

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use parking_lot::RwLock;
use secrecy::Secret;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 是否记录每次请求
    #[serde(default)]
    pub log_requests: bool,
}

/// 数据库配置（记录存储）
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    // 根据环境自动调整连接池大小
    match std::env::var("APP_ENV").as_deref() {
        Ok("production") => 50,
        _ => 10,
    }
}

/// Redis 配置
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: Secret<String>,
}

/// 本地缓存配置
///
/// LocalCache 在每次写入时重新读取这些值，修改后无需重启生效。
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// 缓存项 TTL（秒）
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
    /// 最大缓存项数量
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
    /// 过期清理周期（秒）
    #[serde(default = "default_cache_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_cache_max_entries() -> usize {
    10_000
}

fn default_cache_sweep_interval_secs() -> u64 {
    60
}

/// 会话配置（ExpirySweeper 参数）
///
/// 这两个值在 sweeper 构造时快照，修改后需通过 reload 重建 sweeper。
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// 会话过期时间（小时）
    #[serde(default = "default_expire_hours")]
    pub expire_hours: i64,
    /// 清理间隔（分钟）
    #[serde(default = "default_clean_interval_minutes")]
    pub clean_interval_minutes: u64,
}

fn default_expire_hours() -> i64 {
    72
}

fn default_clean_interval_minutes() -> u64 {
    30
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_name: String,
    pub app_env: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub cache: CacheConfig,
    pub session: SessionConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config: Self = Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("MURMUR_").split("__"))
            .extract()?;

        Ok(config)
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }
}

/// 共享配置句柄
///
/// 持有当前生效的配置并记住加载目录，`reload` 重新读取磁盘后原地替换。
/// 读取方每次通过句柄取值，写入之间无需重启即可看到新配置。
#[derive(Clone)]
pub struct ConfigHandle {
    shared: Arc<RwLock<AppConfig>>,
    config_dir: Arc<String>,
}

impl ConfigHandle {
    /// 从配置目录加载并创建句柄
    pub fn load(config_dir: impl Into<String>) -> Result<Self, ConfigError> {
        let dir = config_dir.into();
        let config = AppConfig::load(&dir)?;
        Ok(Self {
            shared: Arc::new(RwLock::new(config)),
            config_dir: Arc::new(dir),
        })
    }

    /// 从已有配置创建句柄（reload 仍按默认目录读取）
    pub fn from_config(config: AppConfig) -> Self {
        Self {
            shared: Arc::new(RwLock::new(config)),
            config_dir: Arc::new("config".to_string()),
        }
    }

    /// 当前配置的完整快照
    pub fn snapshot(&self) -> AppConfig {
        self.shared.read().clone()
    }

    /// 重新读取磁盘配置并替换当前值，返回新配置
    pub fn reload(&self) -> Result<AppConfig, ConfigError> {
        let config = AppConfig::load(&self.config_dir)?;
        *self.shared.write() = config.clone();
        Ok(config)
    }

    /// 直接替换当前配置
    pub fn replace(&self, config: AppConfig) {
        *self.shared.write() = config;
    }

    pub fn server(&self) -> ServerConfig {
        self.shared.read().server.clone()
    }

    pub fn cache(&self) -> CacheConfig {
        self.shared.read().cache.clone()
    }

    pub fn session(&self) -> SessionConfig {
        self.shared.read().session.clone()
    }
}

#[cfg(test)]
mod tests;
