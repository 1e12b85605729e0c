//! 单元测试共用的配置构造

use murmur_config::{
    AppConfig, CacheConfig, DatabaseConfig, RedisConfig, ServerConfig, SessionConfig,
    TelemetryConfig,
};
use secrecy::Secret;

pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        app_name: "murmur-session".to_string(),
        app_env: "test".to_string(),
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            log_requests: false,
        },
        database: DatabaseConfig {
            url: Secret::new("mysql://test".to_string()),
            max_connections: 5,
        },
        redis: RedisConfig {
            url: Secret::new("redis://test".to_string()),
        },
        cache: CacheConfig {
            ttl_secs: 300,
            max_entries: 10_000,
            sweep_interval_secs: 3600,
        },
        session: SessionConfig {
            expire_hours: 72,
            clean_interval_minutes: 30,
        },
        telemetry: TelemetryConfig {
            log_level: "info".to_string(),
        },
    }
}
