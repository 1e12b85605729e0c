//! MySQL 记录存储实现
//!
//! 结果列在此边界处解码为 `ScalarValue`，按窄整数、宽整数、字符串的
//! 顺序尝试；核心逻辑只见到封闭的和类型。

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use murmur_errors::{AppError, AppResult};
use murmur_ports::{DbTarget, RecordStore, Row, ScalarValue, SqlRequest, SqlResponse};
use sqlx::Row as _;
use sqlx::mysql::{MySqlPool, MySqlRow};

/// MySQL 记录存储
pub struct MysqlRecordStore {
    pool: MySqlPool,
}

impl MysqlRecordStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for MysqlRecordStore {
    async fn execute(&self, req: SqlRequest) -> AppResult<SqlResponse> {
        let pool = match req.db {
            DbTarget::Session => &self.pool,
        };

        let mut query = sqlx::query(&req.sql);
        for param in &req.params {
            query = match param {
                ScalarValue::Int(v) => query.bind(*v),
                ScalarValue::BigInt(v) => query.bind(*v),
                ScalarValue::Text(s) => query.bind(s.as_str()),
            };
        }

        let rows = query
            .fetch_all(pool)
            .await
            .map_err(|e| AppError::database(format!("MySQL execute failed: {}", e)))?;

        let rows = rows
            .iter()
            .map(decode_row)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(SqlResponse { rows })
    }
}

fn decode_row(row: &MySqlRow) -> AppResult<Row> {
    let mut values = Vec::with_capacity(row.len());
    for idx in 0..row.len() {
        values.push(decode_column(row, idx)?);
    }
    Ok(Row { values })
}

fn decode_column(row: &MySqlRow, idx: usize) -> AppResult<ScalarValue> {
    if let Ok(v) = row.try_get::<i32, _>(idx) {
        return Ok(ScalarValue::Int(v));
    }
    if let Ok(v) = row.try_get::<i64, _>(idx) {
        return Ok(ScalarValue::BigInt(v));
    }
    if let Ok(v) = row.try_get::<u64, _>(idx) {
        return Ok(ScalarValue::BigInt(v as i64));
    }
    if let Ok(v) = row.try_get::<String, _>(idx) {
        return Ok(ScalarValue::Text(v));
    }
    // created_at 等时间戳列以文本形式交给调用方
    if let Ok(v) = row.try_get::<NaiveDateTime, _>(idx) {
        return Ok(ScalarValue::Text(v.format("%Y-%m-%d %H:%M:%S").to_string()));
    }
    if let Ok(v) = row.try_get::<DateTime<Utc>, _>(idx) {
        return Ok(ScalarValue::Text(v.format("%Y-%m-%d %H:%M:%S").to_string()));
    }
    Err(AppError::database(format!(
        "unsupported scalar type in column {}",
        idx
    )))
}
