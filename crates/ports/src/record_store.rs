//! 记录存储 trait 定义
//!
//! 请求携带查询语句、目标数据库和绑定参数；返回行由类型化标量组成。
//! 标量在存储访问边界处解码为封闭的和类型，核心逻辑不做动态类型分发。

use async_trait::async_trait;
use murmur_errors::AppResult;

/// 记录存储返回/绑定的标量值
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Int(i32),
    BigInt(i64),
    Text(String),
}

/// 目标数据库选择器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbTarget {
    Session,
}

/// 查询/执行请求
#[derive(Debug, Clone)]
pub struct SqlRequest {
    pub sql: String,
    pub db: DbTarget,
    pub params: Vec<ScalarValue>,
}

impl SqlRequest {
    pub fn new(sql: impl Into<String>, db: DbTarget) -> Self {
        Self {
            sql: sql.into(),
            db,
            params: Vec::new(),
        }
    }

    /// 追加一个绑定参数
    pub fn bind(mut self, value: ScalarValue) -> Self {
        self.params.push(value);
        self
    }
}

/// 结果行
#[derive(Debug, Clone, Default)]
pub struct Row {
    pub values: Vec<ScalarValue>,
}

/// 查询/执行结果
#[derive(Debug, Clone, Default)]
pub struct SqlResponse {
    pub rows: Vec<Row>,
}

/// 记录存储 trait
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// 执行一条语句；非查询语句返回空行集
    async fn execute(&self, req: SqlRequest) -> AppResult<SqlResponse>;
}
