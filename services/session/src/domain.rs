//! 会话域类型

/// 缓存的解析结果：已知无效，或用户 ID
///
/// 进程内使用带标签的变体；分布式缓存层沿用十进制字符串线格式，
/// "-1" 为无效哨兵。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachedUid {
    Invalid,
    Uid(i64),
}

impl CachedUid {
    /// 从线格式解析；非整数值返回 None
    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw.parse::<i64>() {
            Ok(-1) => Some(Self::Invalid),
            Ok(uid) => Some(Self::Uid(uid)),
            Err(_) => None,
        }
    }

    /// 线格式
    pub fn to_wire(self) -> String {
        match self {
            Self::Invalid => "-1".to_string(),
            Self::Uid(uid) => uid.to_string(),
        }
    }
}
