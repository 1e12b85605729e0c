//! murmur-adapter-mysql - MySQL 记录存储适配器

mod pool;
mod store;

pub use pool::create_pool;
pub use store::MysqlRecordStore;
