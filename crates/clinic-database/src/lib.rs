//! # 病历数据库模块
//!
//! 负责患者数据的持久化，提供PostgreSQL连接池、按操作划分的存储会话，
//! 以及用于测试和演示的内存存储。

pub mod connection;
pub mod memory;
pub mod models;
pub mod queries;
pub mod store;

// 重新导出主要类型
pub use connection::{ConnectOptions, DatabasePool};
pub use memory::MemoryStore;
pub use models::*;
pub use queries::DatabaseQueries;
pub use store::{PatientStore, PgPatientStore, StoreSession};
