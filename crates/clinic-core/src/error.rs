//! 错误定义模块

use thiserror::Error;

/// 病历系统统一错误类型
#[derive(Error, Debug)]
pub enum ClinicError {
    #[error("数据库错误: {0}")]
    Database(String),

    /// 写入时触发了养老保险号唯一约束
    #[error("养老保险号已存在: {0}")]
    DuplicatePensionNumber(String),

    #[error("资源未找到: {0}")]
    NotFound(String),
}

/// 病历系统统一结果类型
pub type Result<T> = std::result::Result<T, ClinicError>;
