//! # 病历系统管理模块
//!
//! 配置加载与验证、日志初始化。

pub mod config;
pub mod logging;

pub use config::{
    ClinicConfig, ConfigManager, ConfigValidator, DatabaseConfig, LogFormat, LoggingConfig,
    ServerConfig,
};
pub use logging::{init_logging, with_bootstrap_logging};
