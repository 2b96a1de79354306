//! # 患者病历业务模块
//!
//! 患者档案的新增、查看、搜索、编辑和删除：
//! - 校验：出生日期范围、养老保险号规范化与唯一性
//! - 结果：跳转目标、字段错误或通用错误，由 Web 层选择具体视图

pub mod error;
pub mod service;
pub mod validation;

// 重新导出主要类型
pub use error::{RecordError, RecordResult};
pub use service::{DeleteOutcome, Navigation, PatientRecordService};
pub use validation::{ensure_pension_available, validate_birth_date};
