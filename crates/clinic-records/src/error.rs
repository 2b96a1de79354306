//! 业务错误

use clinic_core::{ClinicError, Field, FieldError, PatientForm};
use thiserror::Error;

/// 病历操作错误
#[derive(Error, Debug)]
pub enum RecordError {
    /// 请求体缺失或无法绑定
    #[error("请求数据无法绑定: {0}")]
    Binding(String),

    /// 字段校验失败，携带用户提交的原始数据用于回显
    #[error("{field} 校验失败: {message}")]
    Validation {
        field: Field,
        message: String,
        form: Box<PatientForm>,
    },

    #[error("Patient with id {0} was not found")]
    NotFound(i64),

    #[error(transparent)]
    Store(#[from] ClinicError),
}

impl RecordError {
    pub(crate) fn validation(error: FieldError, form: PatientForm) -> Self {
        RecordError::Validation {
            field: error.field,
            message: error.message,
            form: Box::new(form),
        }
    }
}

pub type RecordResult<T> = std::result::Result<T, RecordError>;
