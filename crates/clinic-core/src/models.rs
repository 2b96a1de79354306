//! 核心数据模型定义

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 患者信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,                // 数据库分配，创建后不可变
    pub first_name: String,     // 名
    pub last_name: String,      // 姓
    pub patronymic: String,     // 父称
    pub birth_date: NaiveDate,  // 出生日期
    pub pension_number: String, // 养老保险号（仅数字）
}

impl Patient {
    /// 由数据库分配的ID和待写入数据组装患者
    pub fn from_new(id: i64, new: NewPatient) -> Self {
        Self {
            id,
            first_name: new.first_name,
            last_name: new.last_name,
            patronymic: new.patronymic,
            birth_date: new.birth_date,
            pension_number: new.pension_number,
        }
    }

    /// "名 姓 父称"，与按姓名搜索时匹配的字符串一致
    pub fn full_name(&self) -> String {
        format!("{} {} {}", self.first_name, self.last_name, self.patronymic)
    }
}

/// 待写入的患者数据（新增或整体替换），不含ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub patronymic: String,
    pub birth_date: NaiveDate,
    pub pension_number: String,
}

/// 就诊记录，由其他子系统维护，这里只读
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consultation {
    pub id: i64,
    pub patient_id: i64,
    pub held_on: NaiveDate,
    pub doctor: String,
    pub diagnosis: String,
    pub notes: Option<String>,
}

/// 患者详情：患者本身加上全部就诊记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientDetails {
    pub patient: Patient,
    pub consultations: Vec<Consultation>,
}

/// 表单提交的患者数据
///
/// 所有字段保留用户原始输入，校验失败时原样回显。缺失的字段取空字符串。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientForm {
    pub first_name: String,
    pub last_name: String,
    pub patronymic: String,
    pub birth_date: String,
    pub pension_number: String,
}

impl From<&Patient> for PatientForm {
    fn from(patient: &Patient) -> Self {
        Self {
            first_name: patient.first_name.clone(),
            last_name: patient.last_name.clone(),
            patronymic: patient.patronymic.clone(),
            birth_date: patient.birth_date.format("%Y-%m-%d").to_string(),
            pension_number: patient.pension_number.clone(),
        }
    }
}

/// 可以附带错误信息的表单字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    BirthDate,
    PensionNumber,
}

impl Field {
    /// 表单中对应的输入框名称
    pub fn input_name(&self) -> &'static str {
        match self {
            Field::BirthDate => "birth_date",
            Field::PensionNumber => "pension_number",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::BirthDate => write!(f, "birth date"),
            Field::PensionNumber => write!(f, "pension number"),
        }
    }
}

/// 字段级错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

/// 患者列表过滤条件，空字符串表示不过滤
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PatientFilter {
    pub name: String,
    pub pension: String,
}

impl PatientFilter {
    pub fn name_term(&self) -> Option<&str> {
        let term = self.name.trim();
        (!term.is_empty()).then_some(term)
    }

    pub fn pension_term(&self) -> Option<&str> {
        let term = self.pension.trim();
        (!term.is_empty()).then_some(term)
    }
}
