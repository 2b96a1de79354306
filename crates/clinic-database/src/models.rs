//! 数据库模型

use chrono::{DateTime, NaiveDate, Utc};
use clinic_core::models::*;
use sqlx::FromRow;

// 数据库表模型 - 使用FromRow trait用于SQL查询

/// 数据库患者表
#[derive(Debug, FromRow)]
pub struct DbPatient {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub patronymic: String,
    pub birth_date: NaiveDate,
    pub pension_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbPatient> for Patient {
    fn from(db_patient: DbPatient) -> Self {
        Patient {
            id: db_patient.id,
            first_name: db_patient.first_name,
            last_name: db_patient.last_name,
            patronymic: db_patient.patronymic,
            birth_date: db_patient.birth_date,
            pension_number: db_patient.pension_number,
        }
    }
}

/// 数据库就诊记录表
#[derive(Debug, FromRow)]
pub struct DbConsultation {
    pub id: i64,
    pub patient_id: i64,
    pub held_on: NaiveDate,
    pub doctor: String,
    pub diagnosis: String,
    pub notes: Option<String>,
}

impl From<DbConsultation> for Consultation {
    fn from(db_consultation: DbConsultation) -> Self {
        Consultation {
            id: db_consultation.id,
            patient_id: db_consultation.patient_id,
            held_on: db_consultation.held_on,
            doctor: db_consultation.doctor,
            diagnosis: db_consultation.diagnosis,
            notes: db_consultation.notes,
        }
    }
}

/// 转义LIKE模式中的通配符，使搜索词按字面匹配
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
