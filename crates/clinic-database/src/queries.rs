//! 数据库查询操作

use crate::models::*;
use clinic_core::{ClinicError, Consultation, NewPatient, Patient, PatientFilter, Result};
use sqlx::{PgConnection, Row};

/// 数据库查询操作接口，作用于单个连接
pub struct DatabaseQueries<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> DatabaseQueries<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// 创建数据库表
    pub async fn create_tables(&mut self) -> Result<()> {
        // 创建患者表，养老保险号唯一约束兜底并发写入
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS patients (
                id BIGSERIAL PRIMARY KEY,
                first_name VARCHAR(128) NOT NULL DEFAULT '',
                last_name VARCHAR(128) NOT NULL DEFAULT '',
                patronymic VARCHAR(128) NOT NULL DEFAULT '',
                birth_date DATE NOT NULL,
                pension_number VARCHAR(32) NOT NULL,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                CONSTRAINT patients_pension_number_key UNIQUE (pension_number)
            )
        "#).execute(&mut *self.conn).await.map_err(|e| ClinicError::Database(e.to_string()))?;

        // 创建就诊记录表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS consultations (
                id BIGSERIAL PRIMARY KEY,
                patient_id BIGINT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
                held_on DATE NOT NULL,
                doctor VARCHAR(255) NOT NULL,
                diagnosis TEXT NOT NULL,
                notes TEXT
            )
        "#).execute(&mut *self.conn).await.map_err(|e| ClinicError::Database(e.to_string()))?;

        self.create_indexes().await?;

        tracing::info!("Database tables created successfully");
        Ok(())
    }

    /// 创建数据库索引
    async fn create_indexes(&mut self) -> Result<()> {
        let indexes = vec![
            "CREATE INDEX IF NOT EXISTS idx_patients_last_name ON patients(last_name)",
            "CREATE INDEX IF NOT EXISTS idx_consultations_patient_id ON consultations(patient_id)",
        ];

        for index_sql in indexes {
            sqlx::query(index_sql)
                .execute(&mut *self.conn)
                .await
                .map_err(|e| ClinicError::Database(e.to_string()))?;
        }

        tracing::info!("Database indexes created successfully");
        Ok(())
    }

    // ========== 患者相关操作 ==========

    /// 创建新患者，返回数据库分配的ID
    pub async fn create_patient(&mut self, patient: &NewPatient) -> Result<i64> {
        sqlx::query(r#"
            INSERT INTO patients (first_name, last_name, patronymic, birth_date, pension_number)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
        "#)
        .bind(&patient.first_name)
        .bind(&patient.last_name)
        .bind(&patient.patronymic)
        .bind(patient.birth_date)
        .bind(&patient.pension_number)
        .fetch_one(&mut *self.conn)
        .await
        .map(|row| row.get("id"))
        .map_err(|e| map_write_error(e, &patient.pension_number))
    }

    /// 整体替换患者的可变字段，返回是否有记录被更新
    pub async fn update_patient(&mut self, id: i64, patient: &NewPatient) -> Result<bool> {
        let result = sqlx::query(r#"
            UPDATE patients SET
                first_name = $2,
                last_name = $3,
                patronymic = $4,
                birth_date = $5,
                pension_number = $6,
                updated_at = NOW()
            WHERE id = $1
        "#)
        .bind(id)
        .bind(&patient.first_name)
        .bind(&patient.last_name)
        .bind(&patient.patronymic)
        .bind(patient.birth_date)
        .bind(&patient.pension_number)
        .execute(&mut *self.conn)
        .await
        .map_err(|e| map_write_error(e, &patient.pension_number))?;

        Ok(result.rows_affected() > 0)
    }

    /// 删除患者，就诊记录随外键级联删除
    pub async fn delete_patient(&mut self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM patients WHERE id = $1")
            .bind(id)
            .execute(&mut *self.conn)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// 根据ID查找患者
    pub async fn get_patient_by_id(&mut self, id: i64) -> Result<Option<Patient>> {
        let result = sqlx::query_as::<_, DbPatient>(
            "SELECT * FROM patients WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(result.map(Patient::from))
    }

    /// 根据规范化后的养老保险号查找患者
    pub async fn get_patient_by_pension_number(&mut self, pension_number: &str) -> Result<Option<Patient>> {
        let result = sqlx::query_as::<_, DbPatient>(
            "SELECT * FROM patients WHERE pension_number = $1"
        )
        .bind(pension_number)
        .fetch_optional(&mut *self.conn)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(result.map(Patient::from))
    }

    /// 按姓名子串和养老保险号前缀搜索患者，空条件不参与过滤
    pub async fn search_patients(&mut self, filter: &PatientFilter) -> Result<Vec<Patient>> {
        let name_pattern = filter.name_term().map(|term| format!("%{}%", escape_like(term)));
        let pension_pattern = filter.pension_term().map(|term| format!("{}%", escape_like(term)));

        let results = sqlx::query_as::<_, DbPatient>(r#"
            SELECT * FROM patients
            WHERE ($1::text IS NULL OR (first_name || ' ' || last_name || ' ' || patronymic) ILIKE $1)
              AND ($2::text IS NULL OR pension_number LIKE $2)
            ORDER BY last_name, first_name, id
        "#)
        .bind(name_pattern)
        .bind(pension_pattern)
        .fetch_all(&mut *self.conn)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(results.into_iter().map(Patient::from).collect())
    }

    // ========== 就诊记录相关操作 ==========

    /// 获取患者的全部就诊记录
    pub async fn get_consultations_by_patient_id(&mut self, patient_id: i64) -> Result<Vec<Consultation>> {
        let results = sqlx::query_as::<_, DbConsultation>(
            "SELECT * FROM consultations WHERE patient_id = $1 ORDER BY held_on DESC, id DESC"
        )
        .bind(patient_id)
        .fetch_all(&mut *self.conn)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(results.into_iter().map(Consultation::from).collect())
    }

    /// 检查连接是否可用
    pub async fn ping(&mut self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&mut *self.conn)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;
        Ok(())
    }
}

/// 写入错误映射：唯一约束冲突单独报告
fn map_write_error(error: sqlx::Error, pension_number: &str) -> ClinicError {
    if let sqlx::Error::Database(db_error) = &error {
        if db_error.is_unique_violation() {
            return ClinicError::DuplicatePensionNumber(pension_number.to_string());
        }
    }
    ClinicError::Database(error.to_string())
}
