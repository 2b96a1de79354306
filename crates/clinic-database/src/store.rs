//! 患者存储抽象
//!
//! 业务层每次操作通过 [`PatientStore::session`] 取得一个会话，会话持有底层连接，
//! 在 drop 时释放，无论操作以成功、校验失败还是错误结束。

use async_trait::async_trait;
use clinic_core::{Consultation, NewPatient, Patient, PatientFilter, Result};
use sqlx::pool::PoolConnection;
use sqlx::Postgres;

use crate::connection::DatabasePool;
use crate::queries::DatabaseQueries;

/// 患者存储
#[async_trait]
pub trait PatientStore: Send + Sync {
    /// 打开一个作用于单次操作的会话
    async fn session(&self) -> Result<Box<dyn StoreSession>>;

    /// 健康检查
    async fn ping(&self) -> Result<()>;
}

/// 单次操作的存储会话
#[async_trait]
pub trait StoreSession: Send {
    async fn find_by_id(&mut self, id: i64) -> Result<Option<Patient>>;

    /// `pension_number` 必须已经规范化
    async fn find_by_pension_number(&mut self, pension_number: &str) -> Result<Option<Patient>>;

    async fn find_by_name_or_pension_prefix(&mut self, filter: &PatientFilter) -> Result<Vec<Patient>>;

    async fn consultations_for(&mut self, patient_id: i64) -> Result<Vec<Consultation>>;

    /// 写入新患者，返回分配的ID；养老保险号冲突时返回 `DuplicatePensionNumber`
    async fn insert(&mut self, patient: &NewPatient) -> Result<i64>;

    /// 整体替换，记录不存在时返回 `false`
    async fn update(&mut self, id: i64, patient: &NewPatient) -> Result<bool>;

    /// 硬删除，记录不存在时返回 `false`
    async fn delete(&mut self, id: i64) -> Result<bool>;
}

/// PostgreSQL 存储
#[derive(Debug, Clone)]
pub struct PgPatientStore {
    pool: DatabasePool,
}

impl PgPatientStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PatientStore for PgPatientStore {
    async fn session(&self) -> Result<Box<dyn StoreSession>> {
        let conn = self.pool.acquire().await?;
        Ok(Box::new(PgSession { conn }))
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        DatabaseQueries::new(&mut conn).ping().await
    }
}

/// 持有一个池连接的会话
struct PgSession {
    conn: PoolConnection<Postgres>,
}

impl PgSession {
    fn queries(&mut self) -> DatabaseQueries<'_> {
        DatabaseQueries::new(&mut self.conn)
    }
}

#[async_trait]
impl StoreSession for PgSession {
    async fn find_by_id(&mut self, id: i64) -> Result<Option<Patient>> {
        self.queries().get_patient_by_id(id).await
    }

    async fn find_by_pension_number(&mut self, pension_number: &str) -> Result<Option<Patient>> {
        self.queries().get_patient_by_pension_number(pension_number).await
    }

    async fn find_by_name_or_pension_prefix(&mut self, filter: &PatientFilter) -> Result<Vec<Patient>> {
        self.queries().search_patients(filter).await
    }

    async fn consultations_for(&mut self, patient_id: i64) -> Result<Vec<Consultation>> {
        self.queries().get_consultations_by_patient_id(patient_id).await
    }

    async fn insert(&mut self, patient: &NewPatient) -> Result<i64> {
        self.queries().create_patient(patient).await
    }

    async fn update(&mut self, id: i64, patient: &NewPatient) -> Result<bool> {
        self.queries().update_patient(id, patient).await
    }

    async fn delete(&mut self, id: i64) -> Result<bool> {
        self.queries().delete_patient(id).await
    }
}
