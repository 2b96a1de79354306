//! 内存存储
//!
//! 与 PostgreSQL 存储语义一致：ID 自增、养老保险号唯一、删除患者时级联删除就诊记录。
//! 用于测试和 `--in-memory` 演示模式。

use async_trait::async_trait;
use clinic_core::{ClinicError, Consultation, NewPatient, Patient, PatientFilter, Result};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::store::{PatientStore, StoreSession};

#[derive(Debug, Default)]
struct MemoryState {
    last_id: i64,
    last_consultation_id: i64,
    patients: BTreeMap<i64, Patient>,
    consultations: Vec<Consultation>,
    writes: usize,
}

/// 内存患者存储
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
    open_sessions: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条就诊记录（就诊记录由其他子系统写入，这里只供初始化数据使用）
    pub async fn add_consultation(&self, mut consultation: Consultation) -> Result<i64> {
        let mut state = self.state.write().await;
        if !state.patients.contains_key(&consultation.patient_id) {
            return Err(ClinicError::NotFound(format!(
                "patient {}",
                consultation.patient_id
            )));
        }
        state.last_consultation_id += 1;
        consultation.id = state.last_consultation_id;
        let id = consultation.id;
        state.consultations.push(consultation);
        Ok(id)
    }

    /// 当前全部患者，按ID排序
    pub async fn patients(&self) -> Vec<Patient> {
        self.state.read().await.patients.values().cloned().collect()
    }

    /// 成功写入（新增、更新、删除）的次数
    pub async fn write_count(&self) -> usize {
        self.state.read().await.writes
    }

    /// 尚未释放的会话数量
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PatientStore for MemoryStore {
    async fn session(&self) -> Result<Box<dyn StoreSession>> {
        self.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            state: Arc::clone(&self.state),
            open_sessions: Arc::clone(&self.open_sessions),
        }))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

struct MemorySession {
    state: Arc<RwLock<MemoryState>>,
    open_sessions: Arc<AtomicUsize>,
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

fn matches_filter(patient: &Patient, filter: &PatientFilter) -> bool {
    let name_ok = filter.name_term().map_or(true, |term| {
        patient
            .full_name()
            .to_lowercase()
            .contains(&term.to_lowercase())
    });
    let pension_ok = filter
        .pension_term()
        .map_or(true, |term| patient.pension_number.starts_with(term));
    name_ok && pension_ok
}

#[async_trait]
impl StoreSession for MemorySession {
    async fn find_by_id(&mut self, id: i64) -> Result<Option<Patient>> {
        Ok(self.state.read().await.patients.get(&id).cloned())
    }

    async fn find_by_pension_number(&mut self, pension_number: &str) -> Result<Option<Patient>> {
        let state = self.state.read().await;
        Ok(state
            .patients
            .values()
            .find(|p| p.pension_number == pension_number)
            .cloned())
    }

    async fn find_by_name_or_pension_prefix(&mut self, filter: &PatientFilter) -> Result<Vec<Patient>> {
        let state = self.state.read().await;
        let mut found: Vec<Patient> = state
            .patients
            .values()
            .filter(|p| matches_filter(p, filter))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            (&a.last_name, &a.first_name, a.id).cmp(&(&b.last_name, &b.first_name, b.id))
        });
        Ok(found)
    }

    async fn consultations_for(&mut self, patient_id: i64) -> Result<Vec<Consultation>> {
        let state = self.state.read().await;
        let mut found: Vec<Consultation> = state
            .consultations
            .iter()
            .filter(|c| c.patient_id == patient_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| (b.held_on, b.id).cmp(&(a.held_on, a.id)));
        Ok(found)
    }

    async fn insert(&mut self, patient: &NewPatient) -> Result<i64> {
        let mut state = self.state.write().await;
        if state
            .patients
            .values()
            .any(|p| p.pension_number == patient.pension_number)
        {
            return Err(ClinicError::DuplicatePensionNumber(
                patient.pension_number.clone(),
            ));
        }
        state.last_id += 1;
        let id = state.last_id;
        state.patients.insert(id, Patient::from_new(id, patient.clone()));
        state.writes += 1;
        Ok(id)
    }

    async fn update(&mut self, id: i64, patient: &NewPatient) -> Result<bool> {
        let mut state = self.state.write().await;
        if !state.patients.contains_key(&id) {
            return Ok(false);
        }
        if state
            .patients
            .values()
            .any(|p| p.id != id && p.pension_number == patient.pension_number)
        {
            return Err(ClinicError::DuplicatePensionNumber(
                patient.pension_number.clone(),
            ));
        }
        state.patients.insert(id, Patient::from_new(id, patient.clone()));
        state.writes += 1;
        Ok(true)
    }

    async fn delete(&mut self, id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.patients.remove(&id).is_none() {
            return Ok(false);
        }
        state.consultations.retain(|c| c.patient_id != id);
        state.writes += 1;
        Ok(true)
    }
}
