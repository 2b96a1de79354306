//! 患者病历服务
//!
//! 每个操作打开一个存储会话，完成读取和至多一次写入后随作用域结束释放。

use chrono::{Local, NaiveDate};
use clinic_core::utils::normalize_pension_number;
use clinic_core::{ClinicError, NewPatient, Patient, PatientDetails, PatientFilter, PatientForm};
use clinic_database::{PatientStore, StoreSession};
use serde::{Serialize, Serializer};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::{RecordError, RecordResult};
use crate::validation::{duplicate_pension, ensure_pension_available, validate_birth_date};

/// 操作成功后的跳转目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// 首页，附带提示信息
    Landing { message: String },
    /// 患者详情页，附带提示信息
    PatientDetails { id: i64, message: String },
}

/// 删除操作的结构化结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    #[serde(serialize_with = "bool_as_string")]
    pub success: bool,
    pub message: String,
}

fn bool_as_string<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *value { "true" } else { "false" })
}

/// 患者病历服务
pub struct PatientRecordService {
    store: Arc<dyn PatientStore>,
    clock: fn() -> NaiveDate,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

impl PatientRecordService {
    pub fn new(store: Arc<dyn PatientStore>) -> Self {
        Self {
            store,
            clock: local_today,
        }
    }

    /// 替换"今天"的来源，出生日期上限依赖它
    pub fn with_clock(mut self, clock: fn() -> NaiveDate) -> Self {
        self.clock = clock;
        self
    }

    /// 新增患者
    pub async fn add(&self, candidate: Option<PatientForm>) -> RecordResult<Navigation> {
        let Some(form) = candidate else {
            error!("Add patient: payload is missing or could not be bound");
            return Err(RecordError::Binding("patient payload is missing".to_string()));
        };

        let mut session = self.store.session().await?;
        let candidate = self.validated(session.as_mut(), &form, None).await?;

        let id = session
            .insert(&candidate)
            .await
            .map_err(|e| conflict_to_validation(e, form))?;

        info!(patient_id = id, pension_number = %candidate.pension_number, "Patient created");
        Ok(Navigation::Landing {
            message: format!(
                "Patient {} {} was added",
                candidate.first_name, candidate.last_name
            ),
        })
    }

    /// 查看患者详情，连同就诊记录
    pub async fn get(&self, id: i64) -> RecordResult<PatientDetails> {
        let mut session = self.store.session().await?;

        let Some(patient) = session.find_by_id(id).await? else {
            error!(patient_id = id, "Patient not found");
            return Err(RecordError::NotFound(id));
        };
        let consultations = session.consultations_for(id).await?;

        info!(
            patient_id = id,
            consultations = consultations.len(),
            "Patient loaded"
        );
        Ok(PatientDetails {
            patient,
            consultations,
        })
    }

    /// 按姓名子串和养老保险号前缀搜索
    pub async fn list(&self, filter: &PatientFilter) -> RecordResult<Vec<Patient>> {
        // 前缀与存储中的规范化号码比较
        if !filter.pension.trim().is_empty() && normalize_pension_number(&filter.pension).is_empty() {
            info!(pension = %filter.pension, matches = 0, "Pension filter has no digits");
            return Ok(Vec::new());
        }
        let filter = PatientFilter {
            name: filter.name.trim().to_string(),
            pension: normalize_pension_number(&filter.pension),
        };

        let mut session = self.store.session().await?;
        let patients = session.find_by_name_or_pension_prefix(&filter).await?;

        info!(
            name = %filter.name,
            pension = %filter.pension,
            matches = patients.len(),
            "Patient search finished"
        );
        Ok(patients)
    }

    /// 编辑患者：整体替换全部可变字段
    pub async fn edit(&self, id: i64, updated: Option<PatientForm>) -> RecordResult<Navigation> {
        let Some(form) = updated else {
            error!(patient_id = id, "Edit patient: payload is missing or could not be bound");
            return Err(RecordError::Binding("patient payload is missing".to_string()));
        };

        let mut session = self.store.session().await?;
        if session.find_by_id(id).await?.is_none() {
            error!(patient_id = id, "Edit patient: patient not found");
            return Err(RecordError::NotFound(id));
        }

        let replacement = self.validated(session.as_mut(), &form, Some(id)).await?;

        let updated = session
            .update(id, &replacement)
            .await
            .map_err(|e| conflict_to_validation(e, form))?;
        if !updated {
            // 校验之后被并发删除
            error!(patient_id = id, "Edit patient: patient disappeared before update");
            return Err(RecordError::NotFound(id));
        }

        info!(
            patient_id = id,
            pension_number = %replacement.pension_number,
            "Patient updated"
        );
        Ok(Navigation::PatientDetails {
            id,
            message: "Patient record was updated".to_string(),
        })
    }

    /// 删除患者，返回结构化结果而不是页面
    pub async fn delete(&self, id: i64) -> RecordResult<DeleteOutcome> {
        let mut session = self.store.session().await?;

        if !session.delete(id).await? {
            error!(patient_id = id, "Delete patient: patient not found");
            return Ok(DeleteOutcome {
                success: false,
                message: format!("Patient with id {} was not found", id),
            });
        }

        info!(patient_id = id, "Patient deleted");
        Ok(DeleteOutcome {
            success: true,
            message: format!("Patient with id {} was deleted", id),
        })
    }

    /// 校验表单并转换为待写入数据
    ///
    /// 顺序：出生日期 → 规范化养老保险号 → 唯一性。
    async fn validated(
        &self,
        session: &mut dyn StoreSession,
        form: &PatientForm,
        editing_id: Option<i64>,
    ) -> RecordResult<NewPatient> {
        let birth_date = match validate_birth_date(&form.birth_date, (self.clock)()) {
            Ok(date) => date,
            Err(field_error) => {
                warn!(
                    patient_id = editing_id,
                    birth_date = %form.birth_date,
                    "{}",
                    field_error.message
                );
                return Err(RecordError::validation(field_error, form.clone()));
            }
        };

        let pension_number = normalize_pension_number(&form.pension_number);
        let existing = session.find_by_pension_number(&pension_number).await?;
        if let Err(field_error) =
            ensure_pension_available(&pension_number, existing.as_ref(), editing_id)
        {
            warn!(
                patient_id = editing_id,
                pension_number = %pension_number,
                "{}",
                field_error.message
            );
            return Err(RecordError::validation(field_error, form.clone()));
        }

        Ok(NewPatient {
            first_name: form.first_name.trim().to_string(),
            last_name: form.last_name.trim().to_string(),
            patronymic: form.patronymic.trim().to_string(),
            birth_date,
            pension_number,
        })
    }
}

/// 预检之后仍然撞上唯一约束：与预检失败一样报告为字段错误
fn conflict_to_validation(error: ClinicError, form: PatientForm) -> RecordError {
    match error {
        ClinicError::DuplicatePensionNumber(pension_number) => {
            warn!(
                pension_number = %pension_number,
                "Pension number taken by a concurrent write"
            );
            RecordError::validation(duplicate_pension(&pension_number), form)
        }
        other => RecordError::Store(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinic_core::{Consultation, Field};
    use clinic_database::MemoryStore;

    fn fixed_today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn setup() -> (MemoryStore, PatientRecordService) {
        let store = MemoryStore::new();
        let service = PatientRecordService::new(Arc::new(store.clone())).with_clock(fixed_today);
        (store, service)
    }

    fn form(first: &str, last: &str, birth_date: &str, pension: &str) -> PatientForm {
        PatientForm {
            first_name: first.to_string(),
            last_name: last.to_string(),
            patronymic: "Petrovich".to_string(),
            birth_date: birth_date.to_string(),
            pension_number: pension.to_string(),
        }
    }

    async fn add_one(service: &PatientRecordService, pension: &str) -> i64 {
        service
            .add(Some(form("John", "Smith", "1980-05-05", pension)))
            .await
            .unwrap();
        let filter = PatientFilter {
            name: String::new(),
            pension: pension.to_string(),
        };
        service.list(&filter).await.unwrap()[0].id
    }

    #[tokio::test]
    async fn test_add_persists_normalized_pension() {
        let (store, service) = setup();

        let nav = service
            .add(Some(form("John", "Smith", "1980-05-05", "123-456-789 01")))
            .await
            .unwrap();

        assert!(matches!(nav, Navigation::Landing { .. }));
        let patients = store.patients().await;
        assert_eq!(patients.len(), 1);
        assert_eq!(patients[0].pension_number, "12345678901");
        assert_eq!(store.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_add_without_payload_is_binding_error() {
        let (store, service) = setup();

        let err = service.add(None).await.unwrap_err();

        assert!(matches!(err, RecordError::Binding(_)));
        assert_eq!(store.write_count().await, 0);
    }

    #[tokio::test]
    async fn test_add_rejects_ancient_birth_date_without_writing() {
        let (store, service) = setup();
        let submitted = form("Old", "Timer", "1700-01-01", "111");

        let err = service.add(Some(submitted.clone())).await.unwrap_err();

        match err {
            RecordError::Validation { field, form, .. } => {
                assert_eq!(field, Field::BirthDate);
                assert_eq!(*form, submitted);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(store.write_count().await, 0);
        assert_eq!(store.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_add_birth_date_boundaries() {
        let (_store, service) = setup();

        assert!(service.add(Some(form("A", "A", "1880-01-01", "1"))).await.is_ok());
        assert!(service.add(Some(form("B", "B", "2025-05-31", "2"))).await.is_ok());
        assert!(service.add(Some(form("C", "C", "1879-12-31", "3"))).await.is_err());
        assert!(service.add(Some(form("D", "D", "2025-06-01", "4"))).await.is_err());
    }

    #[tokio::test]
    async fn test_add_rejects_duplicate_after_normalization() {
        let (store, service) = setup();
        service
            .add(Some(form("John", "Smith", "1980-05-05", "123-456-789")))
            .await
            .unwrap();

        let err = service
            .add(Some(form("Jack", "Jones", "1981-06-06", "123456789")))
            .await
            .unwrap_err();

        match err {
            RecordError::Validation { field, form, .. } => {
                assert_eq!(field, Field::PensionNumber);
                assert_eq!(form.pension_number, "123456789");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(store.patients().await.len(), 1);
    }

    #[tokio::test]
    async fn test_get_includes_consultations() {
        let (store, service) = setup();
        let id = add_one(&service, "555").await;
        store
            .add_consultation(Consultation {
                id: 0,
                patient_id: id,
                held_on: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
                doctor: "Dr. Watson".to_string(),
                diagnosis: "Flu".to_string(),
                notes: Some("Rest".to_string()),
            })
            .await
            .unwrap();

        let details = service.get(id).await.unwrap();

        assert_eq!(details.patient.id, id);
        assert_eq!(details.consultations.len(), 1);
        assert_eq!(store.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (_store, service) = setup();
        assert!(matches!(service.get(42).await, Err(RecordError::NotFound(42))));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let (_store, service) = setup();
        service.add(Some(form("John", "Smith", "1980-01-01", "111-222"))).await.unwrap();
        service.add(Some(form("Anna", "Smithson", "1985-01-01", "111-333"))).await.unwrap();
        service.add(Some(form("Jane", "Doe", "1990-01-01", "222-111"))).await.unwrap();

        let all = service.list(&PatientFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);

        let smiths = service
            .list(&PatientFilter { name: "Smith".to_string(), pension: String::new() })
            .await
            .unwrap();
        assert_eq!(smiths.len(), 2);
        assert!(smiths.iter().all(|p| p.full_name().contains("Smith")));

        // 前缀按规范化后的号码匹配
        let by_prefix = service
            .list(&PatientFilter { name: String::new(), pension: "111-2".to_string() })
            .await
            .unwrap();
        assert_eq!(by_prefix.len(), 1);
        assert_eq!(by_prefix[0].last_name, "Smith");

        let both = service
            .list(&PatientFilter { name: "smith".to_string(), pension: "1113".to_string() })
            .await
            .unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].last_name, "Smithson");

        let full_name = service
            .list(&PatientFilter { name: "John Smith Petro".to_string(), pension: String::new() })
            .await
            .unwrap();
        assert_eq!(full_name.len(), 1);
    }

    #[tokio::test]
    async fn test_list_pension_filter_without_digits_matches_nothing() {
        let (store, service) = setup();
        service.add(Some(form("John", "Smith", "1980-01-01", "111"))).await.unwrap();
        service.add(Some(form("Jane", "Doe", "1990-01-01", "222"))).await.unwrap();

        for pension in ["abc", "-", " - "] {
            let found = service
                .list(&PatientFilter { name: String::new(), pension: pension.to_string() })
                .await
                .unwrap();
            assert!(found.is_empty(), "pension filter {:?}", pension);
        }

        // 只有空白等同于不过滤
        let all = service
            .list(&PatientFilter { name: String::new(), pension: "  ".to_string() })
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(store.open_sessions(), 0);
    }

    /// 预检查不到冲突、写入时才撞上唯一约束的存储
    struct ConflictingStore;

    struct ConflictingSession;

    fn conflicting_patient(id: i64) -> Patient {
        Patient {
            id,
            first_name: "John".to_string(),
            last_name: "Smith".to_string(),
            patronymic: String::new(),
            birth_date: NaiveDate::from_ymd_opt(1980, 5, 5).unwrap(),
            pension_number: "100".to_string(),
        }
    }

    #[async_trait::async_trait]
    impl PatientStore for ConflictingStore {
        async fn session(&self) -> clinic_core::Result<Box<dyn StoreSession>> {
            Ok(Box::new(ConflictingSession))
        }

        async fn ping(&self) -> clinic_core::Result<()> {
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl StoreSession for ConflictingSession {
        async fn find_by_id(&mut self, id: i64) -> clinic_core::Result<Option<Patient>> {
            Ok(Some(conflicting_patient(id)))
        }

        async fn find_by_pension_number(&mut self, _: &str) -> clinic_core::Result<Option<Patient>> {
            Ok(None)
        }

        async fn find_by_name_or_pension_prefix(
            &mut self,
            _: &PatientFilter,
        ) -> clinic_core::Result<Vec<Patient>> {
            Ok(Vec::new())
        }

        async fn consultations_for(&mut self, _: i64) -> clinic_core::Result<Vec<Consultation>> {
            Ok(Vec::new())
        }

        async fn insert(&mut self, patient: &NewPatient) -> clinic_core::Result<i64> {
            Err(ClinicError::DuplicatePensionNumber(patient.pension_number.clone()))
        }

        async fn update(&mut self, _: i64, patient: &NewPatient) -> clinic_core::Result<bool> {
            Err(ClinicError::DuplicatePensionNumber(patient.pension_number.clone()))
        }

        async fn delete(&mut self, _: i64) -> clinic_core::Result<bool> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn test_unique_constraint_on_write_reported_as_pension_error() {
        let service = PatientRecordService::new(Arc::new(ConflictingStore)).with_clock(fixed_today);
        let submitted = form("Jack", "Jones", "1981-06-06", "123-456-789");

        let err = service.add(Some(submitted.clone())).await.unwrap_err();
        match err {
            RecordError::Validation { field, message, form } => {
                assert_eq!(field, Field::PensionNumber);
                assert!(message.contains("123456789"), "{}", message);
                assert_eq!(*form, submitted);
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let err = service.edit(3, Some(submitted.clone())).await.unwrap_err();
        match err {
            RecordError::Validation { field, form, .. } => {
                assert_eq!(field, Field::PensionNumber);
                assert_eq!(*form, submitted);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_edit_replaces_all_fields() {
        let (store, service) = setup();
        let id = add_one(&service, "999").await;

        let replacement = PatientForm {
            first_name: "Johnny".to_string(),
            last_name: "Smythe".to_string(),
            patronymic: String::new(),
            birth_date: "1979-04-04".to_string(),
            pension_number: "888-777".to_string(),
        };
        let nav = service.edit(id, Some(replacement)).await.unwrap();

        assert!(matches!(nav, Navigation::PatientDetails { id: nav_id, .. } if nav_id == id));
        let patient = service.get(id).await.unwrap().patient;
        assert_eq!(patient.first_name, "Johnny");
        assert_eq!(patient.patronymic, "");
        assert_eq!(patient.pension_number, "888777");
        assert_eq!(store.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_edit_allows_own_pension_number() {
        let (store, service) = setup();
        for pension in ["1", "2", "3", "4"] {
            add_one(&service, pension).await;
        }
        let id = add_one(&service, "555-666").await;
        assert_eq!(id, 5);

        let result = service
            .edit(5, Some(form("John", "Smith", "1980-05-05", "555666")))
            .await;

        assert!(result.is_ok());
        assert_eq!(store.patients().await.len(), 5);
    }

    #[tokio::test]
    async fn test_edit_rejects_pension_of_other_patient() {
        let (_store, service) = setup();
        let first = add_one(&service, "100").await;
        let second = add_one(&service, "200").await;

        let err = service
            .edit(second, Some(form("John", "Smith", "1980-05-05", "1-0-0")))
            .await
            .unwrap_err();

        assert!(matches!(err, RecordError::Validation { field: Field::PensionNumber, .. }));
        assert_eq!(service.get(first).await.unwrap().patient.pension_number, "100");
        assert_eq!(service.get(second).await.unwrap().patient.pension_number, "200");
    }

    #[tokio::test]
    async fn test_edit_error_cases() {
        let (_store, service) = setup();
        let id = add_one(&service, "300").await;

        assert!(matches!(service.edit(id, None).await, Err(RecordError::Binding(_))));
        assert!(matches!(
            service.edit(77, Some(form("A", "B", "1980-05-05", "1"))).await,
            Err(RecordError::NotFound(77))
        ));
        assert!(matches!(
            service.edit(id, Some(form("A", "B", "3000-01-01", "300"))).await,
            Err(RecordError::Validation { field: Field::BirthDate, .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let (store, service) = setup();
        let id = add_one(&service, "400").await;

        let outcome = service.delete(id).await.unwrap();
        assert!(outcome.success);
        assert!(matches!(service.get(id).await, Err(RecordError::NotFound(_))));

        let outcome = service.delete(id).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(store.open_sessions(), 0);
    }

    #[test]
    fn test_delete_outcome_serializes_success_as_string() {
        let outcome = DeleteOutcome {
            success: false,
            message: "Patient with id 9 was not found".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], "false");
        assert_eq!(json["message"], "Patient with id 9 was not found");
    }
}
