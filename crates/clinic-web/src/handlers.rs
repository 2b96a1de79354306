//! HTTP处理器

use axum::{
    extract::{
        rejection::{FormRejection, PathRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Json, Redirect, Response},
    Form,
};
use clinic_core::{FieldError, PatientFilter, PatientForm};
use clinic_records::{Navigation, RecordError};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

use crate::server::AppState;
use crate::PATIENTS_PATH;

/// 跳转后携带的提示信息
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub message: Option<String>,
}

/// 健康检查处理器
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let (status, health, store) = match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "healthy", "ok".to_string()),
        Err(e) => {
            error!("Health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", e.to_string())
        }
    };

    (
        status,
        Json(json!({
            "status": health,
            "store": store,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// 首页
pub async fn landing(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> Html<String> {
    Html(state.presenter.landing(query.message.as_deref()))
}

/// 新增患者表单
pub async fn new_patient_form(State(state): State<AppState>) -> Html<String> {
    Html(state.presenter.add_form(&PatientForm::default(), None))
}

/// 新增患者
pub async fn create_patient(
    State(state): State<AppState>,
    payload: Result<Form<PatientForm>, FormRejection>,
) -> Response {
    match state.service.add(bound(payload)).await {
        Ok(navigation) => redirect(&navigation),
        Err(RecordError::Validation { field, message, form }) => {
            let error = FieldError { field, message };
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Html(state.presenter.add_form(&form, Some(&error))),
            )
                .into_response()
        }
        Err(other) => error_page(&state, &other),
    }
}

/// 搜索患者，返回列表片段
pub async fn search_patients(
    State(state): State<AppState>,
    Query(filter): Query<PatientFilter>,
) -> Response {
    match state.service.list(&filter).await {
        Ok(patients) => Html(state.presenter.patient_list(&patients)).into_response(),
        Err(e) => error_page(&state, &e),
    }
}

/// 患者详情
pub async fn patient_details(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<MessageQuery>,
) -> Response {
    match state.service.get(id).await {
        Ok(details) => Html(
            state
                .presenter
                .details(&details, query.message.as_deref()),
        )
        .into_response(),
        Err(e) => error_page(&state, &e),
    }
}

/// 编辑患者表单
pub async fn edit_patient_form(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.service.get(id).await {
        Ok(details) => {
            let form = PatientForm::from(&details.patient);
            Html(state.presenter.edit_form(id, &form, None)).into_response()
        }
        Err(e) => error_page(&state, &e),
    }
}

/// 保存编辑
pub async fn update_patient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Form<PatientForm>, FormRejection>,
) -> Response {
    match state.service.edit(id, bound(payload)).await {
        Ok(navigation) => redirect(&navigation),
        Err(RecordError::Validation { field, message, form }) => {
            let error = FieldError { field, message };
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Html(state.presenter.edit_form(id, &form, Some(&error))),
            )
                .into_response()
        }
        Err(other) => error_page(&state, &other),
    }
}

/// 删除患者，返回JSON
pub async fn delete_patient(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Response {
    let Ok(Path(id)) = id else {
        debug!("Delete patient: id is not a number");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": "false", "message": "Patient id must be a number" })),
        )
            .into_response();
    };

    match state.service.delete(id).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => {
            error!(patient_id = id, "Delete patient failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": "false", "message": "Patient could not be deleted" })),
            )
                .into_response()
        }
    }
}

/// 表单绑定失败时丢弃请求体，交由业务层报告绑定错误
fn bound(payload: Result<Form<PatientForm>, FormRejection>) -> Option<PatientForm> {
    match payload {
        Ok(Form(form)) => Some(form),
        Err(rejection) => {
            debug!("Form rejected: {}", rejection.body_text());
            None
        }
    }
}

fn with_message(path: &str, message: &str) -> String {
    match serde_urlencoded::to_string([("message", message)]) {
        Ok(query) => format!("{}?{}", path, query),
        Err(_) => path.to_string(),
    }
}

/// 成功后的跳转
fn redirect(navigation: &Navigation) -> Response {
    let location = match navigation {
        Navigation::Landing { message } => with_message("/", message),
        Navigation::PatientDetails { id, message } => {
            with_message(&format!("{}/{}", PATIENTS_PATH, id), message)
        }
    };
    Redirect::to(&location).into_response()
}

/// 错误处理：选择状态码并渲染通用错误页
fn error_page(state: &AppState, error: &RecordError) -> Response {
    let (status, message) = match error {
        RecordError::Binding(_) => (
            StatusCode::BAD_REQUEST,
            "The submitted patient data could not be read".to_string(),
        ),
        RecordError::NotFound(id) => (
            StatusCode::NOT_FOUND,
            format!("Patient with id {} was not found", id),
        ),
        RecordError::Validation { message, .. } => (StatusCode::UNPROCESSABLE_ENTITY, message.clone()),
        RecordError::Store(e) => {
            error!("Store failure: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "The patient store is unavailable, please try again later".to_string(),
            )
        }
    };

    (status, Html(state.presenter.error_page(&message))).into_response()
}
