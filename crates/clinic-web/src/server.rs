//! Web服务器

use axum::{
    routing::get,
    Router,
};
use clinic_database::PatientStore;
use clinic_records::PatientRecordService;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::handlers::{
    create_patient, delete_patient, edit_patient_form, health, landing, new_patient_form,
    patient_details, search_patients, update_patient,
};
use crate::views::{HtmlPresenter, Presenter};

/// 处理器共享状态
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PatientRecordService>,
    pub presenter: Arc<dyn Presenter>,
    pub store: Arc<dyn PatientStore>,
}

impl AppState {
    /// 使用默认 HTML 视图
    pub fn new(store: Arc<dyn PatientStore>) -> Self {
        Self {
            service: Arc::new(PatientRecordService::new(Arc::clone(&store))),
            presenter: Arc::new(HtmlPresenter::new()),
            store,
        }
    }
}

pub struct WebServer {
    addr: SocketAddr,
    app: Router,
}

impl WebServer {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        let app = create_app(state);

        Self { addr, app }
    }

    /// 运行直到收到 Ctrl-C
    pub async fn run(self) -> anyhow::Result<()> {
        info!("Starting web server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start web server: {}", e))?;

        info!("Web server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// 组装路由
pub fn create_app(state: AppState) -> Router {
    Router::new()
        // 首页
        .route("/", get(landing))

        // 健康检查
        .route("/health", get(health))

        // 患者管理路由
        .nest("/patient-management", patient_routes())

        // 全局中间件
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}

/// 患者路由，挂载在 `/patient-management` 下
fn patient_routes() -> Router<AppState> {
    Router::new()
        .route("/patients", get(new_patient_form).post(create_patient))
        .route("/patients/search", get(search_patients))
        .route(
            "/patients/:id",
            get(patient_details).post(update_patient).delete(delete_patient),
        )
        .route("/patients/:id/edit", get(edit_patient_form))
}
