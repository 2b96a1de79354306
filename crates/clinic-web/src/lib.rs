//! # 病历Web模块
//!
//! 患者管理的HTTP路由、处理器和服务端渲染视图。

pub mod handlers;
pub mod server;
pub mod views;

pub use server::{create_app, AppState, WebServer};
pub use views::{HtmlPresenter, Presenter};

/// 患者资源路径前缀
pub const PATIENTS_PATH: &str = "/patient-management/patients";
