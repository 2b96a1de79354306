//! 病历服务器主程序

use std::sync::Arc;

use clap::Parser;
use clinic_admin::{init_logging, with_bootstrap_logging, ClinicConfig, ConfigManager};
use clinic_database::{ConnectOptions, DatabasePool, MemoryStore, PatientStore, PgPatientStore};
use clinic_web::{AppState, WebServer};
use tracing::{error, info, warn};

/// 病历服务器命令行参数
#[derive(Parser, Debug)]
#[command(name = "clinic-server")]
#[command(about = "Patient records web service")]
struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 监听主机
    #[arg(long)]
    host: Option<String>,

    /// 监听端口
    #[arg(short, long)]
    port: Option<u16>,

    /// PostgreSQL 连接字符串
    #[arg(short, long)]
    database_url: Option<String>,

    /// 使用内存存储（数据在进程退出后丢失）
    #[arg(long)]
    in_memory: bool,

    /// 日志级别
    #[arg(short, long)]
    log_level: Option<String>,
}

impl Args {
    /// 命令行参数覆盖配置文件和环境变量
    fn apply(&self, config: &mut ClinicConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(url) = &self.database_url {
            config.database.url = url.clone();
        }
        if self.in_memory {
            config.database.in_memory = true;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

async fn build_store(config: &ClinicConfig) -> anyhow::Result<Arc<dyn PatientStore>> {
    if config.database.in_memory {
        warn!("Using in-memory patient store, records will not survive a restart");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let options = ConnectOptions {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        min_connections: config.database.min_connections,
        connect_timeout: config.database.connect_timeout(),
    };
    let pool = DatabasePool::connect(&options).await?;
    pool.bootstrap_schema().await?;

    Ok(Arc::new(PgPatientStore::new(pool)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 配置决定日志格式，加载期间先用临时订阅者
    let config = with_bootstrap_logging(|| -> anyhow::Result<ClinicConfig> {
        let mut manager = ConfigManager::new(args.config.as_deref())?;
        manager.update_config(|config| args.apply(config))?;
        Ok(manager.into_config())
    })?;

    // 初始化日志
    init_logging(&config.logging)?;

    info!("Starting clinic server...");
    info!("  Listen address: {}:{}", config.server.host, config.server.port);
    info!("  In-memory store: {}", config.database.in_memory);

    let addr = config.server.socket_addr()?;
    let store = build_store(&config).await?;
    let server = WebServer::new(addr, AppState::new(store));

    if let Err(e) = server.run().await {
        error!("Server failed: {}", e);
        return Err(e);
    }

    Ok(())
}
