//! 数据库连接管理

use clinic_core::{ClinicError, Result};
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Postgres;
use std::time::Duration;
use tracing::info;

use crate::queries::DatabaseQueries;

/// 连接池参数
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
}

/// 数据库连接池
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// 建立连接池
    pub async fn connect(options: &ConnectOptions) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .min_connections(options.min_connections)
            .acquire_timeout(options.connect_timeout)
            .connect(&options.url)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        info!(
            max_connections = options.max_connections,
            "Database pool established"
        );
        Ok(Self { pool })
    }

    /// 从池中取出一个连接，连接在 drop 时归还
    pub async fn acquire(&self) -> Result<PoolConnection<Postgres>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))
    }

    /// 创建表和索引
    pub async fn bootstrap_schema(&self) -> Result<()> {
        let mut conn = self.acquire().await?;
        DatabaseQueries::new(&mut conn).create_tables().await
    }
}
