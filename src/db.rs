use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio::sync::OnceCell;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DbConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), max_connections: 5, acquire_timeout: Duration::from_secs(5) }
    }
}

/// Shared handle to the Postgres pool.
///
/// The pool is created on first use. Concurrent callers during a cold start
/// wait on the same connect attempt; a failed attempt leaves the handle
/// unconnected so the next caller tries again.
pub struct Database {
    cfg: DbConfig,
    pool: OnceCell<PgPool>,
}

impl Database {
    pub fn new(cfg: DbConfig) -> Self {
        Self { cfg, pool: OnceCell::new() }
    }

    pub fn is_connected(&self) -> bool {
        self.pool.initialized()
    }

    pub async fn pool(&self) -> Result<&PgPool, sqlx::Error> {
        self.pool
            .get_or_try_init(|| async {
                let pool = PgPoolOptions::new()
                    .max_connections(self.cfg.max_connections)
                    .acquire_timeout(self.cfg.acquire_timeout)
                    .connect(&self.cfg.url)
                    .await
                    .map_err(|e| {
                        warn!("database connect failed: {e}");
                        e
                    })?;
                info!(max_connections = self.cfg.max_connections, "database connected");
                Ok::<_, sqlx::Error>(pool)
            })
            .await
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        let pool = self.pool().await?;
        sqlx::migrate!("./migrations").run(pool).await
    }

    pub async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            pool.close().await;
        }
    }
}
