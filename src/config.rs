use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::db::DbConfig;
use crate::service::PROFILE_EDIT_PATH;

/// Process configuration read from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub data_dir: Option<PathBuf>,
    pub bind_addr: String,
    pub port: u16,
    pub frontend_url: Option<String>,
    pub profile_paths: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any name -> value source.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| get(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let profile_paths = non_empty("REVALIDATE_PROFILE_PATHS")
            .map(|v| v.split(',').map(str::trim).filter(|p| !p.is_empty()).map(str::to_string).collect())
            .unwrap_or_else(|| vec![PROFILE_EDIT_PATH.to_string()]);
        Self {
            database_url: non_empty("DATABASE_URL"),
            db_max_connections: parsed(&get, "DB_MAX_CONNECTIONS").unwrap_or(5),
            db_acquire_timeout: Duration::from_secs(parsed(&get, "DB_ACQUIRE_TIMEOUT_SECS").unwrap_or(5)),
            data_dir: non_empty("NEXIO_DATA_DIR").map(PathBuf::from),
            bind_addr: non_empty("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".into()),
            port: parsed(&get, "PORT").unwrap_or(8080),
            frontend_url: non_empty("FRONTEND_URL"),
            profile_paths,
        }
    }

    pub fn db_config(&self) -> Option<DbConfig> {
        self.database_url.as_ref().map(|url| DbConfig {
            url: url.clone(),
            max_connections: self.db_max_connections,
            acquire_timeout: self.db_acquire_timeout,
        })
    }
}

// Unparsable or out-of-range values read as unset.
fn parsed<T: FromStr>(get: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    get(name).and_then(|v| v.trim().parse::<T>().ok())
}
