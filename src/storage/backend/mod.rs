//! SeaORM storage backend
//!
//! SQLite、MySQL/MariaDB 与 PostgreSQL 共用同一套实现。

mod connection;
mod converters;
pub mod retry;
mod tracking;

use sea_orm::DatabaseConnection;
use tracing::warn;

use crate::errors::{RentrouteError, Result};

pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use converters::{
    click_to_active_model, error_entry_to_active_model, landing_to_active_model,
    model_to_error_entry,
};

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(RentrouteError::database_config(format!(
            "无法从 URL 推断数据库类型: {}. 支持的 URL 格式: sqlite://, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: String,
    retry_config: retry::RetryConfig,
}

impl SeaOrmStorage {
    pub async fn new(database_url: &str, backend_name: &str) -> Result<Self> {
        if database_url.is_empty() {
            return Err(RentrouteError::database_config("database_url 未设置"));
        }

        let config = crate::config::get_config();
        let retry_config = retry::RetryConfig::from(&config.database);

        let db = if backend_name == "sqlite" {
            connect_sqlite(database_url).await?
        } else {
            connect_generic(database_url, backend_name).await?
        };

        run_migrations(&db).await?;

        warn!("{} storage initialized.", backend_name.to_uppercase());
        Ok(SeaOrmStorage {
            db,
            backend_name: backend_name.to_string(),
            retry_config,
        })
    }

    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_backend_from_url() {
        assert_eq!(infer_backend_from_url("rentroute.db").unwrap(), "sqlite");
        assert_eq!(
            infer_backend_from_url("sqlite://data/rr.db?mode=rwc").unwrap(),
            "sqlite"
        );
        assert_eq!(
            infer_backend_from_url("mariadb://u:p@localhost/rr").unwrap(),
            "mysql"
        );
        assert_eq!(
            infer_backend_from_url("postgresql://localhost/rr").unwrap(),
            "postgres"
        );
        assert_eq!(
            infer_backend_from_url("redis://localhost").unwrap_err().code(),
            "E001"
        );
    }
}
