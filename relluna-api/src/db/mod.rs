//! Database access for relluna-api

pub mod memories;
pub mod users;

use relluna_common::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Open the shared database and ensure the schema exists
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    tracing::debug!("Connecting to database: {}", db_path.display());
    relluna_common::db::init_database(db_path).await
}
