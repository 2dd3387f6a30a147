pub mod queries;
pub mod reconciler;
pub mod schema;

pub use queries::*;
pub use reconciler::*;
pub use schema::*;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::error::AppError;

#[instrument]
pub async fn connect_pool(database_url: &str) -> Result<Pool<Sqlite>, AppError> {
    info!("Connecting to database");

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Connect and reconcile in one step. The pool is only handed back once the
/// reconciler has finished, so no caller ever races a structural change.
#[instrument]
pub async fn startup(database_url: &str) -> Result<Pool<Sqlite>, AppError> {
    let pool = connect_pool(database_url).await?;
    reconcile_schema(&pool).await?;
    Ok(pool)
}
