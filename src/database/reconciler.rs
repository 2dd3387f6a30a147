use sqlx::{Pool, Row, Sqlite};
use tracing::{error, info, instrument, warn};

use crate::database::schema::{CREATE_INDEXES, CREATE_TABLES, EXPECTED_TABLES};
use crate::error::AppError;

/// What a reconciliation run actually did, for tests and operational logs.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub columns_added: Vec<(String, String)>,
    pub skipped_tables: Vec<String>,
    pub rows_backfilled: u64,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.columns_added.is_empty() && self.skipped_tables.is_empty() && self.rows_backfilled == 0
    }
}

/// Brings the persisted tables up to the column set the application assumes,
/// without a migration history and without touching existing data beyond the
/// one recorded_at backfill. Runs once at startup, before any query path.
pub struct SchemaReconciler {
    pool: Pool<Sqlite>,
}

impl SchemaReconciler {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    #[instrument(skip(self))]
    pub async fn reconcile(&self) -> Result<ReconcileReport, AppError> {
        info!("Reconciling database schema");

        // Missing tables are created whole; everything past this point only
        // extends tables that predate the current column set.
        sqlx::raw_sql(CREATE_TABLES).execute(&self.pool).await?;

        let mut report = ReconcileReport::default();

        for table in EXPECTED_TABLES {
            let present = match self.table_columns(table.name).await {
                Ok(columns) => columns,
                Err(e) => {
                    error!(
                        table = table.name,
                        error = %e,
                        "Could not introspect table, skipping its patch"
                    );
                    report.skipped_tables.push(table.name.to_string());
                    continue;
                }
            };

            for &(column, column_type) in table.required_columns {
                if present.iter().any(|c| c.eq_ignore_ascii_case(column)) {
                    continue;
                }
                self.add_column(table.name, column, column_type).await?;
                info!(table = table.name, column, "Added missing column");
                report
                    .columns_added
                    .push((table.name.to_string(), column.to_string()));
            }
        }

        for &create_index in CREATE_INDEXES {
            if let Err(e) = sqlx::query(create_index).execute(&self.pool).await {
                warn!(error = %e, sql = create_index, "Could not create index, continuing");
            }
        }

        if !report.skipped_tables.iter().any(|t| t == "metrics") {
            report.rows_backfilled = self.backfill_recorded_at().await?;
        }

        info!(
            columns_added = report.columns_added.len(),
            rows_backfilled = report.rows_backfilled,
            "Schema reconciliation complete"
        );
        Ok(report)
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query(&format!("PRAGMA table_info({})", table))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| row.get::<String, _>("name"))
            .collect())
    }

    /// Two instances starting at once can race the same ALTER; the loser's
    /// "duplicate column name" is success, not failure.
    pub(crate) async fn add_column(
        &self,
        table: &str,
        column: &str,
        column_type: &str,
    ) -> Result<(), AppError> {
        let sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, column_type);
        match sqlx::query(&sql).execute(&self.pool).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_column(&e) => {
                warn!(table, column, "Column already present, treating add as success");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Every metric row must leave reconciliation with a usable timestamp:
    /// prefer a legacy created_at column where one exists, else now.
    async fn backfill_recorded_at(&self) -> Result<u64, AppError> {
        let columns = self.table_columns("metrics").await?;
        let fallback = if columns.iter().any(|c| c == "created_at") {
            "COALESCE(created_at, CURRENT_TIMESTAMP)"
        } else {
            "CURRENT_TIMESTAMP"
        };

        let result = sqlx::query(&format!(
            "UPDATE metrics SET recorded_at = {} WHERE recorded_at IS NULL",
            fallback
        ))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            info!(
                rows = result.rows_affected(),
                "Backfilled recorded_at on legacy metric rows"
            );
        }
        Ok(result.rows_affected())
    }
}

fn is_duplicate_column(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.message().contains("duplicate column name"),
        _ => false,
    }
}

#[instrument(skip(pool))]
pub async fn reconcile_schema(pool: &Pool<Sqlite>) -> Result<ReconcileReport, AppError> {
    SchemaReconciler::new(pool.clone()).reconcile().await
}
