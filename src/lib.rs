//! Data core of the Hit4Power coaching app: schema reconciliation, the
//! metric query engine, and the store functions the web layer calls.

pub mod codes;
pub mod database;
pub mod db;
pub mod env;
pub mod error;
pub mod models;
pub mod telemetry;

#[cfg(test)]
mod test;

pub use database::{
    AlignedSeries, DASHBOARD_METRICS, LatestMetric, ReconcileReport, SeriesPoint, aligned_series,
    latest_metrics, metric_series, reconcile_schema, startup,
};
pub use error::AppError;
