use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::DbMetric;

/// The three series the player dashboard charts.
pub const DASHBOARD_METRICS: [&str; 3] = ["exit_velocity", "launch_angle", "spin_rate"];

/// Upper bound on raw rows examined per query. Scans walk backwards from the
/// newest insertions, so the window always covers the rows a dashboard shows.
const SCAN_LIMIT: i64 = 2000;

/// Best-effort parse of a stored timestamp. Legacy rows carry full datetimes,
/// date-only strings, or free text; anything unparsable is "unknown recency".
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// Canonical YYYY-MM-DD chart label. An unparsable timestamp keeps its raw
/// text so the row stays visible instead of disappearing behind a blank.
pub fn date_label(raw: &str) -> String {
    match parse_timestamp(raw) {
        Some(dt) => dt.format("%Y-%m-%d").to_string(),
        None => raw.trim().to_string(),
    }
}

/// Ordering proxy for "most recent": parsed timestamp first, insertion id as
/// the tie-break. Rows without a usable timestamp (None) sort before every
/// dated row, so they only win a group when no dated row exists.
fn recency(row: &DbMetric) -> (Option<NaiveDateTime>, i64) {
    (
        row.recorded_at.as_deref().and_then(parse_timestamp),
        row.id.unwrap_or_default(),
    )
}

async fn metric_rows(
    pool: &Pool<Sqlite>,
    player_id: i64,
    metric: Option<&str>,
) -> Result<Vec<DbMetric>, AppError> {
    let rows: Vec<DbMetric> = match metric {
        Some(metric) => {
            sqlx::query_as(
                "SELECT id, player_id, metric, value, unit, recorded_at, source, entered_by_instructor_id, note
                 FROM metrics
                 WHERE player_id = ? AND metric = ?
                 ORDER BY id DESC
                 LIMIT ?",
            )
            .bind(player_id)
            .bind(metric)
            .bind(SCAN_LIMIT)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as(
                "SELECT id, player_id, metric, value, unit, recorded_at, source, entered_by_instructor_id, note
                 FROM metrics
                 WHERE player_id = ?
                 ORDER BY id DESC
                 LIMIT ?",
            )
            .bind(player_id)
            .bind(SCAN_LIMIT)
            .fetch_all(pool)
            .await?
        }
    };
    Ok(rows)
}

#[derive(Debug, Serialize, Clone)]
pub struct LatestMetric {
    pub metric: String,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub recorded_at: String,
    pub source: Option<String>,
    pub entered_by_instructor_id: Option<i64>,
    pub note: Option<String>,
}

/// Latest value of each named metric for one player, ordered by metric name.
/// A player with no rows (or no player at all) yields an empty vec.
#[instrument(skip(pool))]
pub async fn latest_metrics(
    pool: &Pool<Sqlite>,
    player_id: i64,
) -> Result<Vec<LatestMetric>, AppError> {
    info!("Fetching latest value per metric");

    let rows = metric_rows(pool, player_id, None).await?;

    // Rows whose metric name never got written can't be keyed by name; they
    // still count elsewhere (session counts) but have no place here.
    let mut latest: BTreeMap<String, DbMetric> = BTreeMap::new();
    for row in rows {
        let Some(name) = row.metric.clone().filter(|m| !m.trim().is_empty()) else {
            continue;
        };
        let newer = match latest.get(&name) {
            Some(current) => recency(&row) > recency(current),
            None => true,
        };
        if newer {
            latest.insert(name, row);
        }
    }

    Ok(latest
        .into_iter()
        .map(|(metric, row)| LatestMetric {
            metric,
            value: row.value,
            unit: row.unit,
            recorded_at: row.recorded_at.unwrap_or_default(),
            source: row.source,
            entered_by_instructor_id: row.entered_by_instructor_id,
            note: row.note,
        })
        .collect())
}

/// One charted day. `value` is None when the winning row never had a value
/// written (schema drift); callers can tell that apart from a real zero.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SeriesPoint {
    pub label: String,
    pub value: Option<f64>,
}

/// Chronological day-bucketed series of one metric for charting. Within a
/// day the later row (by timestamp, then id) wins; `limit` keeps the most
/// recent buckets. Days with unparsable timestamps sort after dated ones
/// under their raw-text label rather than being discarded.
#[instrument(skip(pool))]
pub async fn metric_series(
    pool: &Pool<Sqlite>,
    player_id: i64,
    metric: &str,
    limit: usize,
) -> Result<Vec<SeriesPoint>, AppError> {
    info!("Building chart series");

    let rows = metric_rows(pool, player_id, Some(metric)).await?;

    let mut by_label: BTreeMap<String, DbMetric> = BTreeMap::new();
    for row in rows {
        let label = date_label(row.recorded_at.as_deref().unwrap_or(""));
        let newer = match by_label.get(&label) {
            Some(current) => recency(&row) > recency(current),
            None => true,
        };
        if newer {
            by_label.insert(label, row);
        }
    }

    let mut points: Vec<(Option<NaiveDate>, SeriesPoint)> = by_label
        .into_iter()
        .map(|(label, row)| {
            let day = NaiveDate::parse_from_str(&label, "%Y-%m-%d").ok();
            (
                day,
                SeriesPoint {
                    label,
                    value: row.value,
                },
            )
        })
        .collect();
    points.sort_by(|a, b| compare_days(&a.0, &b.0, &a.1.label, &b.1.label));

    let mut series: Vec<SeriesPoint> = points.into_iter().map(|(_, point)| point).collect();
    if series.len() > limit {
        series.drain(..series.len() - limit);
    }
    Ok(series)
}

fn compare_days(
    a: &Option<NaiveDate>,
    b: &Option<NaiveDate>,
    a_label: &str,
    b_label: &str,
) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a_label.cmp(b_label),
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct MetricSeries {
    pub metric: String,
    pub values: Vec<Option<f64>>,
}

/// Several metrics over one shared label axis. A metric with no row for a
/// label carries an explicit None there, never a silently shifted array.
#[derive(Debug, Serialize, Clone)]
pub struct AlignedSeries {
    pub labels: Vec<String>,
    pub series: Vec<MetricSeries>,
}

impl AlignedSeries {
    /// The JSON shape the template layer hands to its chart widget; absent
    /// values serialize as null, not zero.
    pub fn chart_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "labels": self.labels,
            "series": self.series,
        })
    }
}

#[instrument(skip(pool))]
pub async fn aligned_series(
    pool: &Pool<Sqlite>,
    player_id: i64,
    metrics: &[&str],
    limit: usize,
) -> Result<AlignedSeries, AppError> {
    info!("Aligning chart series");

    let mut per_metric: Vec<(String, Vec<SeriesPoint>)> = Vec::with_capacity(metrics.len());
    for &metric in metrics {
        let series = metric_series(pool, player_id, metric, limit).await?;
        per_metric.push((metric.to_string(), series));
    }

    let mut label_days: BTreeMap<String, Option<NaiveDate>> = BTreeMap::new();
    for (_, series) in &per_metric {
        for point in series {
            label_days
                .entry(point.label.clone())
                .or_insert_with(|| NaiveDate::parse_from_str(&point.label, "%Y-%m-%d").ok());
        }
    }

    let mut labels: Vec<(Option<NaiveDate>, String)> = label_days
        .into_iter()
        .map(|(label, day)| (day, label))
        .collect();
    labels.sort_by(|a, b| compare_days(&a.0, &b.0, &a.1, &b.1));
    let mut labels: Vec<String> = labels.into_iter().map(|(_, label)| label).collect();
    if labels.len() > limit {
        labels.drain(..labels.len() - limit);
    }

    let series = per_metric
        .into_iter()
        .map(|(metric, points)| {
            let by_label: BTreeMap<&str, Option<f64>> = points
                .iter()
                .map(|point| (point.label.as_str(), point.value))
                .collect();
            MetricSeries {
                metric,
                values: labels
                    .iter()
                    .map(|label| by_label.get(label.as_str()).copied().flatten())
                    .collect(),
            }
        })
        .collect();

    Ok(AlignedSeries { labels, series })
}
