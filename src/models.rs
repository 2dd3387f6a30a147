use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use validator::Validate;

#[derive(Serialize, Clone)]
pub struct Player {
    pub id: i64,
    pub name: String,
    pub age: i64,
    pub login_code: String,
    pub phone: Option<String>,
    pub image_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbPlayer {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub age: Option<i64>,
    pub login_code: Option<String>,
    pub phone: Option<String>,
    pub image_path: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl From<DbPlayer> for Player {
    fn from(player: DbPlayer) -> Self {
        Self {
            id: player.id.unwrap_or_default(),
            name: player.name.unwrap_or_default(),
            age: player.age.unwrap_or(DEFAULT_PLAYER_AGE),
            login_code: player.login_code.unwrap_or_default(),
            phone: player.phone,
            image_path: player.image_path,
            created_at: utc_or_now(player.created_at),
            updated_at: utc_or_now(player.updated_at),
        }
    }
}

pub const DEFAULT_PLAYER_AGE: i64 = 12;

#[derive(Serialize, Clone)]
pub struct Instructor {
    pub id: i64,
    pub name: String,
    pub login_code: String,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbInstructor {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub login_code: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

impl From<DbInstructor> for Instructor {
    fn from(instructor: DbInstructor) -> Self {
        Self {
            id: instructor.id.unwrap_or_default(),
            name: instructor.name.unwrap_or_default(),
            login_code: instructor.login_code.unwrap_or_default(),
            created_at: utc_or_now(instructor.created_at),
        }
    }
}

/// One row of the metrics time series, as persisted. Historical rows may be
/// missing the metric name, the value, or carry a timestamp in a legacy
/// format, so everything stays optional and `recorded_at` stays raw text.
#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbMetric {
    pub id: Option<i64>,
    pub player_id: Option<i64>,
    pub metric: Option<String>,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub recorded_at: Option<String>,
    pub source: Option<String>,
    pub entered_by_instructor_id: Option<i64>,
    pub note: Option<String>,
}

#[derive(Serialize, Clone)]
pub struct Note {
    pub id: i64,
    pub player_id: i64,
    pub instructor_id: Option<i64>,
    pub text: String,
    pub shared: bool,
    pub kind: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbNote {
    pub id: Option<i64>,
    pub player_id: Option<i64>,
    pub instructor_id: Option<i64>,
    pub text: Option<String>,
    pub shared: Option<bool>,
    pub kind: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

impl From<DbNote> for Note {
    fn from(note: DbNote) -> Self {
        Self {
            id: note.id.unwrap_or_default(),
            player_id: note.player_id.unwrap_or_default(),
            instructor_id: note.instructor_id,
            text: note.text.unwrap_or_default(),
            shared: note.shared.unwrap_or(true),
            kind: note.kind,
            created_at: utc_or_now(note.created_at),
        }
    }
}

#[derive(Serialize, Clone)]
pub struct Drill {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub video_url: Option<String>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbDrill {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub video_url: Option<String>,
}

impl From<DbDrill> for Drill {
    fn from(drill: DbDrill) -> Self {
        Self {
            id: drill.id.unwrap_or_default(),
            title: drill.title.unwrap_or_default(),
            description: drill.description,
            video_url: drill.video_url,
        }
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DrillStatus {
    Assigned,
    Completed,
    Archived,
}

impl DrillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrillStatus::Assigned => "assigned",
            DrillStatus::Completed => "completed",
            DrillStatus::Archived => "archived",
        }
    }

    pub fn from_str(raw: &str) -> Self {
        match raw {
            "completed" => DrillStatus::Completed,
            "archived" => DrillStatus::Archived,
            _ => DrillStatus::Assigned,
        }
    }
}

#[derive(Serialize, Clone)]
pub struct DrillAssignment {
    pub id: i64,
    pub player_id: i64,
    pub instructor_id: Option<i64>,
    pub drill_id: i64,
    pub drill_title: String,
    pub note: Option<String>,
    pub status: DrillStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbDrillAssignment {
    pub id: Option<i64>,
    pub player_id: Option<i64>,
    pub instructor_id: Option<i64>,
    pub drill_id: Option<i64>,
    pub drill_title: Option<String>,
    pub note: Option<String>,
    pub status: Option<String>,
    pub due_date: Option<NaiveDateTime>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl From<DbDrillAssignment> for DrillAssignment {
    fn from(assignment: DbDrillAssignment) -> Self {
        Self {
            id: assignment.id.unwrap_or_default(),
            player_id: assignment.player_id.unwrap_or_default(),
            instructor_id: assignment.instructor_id,
            drill_id: assignment.drill_id.unwrap_or_default(),
            drill_title: assignment.drill_title.unwrap_or_default(),
            note: assignment.note,
            status: DrillStatus::from_str(&assignment.status.unwrap_or_default()),
            due_date: assignment
                .due_date
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc)),
            created_at: utc_or_now(assignment.created_at),
            updated_at: utc_or_now(assignment.updated_at),
        }
    }
}

#[derive(Serialize, Clone)]
pub struct ReferenceRange {
    pub id: i64,
    pub age_bucket: String,
    pub metric: String,
    pub value: f64,
    pub unit: Option<String>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbReferenceRange {
    pub id: Option<i64>,
    pub age_bucket: Option<String>,
    pub metric: Option<String>,
    pub value: Option<f64>,
    pub unit: Option<String>,
}

impl From<DbReferenceRange> for ReferenceRange {
    fn from(range: DbReferenceRange) -> Self {
        Self {
            id: range.id.unwrap_or_default(),
            age_bucket: range.age_bucket.unwrap_or_default(),
            metric: range.metric.unwrap_or_default(),
            value: range.value.unwrap_or_default(),
            unit: range.unit,
        }
    }
}

// ---- Write-side inputs ----

#[derive(Validate)]
pub struct NewPlayer {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(range(min = 5, max = 99))]
    pub age: Option<i64>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
}

#[derive(Validate)]
pub struct NewMetric {
    pub player_id: i64,
    #[validate(length(min = 1, max = 64))]
    pub metric: String,
    pub value: f64,
    #[validate(length(max = 24))]
    pub unit: Option<String>,
    /// Parsed if possible; an absent or unparsable timestamp defaults to now.
    pub recorded_at: Option<String>,
    pub source: Option<String>,
    pub entered_by_instructor_id: Option<i64>,
    pub note: Option<String>,
}

#[derive(Validate)]
pub struct NewNote {
    pub player_id: i64,
    pub instructor_id: Option<i64>,
    #[validate(length(min = 1))]
    pub text: String,
    pub shared: bool,
    #[validate(length(max = 32))]
    pub kind: Option<String>,
}

#[derive(Validate)]
pub struct NewDrill {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    #[validate(length(max = 500))]
    pub video_url: Option<String>,
}

#[derive(Validate)]
pub struct NewAssignment {
    pub player_id: i64,
    pub drill_id: i64,
    pub instructor_id: Option<i64>,
    pub note: Option<String>,
    pub due_date: Option<String>,
}

// ---- Age buckets & reference math ----

pub fn age_bucket(age: i64) -> &'static str {
    match age {
        7..=9 => "7-9",
        10..=12 => "10-12",
        13..=15 => "13-15",
        16..=18 => "16-18",
        19.. => "18+",
        _ => "Unknown",
    }
}

/// Percent difference vs a reference value (0.10 == +10%). None when the
/// reference is absent or zero.
pub fn percent_delta(value: Option<f64>, reference: Option<f64>) -> Option<f64> {
    let value = value?;
    let reference = reference.filter(|r| *r != 0.0)?;
    Some((value - reference) / reference)
}

fn utc_or_now(dt: Option<NaiveDateTime>) -> DateTime<Utc> {
    dt.map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
        .unwrap_or_else(Utc::now)
}
