use chrono::Utc;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::codes::{generate_code, normalize_code};
use crate::database::queries::parse_timestamp;
use crate::error::AppError;
use crate::models::{
    DbDrill, DbDrillAssignment, DbInstructor, DbNote, DbPlayer, Drill, DrillAssignment,
    DrillStatus, Instructor, NewAssignment, NewDrill, NewMetric, NewNote, NewPlayer, Note, Player,
};

const CODE_ATTEMPTS: u32 = 5;

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.message().contains("UNIQUE constraint failed"),
        _ => false,
    }
}

// ---- Players ----

#[instrument(skip(pool, new_player))]
pub async fn create_player(pool: &Pool<Sqlite>, new_player: &NewPlayer) -> Result<Player, AppError> {
    info!("Creating player");
    new_player.validate()?;

    for _ in 0..CODE_ATTEMPTS {
        let code = normalize_code(&generate_code("P", 6));

        let result = sqlx::query(
            "INSERT INTO players (name, age, login_code, phone) VALUES (?, ?, ?, ?)",
        )
        .bind(new_player.name.trim())
        .bind(new_player.age)
        .bind(&code)
        .bind(&new_player.phone)
        .execute(pool)
        .await;

        match result {
            Ok(res) => return get_player(pool, res.last_insert_rowid()).await,
            Err(e) if is_unique_violation(&e) => {
                warn!("Login code collision, regenerating");
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::Internal(
        "Could not allocate a unique login code".to_string(),
    ))
}

#[instrument(skip(pool))]
pub async fn get_player(pool: &Pool<Sqlite>, id: i64) -> Result<Player, AppError> {
    info!("Fetching player by ID");
    let row: Option<DbPlayer> = sqlx::query_as(
        "SELECT id, name, age, login_code, phone, image_path, created_at, updated_at
         FROM players WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(player) => Ok(Player::from(player)),
        _ => Err(AppError::NotFound(format!(
            "Player with id {} not found in database",
            id
        ))),
    }
}

#[instrument(skip_all)]
pub async fn find_player_by_code(
    pool: &Pool<Sqlite>,
    code: &str,
) -> Result<Option<Player>, AppError> {
    info!("Looking up player by login code");
    let normalized = normalize_code(code);
    if normalized.is_empty() {
        return Ok(None);
    }

    let row: Option<DbPlayer> = sqlx::query_as(
        "SELECT id, name, age, login_code, phone, image_path, created_at, updated_at
         FROM players WHERE login_code = ?",
    )
    .bind(&normalized)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Player::from))
}

#[instrument(skip(pool))]
pub async fn list_players(pool: &Pool<Sqlite>) -> Result<Vec<Player>, AppError> {
    info!("Listing players");
    let rows: Vec<DbPlayer> = sqlx::query_as(
        "SELECT id, name, age, login_code, phone, image_path, created_at, updated_at
         FROM players ORDER BY id ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Player::from).collect())
}

/// Session count shown on the roster; a "session" is a recorded metric entry.
#[instrument(skip(pool))]
pub async fn count_player_sessions(pool: &Pool<Sqlite>, player_id: i64) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM metrics WHERE player_id = ?")
        .bind(player_id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}

// ---- Instructors ----

#[instrument(skip(pool))]
pub async fn create_instructor(pool: &Pool<Sqlite>, name: &str) -> Result<Instructor, AppError> {
    info!("Creating instructor");
    if name.trim().is_empty() {
        return Err(AppError::Validation(
            "Instructor name must not be empty".to_string(),
        ));
    }

    for _ in 0..CODE_ATTEMPTS {
        let code = normalize_code(&generate_code("C", 6));

        let result = sqlx::query("INSERT INTO instructors (name, login_code) VALUES (?, ?)")
            .bind(name.trim())
            .bind(&code)
            .execute(pool)
            .await;

        match result {
            Ok(res) => return get_instructor(pool, res.last_insert_rowid()).await,
            Err(e) if is_unique_violation(&e) => {
                warn!("Login code collision, regenerating");
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::Internal(
        "Could not allocate a unique login code".to_string(),
    ))
}

#[instrument(skip(pool))]
pub async fn get_instructor(pool: &Pool<Sqlite>, id: i64) -> Result<Instructor, AppError> {
    let row: Option<DbInstructor> = sqlx::query_as(
        "SELECT id, name, login_code, created_at FROM instructors WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(instructor) => Ok(Instructor::from(instructor)),
        _ => Err(AppError::NotFound(format!(
            "Instructor with id {} not found in database",
            id
        ))),
    }
}

#[instrument(skip_all)]
pub async fn find_instructor_by_code(
    pool: &Pool<Sqlite>,
    code: &str,
) -> Result<Option<Instructor>, AppError> {
    info!("Looking up instructor by login code");
    let normalized = normalize_code(code);
    if normalized.is_empty() {
        return Ok(None);
    }

    let row: Option<DbInstructor> = sqlx::query_as(
        "SELECT id, name, login_code, created_at FROM instructors WHERE login_code = ?",
    )
    .bind(&normalized)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Instructor::from))
}

/// Seed fallback: a brand-new deployment gets one instructor so the roster
/// screens have an owner before anyone is created explicitly.
#[instrument(skip(pool))]
pub async fn ensure_default_instructor(pool: &Pool<Sqlite>) -> Result<Instructor, AppError> {
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM instructors ORDER BY id LIMIT 1")
        .fetch_optional(pool)
        .await?;

    match existing {
        Some(id) => get_instructor(pool, id).await,
        None => {
            info!("No instructors present, seeding default");
            create_instructor(pool, "Coach").await
        }
    }
}

// ---- Metrics ----

/// Plain append of one metric observation. The canonical timestamp is fixed
/// here, at write time: the caller's value when parsable, otherwise now.
#[instrument(skip(pool, new_metric))]
pub async fn record_metric(pool: &Pool<Sqlite>, new_metric: &NewMetric) -> Result<i64, AppError> {
    info!("Recording metric");
    new_metric.validate()?;
    if new_metric.metric.trim().is_empty() {
        return Err(AppError::Validation(
            "Metric name must not be empty".to_string(),
        ));
    }
    if !new_metric.value.is_finite() {
        return Err(AppError::Validation(
            "Metric value must be a finite number".to_string(),
        ));
    }

    let recorded_at = new_metric
        .recorded_at
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or_else(|| Utc::now().naive_utc());

    let res = sqlx::query(
        "INSERT INTO metrics
            (player_id, metric, value, unit, recorded_at, source, entered_by_instructor_id, note)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(new_metric.player_id)
    .bind(new_metric.metric.trim())
    .bind(new_metric.value)
    .bind(&new_metric.unit)
    .bind(recorded_at)
    .bind(new_metric.source.as_deref().unwrap_or("manual"))
    .bind(new_metric.entered_by_instructor_id)
    .bind(&new_metric.note)
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

// ---- Notes ----

#[instrument(skip(pool, new_note))]
pub async fn add_note(pool: &Pool<Sqlite>, new_note: &NewNote) -> Result<i64, AppError> {
    info!("Adding note");
    new_note.validate()?;

    let res = sqlx::query(
        "INSERT INTO notes (player_id, instructor_id, text, shared, kind) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(new_note.player_id)
    .bind(new_note.instructor_id)
    .bind(new_note.text.trim())
    .bind(new_note.shared)
    .bind(&new_note.kind)
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

/// Notes visible to the player, newest first. Instructor-only notes never
/// leave this filter.
#[instrument(skip(pool))]
pub async fn shared_notes(
    pool: &Pool<Sqlite>,
    player_id: i64,
    limit: i64,
) -> Result<Vec<Note>, AppError> {
    info!("Fetching shared notes");
    let rows: Vec<DbNote> = sqlx::query_as(
        "SELECT id, player_id, instructor_id, text, shared, kind, created_at
         FROM notes
         WHERE player_id = ? AND shared = 1
         ORDER BY created_at DESC, id DESC
         LIMIT ?",
    )
    .bind(player_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Note::from).collect())
}

#[instrument(skip(pool))]
pub async fn latest_shared_note(
    pool: &Pool<Sqlite>,
    player_id: i64,
) -> Result<Option<Note>, AppError> {
    let row: Option<DbNote> = sqlx::query_as(
        "SELECT id, player_id, instructor_id, text, shared, kind, created_at
         FROM notes
         WHERE player_id = ? AND shared = 1
         ORDER BY created_at DESC, id DESC
         LIMIT 1",
    )
    .bind(player_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Note::from))
}

// ---- Drills ----

#[instrument(skip(pool, new_drill))]
pub async fn create_drill(pool: &Pool<Sqlite>, new_drill: &NewDrill) -> Result<Drill, AppError> {
    info!("Creating drill");
    new_drill.validate()?;

    let res = sqlx::query("INSERT INTO drills (title, description, video_url) VALUES (?, ?, ?)")
        .bind(new_drill.title.trim())
        .bind(&new_drill.description)
        .bind(&new_drill.video_url)
        .execute(pool)
        .await?;

    let row: DbDrill =
        sqlx::query_as("SELECT id, title, description, video_url FROM drills WHERE id = ?")
            .bind(res.last_insert_rowid())
            .fetch_one(pool)
            .await?;

    Ok(Drill::from(row))
}

#[instrument(skip(pool, new_assignment))]
pub async fn assign_drill(
    pool: &Pool<Sqlite>,
    new_assignment: &NewAssignment,
) -> Result<i64, AppError> {
    info!("Assigning drill to player");
    new_assignment.validate()?;

    let due_date = new_assignment.due_date.as_deref().and_then(parse_timestamp);

    let res = sqlx::query(
        "INSERT INTO drill_assignments (player_id, instructor_id, drill_id, note, status, due_date)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(new_assignment.player_id)
    .bind(new_assignment.instructor_id)
    .bind(new_assignment.drill_id)
    .bind(&new_assignment.note)
    .bind(DrillStatus::Assigned.as_str())
    .bind(due_date)
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool))]
pub async fn update_assignment_status(
    pool: &Pool<Sqlite>,
    assignment_id: i64,
    status: DrillStatus,
) -> Result<(), AppError> {
    info!("Updating drill assignment status");
    let now = Utc::now().naive_utc();

    sqlx::query("UPDATE drill_assignments SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(now)
        .bind(assignment_id)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn assignments_for_player(
    pool: &Pool<Sqlite>,
    player_id: i64,
    limit: i64,
) -> Result<Vec<DrillAssignment>, AppError> {
    info!("Fetching drill assignments");
    let rows: Vec<DbDrillAssignment> = sqlx::query_as(
        "SELECT da.id, da.player_id, da.instructor_id, da.drill_id, da.note, da.status,
                da.due_date, da.created_at, da.updated_at, d.title AS drill_title
         FROM drill_assignments da
         LEFT JOIN drills d ON d.id = da.drill_id
         WHERE da.player_id = ?
         ORDER BY da.created_at DESC, da.id DESC
         LIMIT ?",
    )
    .bind(player_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(DrillAssignment::from).collect())
}

// ---- Favorites ----

/// Star or unstar a player for an instructor. Returns the new state. The
/// (instructor, player) pair is unique, so a racing duplicate insert lands
/// as "already starred".
#[instrument(skip(pool))]
pub async fn toggle_favorite(
    pool: &Pool<Sqlite>,
    instructor_id: i64,
    player_id: i64,
) -> Result<bool, AppError> {
    info!("Toggling favorite");
    let existing: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM favorites WHERE instructor_id = ? AND player_id = ? LIMIT 1",
    )
    .bind(instructor_id)
    .bind(player_id)
    .fetch_optional(pool)
    .await?;

    match existing {
        Some(id) => {
            sqlx::query("DELETE FROM favorites WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await?;
            Ok(false)
        }
        None => {
            let result =
                sqlx::query("INSERT INTO favorites (instructor_id, player_id) VALUES (?, ?)")
                    .bind(instructor_id)
                    .bind(player_id)
                    .execute(pool)
                    .await;
            match result {
                Ok(_) => Ok(true),
                Err(e) if is_unique_violation(&e) => Ok(true),
                Err(e) => Err(e.into()),
            }
        }
    }
}

#[instrument(skip(pool))]
pub async fn is_favorite(
    pool: &Pool<Sqlite>,
    instructor_id: i64,
    player_id: i64,
) -> Result<bool, AppError> {
    let existing: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM favorites WHERE instructor_id = ? AND player_id = ? LIMIT 1",
    )
    .bind(instructor_id)
    .bind(player_id)
    .fetch_optional(pool)
    .await?;

    Ok(existing.is_some())
}

// ---- Reference ranges ----

#[instrument(skip(pool))]
pub async fn upsert_reference_range(
    pool: &Pool<Sqlite>,
    age_bucket: &str,
    metric: &str,
    value: f64,
    unit: Option<&str>,
) -> Result<(), AppError> {
    info!("Upserting reference range");
    sqlx::query(
        "INSERT INTO reference_ranges (age_bucket, metric, value, unit)
         VALUES (?, ?, ?, ?)
         ON CONFLICT (age_bucket, metric)
         DO UPDATE SET value = excluded.value, unit = excluded.unit",
    )
    .bind(age_bucket)
    .bind(metric)
    .bind(value)
    .bind(unit)
    .execute(pool)
    .await?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn reference_value(
    pool: &Pool<Sqlite>,
    age_bucket: &str,
    metric: &str,
) -> Result<Option<f64>, AppError> {
    let value: Option<f64> = sqlx::query_scalar(
        "SELECT value FROM reference_ranges WHERE age_bucket = ? AND metric = ?",
    )
    .bind(age_bucket)
    .bind(metric)
    .fetch_optional(pool)
    .await?;

    Ok(value)
}
