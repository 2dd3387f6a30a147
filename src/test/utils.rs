#[cfg(test)]
pub mod test_db {
    use std::collections::HashMap;
    use std::sync::Once;

    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::{Pool, Sqlite};

    use crate::database::reconcile_schema;
    use crate::db::{create_instructor, create_player, record_metric};
    use crate::error::AppError;
    use crate::models::{NewMetric, NewPlayer};

    static INIT: Once = Once::new();

    pub fn init_test_tracing() {
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter("info")
                .with_test_writer()
                .try_init();
        });
    }

    // One connection so every statement in a test sees the same in-memory
    // database.
    pub async fn create_test_pool() -> Pool<Sqlite> {
        init_test_tracing();
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database")
    }

    pub struct TestMetric {
        pub player: String,
        pub metric: String,
        pub value: f64,
        pub recorded_at: Option<String>,
    }

    #[derive(Default)]
    pub struct TestDbBuilder {
        players: Vec<String>,
        instructors: Vec<String>,
        metrics: Vec<TestMetric>,
    }

    impl TestDbBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn player(mut self, name: &str) -> Self {
            self.players.push(name.to_string());
            self
        }

        pub fn instructor(mut self, name: &str) -> Self {
            self.instructors.push(name.to_string());
            self
        }

        pub fn metric(
            mut self,
            player: &str,
            metric: &str,
            value: f64,
            recorded_at: Option<&str>,
        ) -> Self {
            self.metrics.push(TestMetric {
                player: player.to_string(),
                metric: metric.to_string(),
                value,
                recorded_at: recorded_at.map(String::from),
            });
            self
        }

        pub async fn build(self) -> Result<TestDb, AppError> {
            let pool = create_test_pool().await;

            reconcile_schema(&pool).await?;

            let mut player_id_map: HashMap<String, i64> = HashMap::new();
            let mut instructor_id_map: HashMap<String, i64> = HashMap::new();

            for name in &self.instructors {
                let instructor = create_instructor(&pool, name).await?;
                instructor_id_map.insert(name.clone(), instructor.id);
            }

            for name in &self.players {
                let player = create_player(
                    &pool,
                    &NewPlayer {
                        name: name.clone(),
                        age: Some(12),
                        phone: None,
                    },
                )
                .await?;
                player_id_map.insert(name.clone(), player.id);
            }

            for metric in &self.metrics {
                let player_id = player_id_map
                    .get(&metric.player)
                    .copied()
                    .ok_or_else(|| AppError::NotFound(metric.player.clone()))?;

                record_metric(
                    &pool,
                    &NewMetric {
                        player_id,
                        metric: metric.metric.clone(),
                        value: metric.value,
                        unit: None,
                        recorded_at: metric.recorded_at.clone(),
                        source: None,
                        entered_by_instructor_id: None,
                        note: None,
                    },
                )
                .await?;
            }

            Ok(TestDb {
                pool,
                player_id_map,
                instructor_id_map,
            })
        }
    }

    pub struct TestDb {
        pub pool: Pool<Sqlite>,
        pub player_id_map: HashMap<String, i64>,
        pub instructor_id_map: HashMap<String, i64>,
    }

    impl TestDb {
        pub fn player_id(&self, name: &str) -> Option<i64> {
            self.player_id_map.get(name).copied()
        }

        pub fn instructor_id(&self, name: &str) -> Option<i64> {
            self.instructor_id_map.get(name).copied()
        }

        /// Insert a metric row the way an old deployment might have left it:
        /// any of name, value, and timestamp may be missing.
        pub async fn insert_raw_metric(
            &self,
            player_id: i64,
            metric: Option<&str>,
            value: Option<f64>,
            recorded_at: Option<&str>,
        ) -> Result<i64, AppError> {
            let res = sqlx::query(
                "INSERT INTO metrics (player_id, metric, value, recorded_at) VALUES (?, ?, ?, ?)",
            )
            .bind(player_id)
            .bind(metric)
            .bind(value)
            .bind(recorded_at)
            .execute(&self.pool)
            .await?;

            Ok(res.last_insert_rowid())
        }
    }
}
