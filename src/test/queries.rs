#[cfg(test)]
mod tests {
    use crate::database::{
        aligned_series, date_label, latest_metrics, metric_series, parse_timestamp,
    };
    use crate::db::count_player_sessions;
    use crate::test::utils::test_db::TestDbBuilder;

    #[test]
    fn parse_timestamp_accepts_the_formats_seen_in_the_wild() {
        assert!(parse_timestamp("2024-05-01 12:30:00").is_some());
        assert!(parse_timestamp("2024-05-01T12:30:00").is_some());
        assert!(parse_timestamp("2024-05-01T12:30:00.123Z").is_some());
        assert!(parse_timestamp("2024-05-01").is_some());
        assert!(parse_timestamp("last tuesday").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn date_label_never_blanks_a_row() {
        assert_eq!(date_label("2024-05-01 12:30:00"), "2024-05-01");
        assert_eq!(date_label("2024-05-01"), "2024-05-01");
        assert_eq!(date_label("last tuesday"), "last tuesday");
    }

    #[tokio::test]
    async fn latest_value_per_metric_name() {
        let db = TestDbBuilder::new()
            .player("Reese")
            .metric("Reese", "exit_velocity", 90.0, Some("2024-05-01 10:00:00"))
            .metric("Reese", "launch_angle", 12.0, Some("2024-05-02 10:00:00"))
            .metric("Reese", "exit_velocity", 92.0, Some("2024-05-03 10:00:00"))
            .build()
            .await
            .expect("failed to build test db");

        let latest = latest_metrics(&db.pool, db.player_id("Reese").unwrap())
            .await
            .expect("query failed");

        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].metric, "exit_velocity");
        assert_eq!(latest[0].value, Some(92.0));
        assert_eq!(date_label(&latest[0].recorded_at), "2024-05-03");
        assert_eq!(latest[1].metric, "launch_angle");
        assert_eq!(latest[1].value, Some(12.0));
    }

    #[tokio::test]
    async fn identical_timestamps_resolve_stably_to_the_later_insert() {
        let db = TestDbBuilder::new()
            .player("Reese")
            .metric("Reese", "exit_velocity", 90.0, Some("2024-05-03 10:00:00"))
            .metric("Reese", "exit_velocity", 91.0, Some("2024-05-03 10:00:00"))
            .build()
            .await
            .expect("failed to build test db");

        let player_id = db.player_id("Reese").unwrap();
        for _ in 0..3 {
            let latest = latest_metrics(&db.pool, player_id).await.expect("query failed");
            assert_eq!(latest.len(), 1);
            assert_eq!(latest[0].value, Some(91.0));
        }
    }

    #[tokio::test]
    async fn recorded_scenario() {
        // Player 7: two exit velocity readings and one spin rate reading.
        let db = TestDbBuilder::new().build().await.expect("failed to build test db");
        sqlx::query("INSERT INTO players (id, name, login_code) VALUES (7, 'Scenario', 'SCEN777')")
            .execute(&db.pool)
            .await
            .unwrap();
        for (metric, value, day) in [
            ("exit_velocity", 88.5, "2024-05-01"),
            ("exit_velocity", 91.0, "2024-05-03"),
            ("spin_rate", 2200.0, "2024-05-03"),
        ] {
            sqlx::query(
                "INSERT INTO metrics (player_id, metric, value, recorded_at) VALUES (7, ?, ?, ?)",
            )
            .bind(metric)
            .bind(value)
            .bind(day)
            .execute(&db.pool)
            .await
            .unwrap();
        }

        let latest = latest_metrics(&db.pool, 7).await.expect("query failed");
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].metric, "exit_velocity");
        assert_eq!(latest[0].value, Some(91.0));
        assert_eq!(date_label(&latest[0].recorded_at), "2024-05-03");
        assert_eq!(latest[1].metric, "spin_rate");
        assert_eq!(latest[1].value, Some(2200.0));

        let series = metric_series(&db.pool, 7, "exit_velocity", 10)
            .await
            .expect("query failed");
        let series: Vec<(&str, Option<f64>)> = series
            .iter()
            .map(|point| (point.label.as_str(), point.value))
            .collect();
        assert_eq!(
            series,
            vec![("2024-05-01", Some(88.5)), ("2024-05-03", Some(91.0))]
        );
    }

    #[tokio::test]
    async fn same_day_rows_collapse_to_the_later_reading() {
        let db = TestDbBuilder::new()
            .player("Reese")
            .metric("Reese", "exit_velocity", 88.0, Some("2024-05-01 09:00:00"))
            .metric("Reese", "exit_velocity", 90.5, Some("2024-05-01 17:00:00"))
            .build()
            .await
            .expect("failed to build test db");

        let series = metric_series(&db.pool, db.player_id("Reese").unwrap(), "exit_velocity", 10)
            .await
            .expect("query failed");

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].label, "2024-05-01");
        assert_eq!(series[0].value, Some(90.5));
    }

    #[tokio::test]
    async fn series_limit_keeps_the_most_recent_days() {
        let mut builder = TestDbBuilder::new().player("Reese");
        for day in 1..=5 {
            let recorded_at = format!("2024-05-0{day} 10:00:00");
            builder = builder.metric(
                "Reese",
                "exit_velocity",
                85.0 + day as f64,
                Some(recorded_at.as_str()),
            );
        }
        let db = builder.build().await.expect("failed to build test db");

        let series = metric_series(&db.pool, db.player_id("Reese").unwrap(), "exit_velocity", 3)
            .await
            .expect("query failed");

        let labels: Vec<&str> = series.iter().map(|point| point.label.as_str()).collect();
        assert_eq!(labels, vec!["2024-05-03", "2024-05-04", "2024-05-05"]);
    }

    #[tokio::test]
    async fn aligned_series_marks_missing_days_absent_not_zero() {
        let db = TestDbBuilder::new()
            .player("Reese")
            .metric("Reese", "exit_velocity", 90.0, Some("2024-05-01 10:00:00"))
            .metric("Reese", "exit_velocity", 92.0, Some("2024-05-02 10:00:00"))
            .metric("Reese", "launch_angle", 12.0, Some("2024-05-02 10:00:00"))
            .build()
            .await
            .expect("failed to build test db");

        let aligned = aligned_series(
            &db.pool,
            db.player_id("Reese").unwrap(),
            &["exit_velocity", "launch_angle"],
            90,
        )
        .await
        .expect("query failed");

        assert_eq!(aligned.labels, vec!["2024-05-01", "2024-05-02"]);
        assert_eq!(aligned.series[0].metric, "exit_velocity");
        assert_eq!(aligned.series[0].values, vec![Some(90.0), Some(92.0)]);
        assert_eq!(aligned.series[1].metric, "launch_angle");
        assert_eq!(aligned.series[1].values, vec![None, Some(12.0)]);

        // Absent stays null once serialized for the chart, never zero.
        let payload = aligned.chart_payload();
        assert!(payload["series"][1]["values"][0].is_null());
        assert_eq!(payload["series"][1]["values"][1], 12.0);
    }

    #[tokio::test]
    async fn unknown_player_yields_empty_results_not_errors() {
        let db = TestDbBuilder::new().build().await.expect("failed to build test db");

        let latest = latest_metrics(&db.pool, 9999).await.expect("query failed");
        assert!(latest.is_empty());

        let series = metric_series(&db.pool, 9999, "exit_velocity", 10)
            .await
            .expect("query failed");
        assert!(series.is_empty());

        let aligned = aligned_series(&db.pool, 9999, &["exit_velocity"], 10)
            .await
            .expect("query failed");
        assert!(aligned.labels.is_empty());
    }

    #[tokio::test]
    async fn malformed_timestamps_sort_last_but_are_never_dropped() {
        let db = TestDbBuilder::new()
            .player("Reese")
            .metric("Reese", "exit_velocity", 90.0, Some("2024-05-01 10:00:00"))
            .build()
            .await
            .expect("failed to build test db");
        let player_id = db.player_id("Reese").unwrap();

        db.insert_raw_metric(player_id, Some("exit_velocity"), Some(85.0), Some("way back"))
            .await
            .unwrap();

        // The dated row wins the latest slot even though the garbage row was
        // inserted later.
        let latest = latest_metrics(&db.pool, player_id).await.expect("query failed");
        assert_eq!(latest[0].value, Some(90.0));

        // The garbage row keeps its raw label at the end of the series.
        let series = metric_series(&db.pool, player_id, "exit_velocity", 10)
            .await
            .expect("query failed");
        let labels: Vec<&str> = series.iter().map(|point| point.label.as_str()).collect();
        assert_eq!(labels, vec!["2024-05-01", "way back"]);

        assert_eq!(count_player_sessions(&db.pool, player_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn rows_without_a_name_stay_out_of_the_latest_grouping() {
        let db = TestDbBuilder::new()
            .player("Reese")
            .metric("Reese", "exit_velocity", 90.0, Some("2024-05-01 10:00:00"))
            .build()
            .await
            .expect("failed to build test db");
        let player_id = db.player_id("Reese").unwrap();

        db.insert_raw_metric(player_id, None, Some(42.0), Some("2024-05-02 10:00:00"))
            .await
            .unwrap();

        let latest = latest_metrics(&db.pool, player_id).await.expect("query failed");
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].metric, "exit_velocity");

        // Still counted as a session even though it can't be displayed.
        assert_eq!(count_player_sessions(&db.pool, player_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn null_values_are_absent_not_zero() {
        let db = TestDbBuilder::new()
            .player("Reese")
            .metric("Reese", "exit_velocity", 0.0, Some("2024-05-02 10:00:00"))
            .build()
            .await
            .expect("failed to build test db");
        let player_id = db.player_id("Reese").unwrap();

        db.insert_raw_metric(player_id, Some("exit_velocity"), None, Some("2024-05-01 10:00:00"))
            .await
            .unwrap();

        let series = metric_series(&db.pool, player_id, "exit_velocity", 10)
            .await
            .expect("query failed");

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].value, None, "value never written");
        assert_eq!(series[1].value, Some(0.0), "a real zero reading");
    }
}
