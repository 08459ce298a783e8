//! Measurement repository.
//!
//! Measurements are keyed by `measurement_uuid`; a save with a known uuid
//! replaces the stored row.

use crate::errors::MsError;
use crate::models::{Measurement, MeasurementRow};
use crate::observability::metrics;
use async_trait::async_trait;
use sqlx::PgPool;
use std::time::Instant;
use uuid::Uuid;

/// Storage for measurements.
#[async_trait]
pub trait MeasurementRepository: Send + Sync {
    /// Load a measurement by its uuid.
    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<Measurement>, MsError>;

    /// Insert or replace a measurement, returning what was stored.
    async fn upsert(&self, measurement: &Measurement) -> Result<Measurement, MsError>;

    /// All measurements of a target, oldest first.
    async fn list_by_target(&self, target_uuid: Uuid) -> Result<Vec<Measurement>, MsError>;

    /// Round trip to the backing store.
    async fn ping(&self) -> Result<(), MsError>;
}

fn into_measurement(row: MeasurementRow) -> Result<Measurement, MsError> {
    Measurement::try_from(row)
        .map_err(|e| MsError::Database(format!("Corrupt measurement row: {}", e)))
}

fn status_label<T>(result: &Result<T, MsError>) -> &'static str {
    if result.is_ok() {
        "success"
    } else {
        "error"
    }
}

/// Postgres-backed repository.
#[derive(Clone, Debug)]
pub struct PgMeasurementRepository {
    pool: PgPool,
}

impl PgMeasurementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MeasurementRepository for PgMeasurementRepository {
    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<Measurement>, MsError> {
        let start = Instant::now();

        let result = sqlx::query_as::<_, MeasurementRow>(
            r#"
            SELECT
                measurement_type, measurement_date, measurement_value,
                measurement_uuid, target_uuid
            FROM measurements
            WHERE measurement_uuid = $1
            "#,
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| MsError::Database(format!("Failed to fetch measurement: {}", e)))
        .and_then(|row| row.map(into_measurement).transpose());

        metrics::record_db_query("find_by_uuid", status_label(&result), start.elapsed());
        result
    }

    async fn upsert(&self, measurement: &Measurement) -> Result<Measurement, MsError> {
        let start = Instant::now();

        let result = sqlx::query_as::<_, MeasurementRow>(
            r#"
            INSERT INTO measurements (
                measurement_type, measurement_date, measurement_value,
                measurement_uuid, target_uuid
            )
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (measurement_uuid) DO UPDATE SET
                measurement_type = EXCLUDED.measurement_type,
                measurement_date = EXCLUDED.measurement_date,
                measurement_value = EXCLUDED.measurement_value,
                target_uuid = EXCLUDED.target_uuid,
                updated_at = NOW()
            RETURNING
                measurement_type, measurement_date, measurement_value,
                measurement_uuid, target_uuid
            "#,
        )
        .bind(measurement.measurement_type.as_str())
        .bind(measurement.ts)
        .bind(measurement.value)
        .bind(measurement.uuid)
        .bind(measurement.target_uuid)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| MsError::Database(format!("Failed to save measurement: {}", e)))
        .and_then(into_measurement);

        metrics::record_db_query("upsert", status_label(&result), start.elapsed());
        result
    }

    async fn list_by_target(&self, target_uuid: Uuid) -> Result<Vec<Measurement>, MsError> {
        let start = Instant::now();

        let result = sqlx::query_as::<_, MeasurementRow>(
            r#"
            SELECT
                measurement_type, measurement_date, measurement_value,
                measurement_uuid, target_uuid
            FROM measurements
            WHERE target_uuid = $1
            ORDER BY measurement_date ASC, id ASC
            "#,
        )
        .bind(target_uuid)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| MsError::Database(format!("Failed to list measurements: {}", e)))
        .and_then(|rows| rows.into_iter().map(into_measurement).collect());

        metrics::record_db_query("list_by_target", status_label(&result), start.elapsed());
        result
    }

    async fn ping(&self) -> Result<(), MsError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| MsError::Database(format!("Ping failed: {}", e)))
    }
}

/// In-memory repository for tests.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::RwLock;

    /// Keeps measurements in insertion order; can be switched to fail.
    #[derive(Default)]
    pub struct InMemoryMeasurementRepository {
        rows: RwLock<Vec<Measurement>>,
        failing: AtomicBool,
    }

    impl InMemoryMeasurementRepository {
        pub fn new() -> Self {
            Self::default()
        }

        /// Repository pre-populated with `measurements`.
        pub fn with_measurements(measurements: Vec<Measurement>) -> Self {
            Self {
                rows: RwLock::new(measurements),
                failing: AtomicBool::new(false),
            }
        }

        /// Make every subsequent call return a database error.
        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        /// Snapshot of stored measurements.
        pub async fn all(&self) -> Vec<Measurement> {
            self.rows.read().await.clone()
        }

        fn check(&self) -> Result<(), MsError> {
            if self.failing.load(Ordering::SeqCst) {
                Err(MsError::Database("Mock database unavailable".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl MeasurementRepository for InMemoryMeasurementRepository {
        async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<Measurement>, MsError> {
            self.check()?;
            Ok(self
                .rows
                .read()
                .await
                .iter()
                .find(|m| m.uuid == uuid)
                .cloned())
        }

        async fn upsert(&self, measurement: &Measurement) -> Result<Measurement, MsError> {
            self.check()?;
            let mut rows = self.rows.write().await;
            match rows.iter_mut().find(|m| m.uuid == measurement.uuid) {
                Some(existing) => *existing = measurement.clone(),
                None => rows.push(measurement.clone()),
            }
            Ok(measurement.clone())
        }

        async fn list_by_target(&self, target_uuid: Uuid) -> Result<Vec<Measurement>, MsError> {
            self.check()?;
            let mut found: Vec<Measurement> = self
                .rows
                .read()
                .await
                .iter()
                .filter(|m| m.target_uuid == target_uuid)
                .cloned()
                .collect();
            found.sort_by_key(|m| m.ts);
            Ok(found)
        }

        async fn ping(&self) -> Result<(), MsError> {
            self.check()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::mock::InMemoryMeasurementRepository;
    use super::*;
    use crate::models::MeasurementType;
    use chrono::{DateTime, Utc};
    use ms_test_utils::{TEST_MEASUREMENT_1, TEST_MEASUREMENT_2, TEST_TARGET_BABY};

    fn measurement(uuid: Uuid, ts: i64, value: f32) -> Measurement {
        Measurement {
            measurement_type: MeasurementType::Height,
            ts: DateTime::<Utc>::from_timestamp(ts, 0).unwrap(),
            value,
            uuid,
            target_uuid: TEST_TARGET_BABY,
        }
    }

    #[tokio::test]
    async fn test_in_memory_upsert_replaces_by_uuid() {
        let repo = InMemoryMeasurementRepository::new();
        repo.upsert(&measurement(TEST_MEASUREMENT_1, 100, 50.0))
            .await
            .unwrap();
        repo.upsert(&measurement(TEST_MEASUREMENT_1, 100, 51.0))
            .await
            .unwrap();

        let all = repo.all().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all.first().unwrap().value, 51.0);
    }

    #[tokio::test]
    async fn test_in_memory_list_is_ordered_by_timestamp() {
        let repo = InMemoryMeasurementRepository::with_measurements(vec![
            measurement(TEST_MEASUREMENT_2, 200, 52.0),
            measurement(TEST_MEASUREMENT_1, 100, 50.0),
        ]);

        let listed = repo.list_by_target(TEST_TARGET_BABY).await.unwrap();
        let uuids: Vec<Uuid> = listed.iter().map(|m| m.uuid).collect();
        assert_eq!(uuids, vec![TEST_MEASUREMENT_1, TEST_MEASUREMENT_2]);

        assert!(repo.list_by_target(Uuid::nil()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_in_memory_failing_mode() {
        let repo = InMemoryMeasurementRepository::new();
        repo.set_failing(true);
        assert!(matches!(repo.ping().await, Err(MsError::Database(_))));
        assert!(matches!(
            repo.find_by_uuid(TEST_MEASUREMENT_1).await,
            Err(MsError::Database(_))
        ));
    }

    #[test]
    fn test_status_label() {
        assert_eq!(status_label::<()>(&Ok(())), "success");
        assert_eq!(
            status_label::<()>(&Err(MsError::Database("x".to_string()))),
            "error"
        );
    }
}
