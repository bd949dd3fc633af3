//! Postgres repository
//!
//! Production [`FacilityRepository`] backend. Queries are runtime-checked so
//! the crate builds without a live database; the schema lives in
//! `migrations/` and is applied through [`PgRepository::run_migrations`].

use super::FacilityRepository;
use crate::config::DatabaseConfig;
use crate::constants::status_groups;
use crate::error::RepositoryError;
use crate::models::{ArtifactRef, NewPlan, Observation, Plan};
use crate::state_machine::{ObservationStatus, PlanStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::debug;

/// Embedded migrations, applied by the service binary at startup.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

const PLAN_COLUMNS: &str = r#"
    id, name, status, validity_window_start, validity_window_end,
    instrument_id, payload, requested_by, created_at, updated_at
"#;

const OBSERVATION_COLUMNS: &str = r#"
    id, plan_id, instrument_id, ra, "dec", filter, exposure_time, program_pi,
    priority, status, completed_at, artifact_ref, created_at, updated_at
"#;

/// [`FacilityRepository`] backed by a Postgres connection pool.
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool from database configuration. Connections are established
    /// on first use; call [`wait_until_ready`](crate::repository::wait_until_ready)
    /// before relying on the store, so a database that is still starting up
    /// is probed rather than failed on.
    pub fn connect(config: &DatabaseConfig) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool)
            .acquire_timeout(config.connect_timeout())
            .connect_lazy(&config.url)
            .map_err(|e| RepositoryError::connection_failed(e.to_string()))?;
        Ok(Self::new(pool))
    }

    /// Apply pending migrations.
    pub async fn run_migrations(&self) -> Result<(), RepositoryError> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| RepositoryError::query_failed("run_migrations", e.to_string()))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl FacilityRepository for PgRepository {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ping", e))?;
        Ok(())
    }

    async fn create_plan(&self, new_plan: NewPlan) -> Result<Plan, RepositoryError> {
        new_plan
            .validate()
            .map_err(RepositoryError::invalid_plan)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("create_plan", e))?;

        let insert_plan = format!(
            r#"
            INSERT INTO observation_plans (
                name, status, validity_window_start, validity_window_end,
                instrument_id, payload, requested_by, created_at, updated_at
            )
            VALUES ($1, 'pending', $2, $3, $4, $5, $6, NOW(), NOW())
            RETURNING {PLAN_COLUMNS}
            "#
        );

        let plan_row = sqlx::query_as::<_, PlanRow>(&insert_plan)
            .bind(&new_plan.name)
            .bind(new_plan.validity_window_start)
            .bind(new_plan.validity_window_end)
            .bind(new_plan.instrument_id)
            .bind(&new_plan.payload)
            .bind(&new_plan.requested_by)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_error) = &e {
                    if db_error.is_unique_violation() {
                        return RepositoryError::DuplicatePlanName {
                            name: new_plan.name.clone(),
                        };
                    }
                }
                map_sqlx_error("create_plan", e)
            })?;

        let insert_observation = r#"
            INSERT INTO observations (
                plan_id, instrument_id, ra, "dec", filter, exposure_time,
                program_pi, priority, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', NOW(), NOW())
        "#;

        for observation in &new_plan.observations {
            sqlx::query(insert_observation)
                .bind(plan_row.id)
                .bind(new_plan.instrument_id)
                .bind(observation.ra)
                .bind(observation.dec)
                .bind(&observation.filter)
                .bind(observation.exposure_time)
                .bind(&observation.program_pi)
                .bind(observation.priority)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("create_plan", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("create_plan", e))?;

        debug!(
            plan_id = plan_row.id,
            observations = new_plan.observations.len(),
            "Created plan"
        );

        plan_row.try_into()
    }

    async fn find_plan(&self, plan_id: i64) -> Result<Option<Plan>, RepositoryError> {
        let query = format!("SELECT {PLAN_COLUMNS} FROM observation_plans WHERE id = $1");

        let row = sqlx::query_as::<_, PlanRow>(&query)
            .bind(plan_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_plan", e))?;

        row.map(Plan::try_from).transpose()
    }

    async fn find_eligible_plans(&self, now: DateTime<Utc>) -> Result<Vec<Plan>, RepositoryError> {
        let query = format!(
            r#"
            SELECT {PLAN_COLUMNS}
            FROM observation_plans
            WHERE status = ANY($1) AND validity_window_start < $2
            ORDER BY created_at ASC, id ASC
            "#
        );

        let rows = sqlx::query_as::<_, PlanRow>(&query)
            .bind(statuses_as_strings(status_groups::SELECTABLE_PLAN_STATUSES))
            .bind(now)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_eligible_plans", e))?;

        rows.into_iter().map(Plan::try_from).collect()
    }

    async fn update_plan_status(
        &self,
        plan_id: i64,
        status: PlanStatus,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE observation_plans SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(plan_id)
                .bind(status.to_string())
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("update_plan_status", e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::PlanNotFound { plan_id });
        }
        Ok(())
    }

    async fn find_observation(
        &self,
        observation_id: i64,
    ) -> Result<Option<Observation>, RepositoryError> {
        let query = format!("SELECT {OBSERVATION_COLUMNS} FROM observations WHERE id = $1");

        let row = sqlx::query_as::<_, ObservationRow>(&query)
            .bind(observation_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_observation", e))?;

        row.map(Observation::try_from).transpose()
    }

    async fn find_runnable_observations(
        &self,
        plan_id: i64,
    ) -> Result<Vec<Observation>, RepositoryError> {
        let query = format!(
            r#"
            SELECT {OBSERVATION_COLUMNS}
            FROM observations
            WHERE plan_id = $1 AND status = ANY($2)
            ORDER BY id ASC
            "#
        );

        let rows = sqlx::query_as::<_, ObservationRow>(&query)
            .bind(plan_id)
            .bind(statuses_as_strings(
                status_groups::RUNNABLE_OBSERVATION_STATUSES,
            ))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_runnable_observations", e))?;

        rows.into_iter().map(Observation::try_from).collect()
    }

    async fn update_observation_status(
        &self,
        observation_id: i64,
        status: ObservationStatus,
        artifact_ref: Option<&ArtifactRef>,
    ) -> Result<(), RepositoryError> {
        let query = r#"
            UPDATE observations
            SET status = $2,
                artifact_ref = CASE WHEN $2 = 'done' THEN $3 ELSE artifact_ref END,
                completed_at = CASE WHEN $2 = 'done' THEN NOW() ELSE completed_at END,
                updated_at = NOW()
            WHERE id = $1
        "#;

        let result = sqlx::query(query)
            .bind(observation_id)
            .bind(status.to_string())
            .bind(artifact_ref.map(ArtifactRef::as_str))
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_observation_status", e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::ObservationNotFound { observation_id });
        }
        Ok(())
    }
}

fn statuses_as_strings<S: ToString>(statuses: &[S]) -> Vec<String> {
    statuses.iter().map(|s| s.to_string()).collect()
}

/// Classify pool and IO faults as transient connection errors; everything
/// else surfaces as a query failure tagged with the operation.
fn map_sqlx_error(operation: &str, error: sqlx::Error) -> RepositoryError {
    match error {
        sqlx::Error::PoolTimedOut => RepositoryError::Timeout {
            operation: operation.to_string(),
        },
        sqlx::Error::PoolClosed => RepositoryError::connection_failed("connection pool closed"),
        sqlx::Error::Io(e) => RepositoryError::connection_failed(e.to_string()),
        sqlx::Error::Tls(e) => RepositoryError::connection_failed(e.to_string()),
        other => RepositoryError::query_failed(operation, other.to_string()),
    }
}

#[derive(sqlx::FromRow)]
struct PlanRow {
    id: i64,
    name: String,
    status: String,
    validity_window_start: DateTime<Utc>,
    validity_window_end: DateTime<Utc>,
    instrument_id: i64,
    payload: serde_json::Value,
    requested_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PlanRow> for Plan {
    type Error = RepositoryError;

    fn try_from(row: PlanRow) -> Result<Self, Self::Error> {
        let status: PlanStatus = row
            .status
            .parse()
            .map_err(|e: String| RepositoryError::query_failed("decode_plan_row", e))?;
        Ok(Plan {
            id: row.id,
            name: row.name,
            status,
            validity_window_start: row.validity_window_start,
            validity_window_end: row.validity_window_end,
            instrument_id: row.instrument_id,
            payload: row.payload,
            requested_by: row.requested_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ObservationRow {
    id: i64,
    plan_id: i64,
    instrument_id: i64,
    ra: f64,
    dec: f64,
    filter: String,
    exposure_time: f64,
    program_pi: String,
    priority: i32,
    status: String,
    completed_at: Option<DateTime<Utc>>,
    artifact_ref: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ObservationRow> for Observation {
    type Error = RepositoryError;

    fn try_from(row: ObservationRow) -> Result<Self, Self::Error> {
        let status: ObservationStatus = row
            .status
            .parse()
            .map_err(|e: String| RepositoryError::query_failed("decode_observation_row", e))?;
        Ok(Observation {
            id: row.id,
            plan_id: row.plan_id,
            instrument_id: row.instrument_id,
            ra: row.ra,
            dec: row.dec,
            filter: row.filter,
            exposure_time: row.exposure_time,
            program_pi: row.program_pi,
            priority: row.priority,
            status,
            completed_at: row.completed_at,
            artifact_ref: row.artifact_ref.map(ArtifactRef::new),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_faults_classify_as_transient() {
        let err = map_sqlx_error("ping", sqlx::Error::PoolTimedOut);
        assert!(matches!(err, RepositoryError::Timeout { .. }));
        assert!(err.is_transient());

        let err = map_sqlx_error("ping", sqlx::Error::PoolClosed);
        assert!(matches!(err, RepositoryError::ConnectionFailed { .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn test_row_decoding_rejects_unknown_status() {
        let row = PlanRow {
            id: 1,
            name: "n".to_string(),
            status: "paused".to_string(),
            validity_window_start: Utc::now(),
            validity_window_end: Utc::now(),
            instrument_id: 1,
            payload: serde_json::Value::Null,
            requested_by: "x".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(Plan::try_from(row).is_err());
    }
}
