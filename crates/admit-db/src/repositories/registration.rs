//! PostgreSQL implementation of RegistrationRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use admit_core::entities::{Registration, RegistrationStatus};
use admit_core::error::DomainError;
use admit_core::traits::{RegistrationRepository, RepoResult};
use admit_core::value_objects::Snowflake;

use crate::mappers::RegistrationInsert;
use crate::models::RegistrationModel;

use super::error::{map_db_error, map_unique_violation};

/// PostgreSQL implementation of RegistrationRepository
#[derive(Clone)]
pub struct PgRegistrationRepository {
    pool: PgPool,
}

impl PgRegistrationRepository {
    /// Create a new PgRegistrationRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RegistrationRepository for PgRegistrationRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Registration>> {
        let result = sqlx::query_as::<_, RegistrationModel>(
            r#"
            SELECT id, user_id, event_id, ticket_id, email, status, form_schema_version, form_data,
                   referred_by, reservation_id, redemption_id, created_at, updated_at
            FROM registrations
            WHERE id = $1
            "#,
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(Registration::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_email(&self, event_id: Snowflake, email: &str) -> RepoResult<Option<Registration>> {
        let result = sqlx::query_as::<_, RegistrationModel>(
            r#"
            SELECT id, user_id, event_id, ticket_id, email, status, form_schema_version, form_data,
                   referred_by, reservation_id, redemption_id, created_at, updated_at
            FROM registrations
            WHERE event_id = $1 AND email = $2
            "#,
        )
        .bind(event_id.into_inner())
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(Registration::try_from).transpose()
    }

    #[instrument(skip(self, registration), fields(registration_id = %registration.id, event_id = %registration.event_id))]
    async fn create(&self, registration: &Registration) -> RepoResult<()> {
        let insert = RegistrationInsert::new(registration);

        sqlx::query(
            r#"
            INSERT INTO registrations (id, user_id, event_id, ticket_id, email, status,
                                       form_schema_version, form_data, referred_by, reservation_id,
                                       redemption_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(insert.id)
        .bind(insert.user_id)
        .bind(insert.event_id)
        .bind(insert.ticket_id)
        .bind(insert.email)
        .bind(insert.status)
        .bind(insert.form_schema_version)
        .bind(insert.form_data)
        .bind(insert.referred_by)
        .bind(insert.reservation_id)
        .bind(insert.redemption_id)
        .bind(registration.created_at)
        .bind(registration.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(e, || DomainError::DuplicateRegistration {
                event_id: registration.event_id,
            })
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn update_status(
        &self,
        id: Snowflake,
        from: RegistrationStatus,
        to: RegistrationStatus,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE registrations
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id.into_inner())
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn set_referred_by(&self, id: Snowflake, code: &str) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE registrations
            SET referred_by = $2, updated_at = NOW()
            WHERE id = $1 AND referred_by IS NULL
            "#,
        )
        .bind(id.into_inner())
        .bind(code)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }
}
