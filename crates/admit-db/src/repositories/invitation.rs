//! PostgreSQL implementation of InvitationRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use admit_core::entities::{HoldState, InvitationCode, InvitationRedemption};
use admit_core::error::DomainError;
use admit_core::traits::{InvitationRepository, RepoResult};
use admit_core::value_objects::Snowflake;

use crate::models::{InvitationCodeModel, InvitationRedemptionModel};

use super::error::{map_db_error, map_unique_violation};

/// PostgreSQL implementation of InvitationRepository
#[derive(Clone)]
pub struct PgInvitationRepository {
    pool: PgPool,
}

impl PgInvitationRepository {
    /// Create a new PgInvitationRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Move a redemption from `from` to `to`, optionally giving the use back
    async fn transition_redemption(
        &self,
        id: Snowflake,
        from: HoldState,
        to: HoldState,
        give_back: bool,
    ) -> RepoResult<bool> {
        let query = if give_back {
            sqlx::query(
                r#"
                WITH moved AS (
                    UPDATE invitation_redemptions
                    SET state = $3, updated_at = NOW()
                    WHERE id = $1 AND state = $2
                    RETURNING invitation_id
                )
                UPDATE invitation_codes c
                SET used_count = c.used_count - 1
                FROM moved
                WHERE c.id = moved.invitation_id
                "#,
            )
        } else {
            sqlx::query(
                r#"
                UPDATE invitation_redemptions
                SET state = $3, updated_at = NOW()
                WHERE id = $1 AND state = $2
                "#,
            )
        };

        let result = query
            .bind(id.into_inner())
            .bind(from.as_str())
            .bind(to.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl InvitationRepository for PgInvitationRepository {
    #[instrument(skip(self))]
    async fn find_by_code(&self, code: &str) -> RepoResult<Option<InvitationCode>> {
        let result = sqlx::query_as::<_, InvitationCodeModel>(
            r#"
            SELECT id, code, ticket_id, usage_limit, used_count, valid_from, valid_until,
                   is_active, created_at
            FROM invitation_codes
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(InvitationCode::from))
    }

    #[instrument(skip(self, invitation), fields(code = %invitation.code))]
    async fn create(&self, invitation: &InvitationCode) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO invitation_codes (id, code, ticket_id, usage_limit, used_count, valid_from,
                                          valid_until, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(invitation.id.into_inner())
        .bind(&invitation.code)
        .bind(invitation.ticket_id.into_inner())
        .bind(invitation.usage_limit)
        .bind(invitation.used_count)
        .bind(invitation.valid_from)
        .bind(invitation.valid_until)
        .bind(invitation.is_active)
        .bind(invitation.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(e, || {
                DomainError::ValidationError(format!("invitation code '{}' already exists", invitation.code))
            })
        })?;

        Ok(())
    }

    #[instrument(skip(self, redemption), fields(redemption_id = %redemption.id, code = %redemption.code))]
    async fn redeem(&self, redemption: &InvitationRedemption, now: DateTime<Utc>) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let result = sqlx::query(
            r#"
            UPDATE invitation_codes
            SET used_count = used_count + 1
            WHERE id = $1
              AND ticket_id = $2
              AND is_active
              AND (usage_limit IS NULL OR used_count < usage_limit)
              AND (valid_from IS NULL OR valid_from <= $3)
              AND (valid_until IS NULL OR $3 <= valid_until)
            "#,
        )
        .bind(redemption.invitation_id.into_inner())
        .bind(redemption.ticket_id.into_inner())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(map_db_error)?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO invitation_redemptions (id, invitation_id, code, ticket_id, state,
                                                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            "#,
        )
        .bind(redemption.id.into_inner())
        .bind(redemption.invitation_id.into_inner())
        .bind(&redemption.code)
        .bind(redemption.ticket_id.into_inner())
        .bind(HoldState::Held.as_str())
        .bind(redemption.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;

        Ok(true)
    }

    #[instrument(skip(self))]
    async fn find_redemption(&self, id: Snowflake) -> RepoResult<Option<InvitationRedemption>> {
        let result = sqlx::query_as::<_, InvitationRedemptionModel>(
            r#"
            SELECT id, invitation_id, code, ticket_id, state, created_at
            FROM invitation_redemptions
            WHERE id = $1
            "#,
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(InvitationRedemption::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn release_redemption(&self, id: Snowflake) -> RepoResult<bool> {
        self.transition_redemption(id, HoldState::Held, HoldState::Released, true)
            .await
    }

    #[instrument(skip(self))]
    async fn commit_redemption(&self, id: Snowflake) -> RepoResult<bool> {
        self.transition_redemption(id, HoldState::Held, HoldState::Committed, false)
            .await
    }

    #[instrument(skip(self))]
    async fn return_redemption(&self, id: Snowflake) -> RepoResult<bool> {
        self.transition_redemption(id, HoldState::Committed, HoldState::Returned, true)
            .await
    }

    #[instrument(skip(self))]
    async fn stale_redemptions(&self, older_than: DateTime<Utc>) -> RepoResult<Vec<Snowflake>> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id FROM invitation_redemptions
            WHERE state = 'held' AND created_at < $1
            ORDER BY created_at
            "#,
        )
        .bind(older_than)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(ids.into_iter().map(Snowflake::new).collect())
    }
}
