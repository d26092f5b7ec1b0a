//! PostgreSQL implementation of ReferralRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use admit_core::entities::{Referral, ReferralInsert, ReferralUsage, UsageInsert};
use admit_core::traits::{ReferralRepository, RepoResult};
use admit_core::value_objects::Snowflake;

use crate::models::ReferralModel;

use super::error::{is_unique_violation, map_db_error};

/// PostgreSQL implementation of ReferralRepository
#[derive(Clone)]
pub struct PgReferralRepository {
    pool: PgPool,
}

impl PgReferralRepository {
    /// Create a new PgReferralRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReferralRepository for PgReferralRepository {
    #[instrument(skip(self))]
    async fn find_by_code(&self, code: &str) -> RepoResult<Option<Referral>> {
        let result = sqlx::query_as::<_, ReferralModel>(
            r#"
            SELECT id, code, registration_id, event_id, is_active, created_at
            FROM referrals
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Referral::from))
    }

    #[instrument(skip(self))]
    async fn find_by_registration(&self, registration_id: Snowflake) -> RepoResult<Option<Referral>> {
        let result = sqlx::query_as::<_, ReferralModel>(
            r#"
            SELECT id, code, registration_id, event_id, is_active, created_at
            FROM referrals
            WHERE registration_id = $1
            "#,
        )
        .bind(registration_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Referral::from))
    }

    #[instrument(skip(self, referral), fields(registration_id = %referral.registration_id))]
    async fn insert(&self, referral: &Referral) -> RepoResult<ReferralInsert> {
        let inserted = sqlx::query_as::<_, ReferralModel>(
            r#"
            INSERT INTO referrals (id, code, registration_id, event_id, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT DO NOTHING
            RETURNING id, code, registration_id, event_id, is_active, created_at
            "#,
        )
        .bind(referral.id.into_inner())
        .bind(&referral.code)
        .bind(referral.registration_id.into_inner())
        .bind(referral.event_id.into_inner())
        .bind(referral.is_active)
        .bind(referral.created_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        if let Some(model) = inserted {
            return Ok(ReferralInsert::Created(Referral::from(model)));
        }

        // Either the owner already has a referral or the code collided
        match self.find_by_registration(referral.registration_id).await? {
            Some(existing) => Ok(ReferralInsert::Existing(existing)),
            None => Ok(ReferralInsert::CodeTaken),
        }
    }

    #[instrument(skip(self))]
    async fn set_active(&self, code: &str, active: bool) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE referrals SET is_active = $2 WHERE code = $1
            "#,
        )
        .bind(code)
        .bind(active)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, usage), fields(usage_id = %usage.id, registration_id = %usage.registration_id))]
    async fn create_usage_checked(&self, usage: &ReferralUsage) -> RepoResult<UsageInsert> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        // Held until commit or rollback; every API instance shares it
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(usage.event_id.into_inner())
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        let referred = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (SELECT 1 FROM referral_usages WHERE registration_id = $1)
            "#,
        )
        .bind(usage.registration_id.into_inner())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if referred {
            tx.rollback().await.map_err(map_db_error)?;
            return Ok(UsageInsert::AlreadyReferred);
        }

        // UNION (not UNION ALL) stops on a loop already in the table
        let closes_loop = sqlx::query_scalar::<_, bool>(
            r#"
            WITH RECURSIVE chain (registration_id) AS (
                SELECT $1::BIGINT
                UNION
                SELECT u.referrer_registration_id
                FROM referral_usages u
                JOIN chain c ON u.registration_id = c.registration_id
            )
            SELECT EXISTS (SELECT 1 FROM chain WHERE registration_id = $2)
            "#,
        )
        .bind(usage.referrer_registration_id.into_inner())
        .bind(usage.registration_id.into_inner())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if closes_loop {
            tx.rollback().await.map_err(map_db_error)?;
            return Ok(UsageInsert::WouldCycle);
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO referral_usages (id, referral_id, registration_id, referrer_registration_id,
                                         event_id, used_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(usage.id.into_inner())
        .bind(usage.referral_id.into_inner())
        .bind(usage.registration_id.into_inner())
        .bind(usage.referrer_registration_id.into_inner())
        .bind(usage.event_id.into_inner())
        .bind(usage.used_at)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {
                tx.commit().await.map_err(map_db_error)?;
                Ok(UsageInsert::Created)
            }
            // Redeemer referred under another event's lock
            Err(e) if is_unique_violation(&e) => Ok(UsageInsert::AlreadyReferred),
            Err(e) => Err(map_db_error(e)),
        }
    }

    #[instrument(skip(self))]
    async fn delete_usage(&self, id: Snowflake) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM referral_usages WHERE id = $1
            "#,
        )
        .bind(id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }
}
