//! PostgreSQL implementation of TicketRepository
//!
//! `sold_count` only moves through guarded single-statement updates. A hold
//! row is written in the same transaction as the increment, and every later
//! hold transition changes the row state and the counter in one statement,
//! so a hold can give its quantity back at most once.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use admit_core::entities::{HoldState, InventoryHold, Ticket};
use admit_core::error::DomainError;
use admit_core::traits::{RepoResult, TicketRepository};
use admit_core::value_objects::Snowflake;

use crate::models::{InventoryHoldModel, TicketModel};

use super::error::{map_check_violation, map_db_error};

/// PostgreSQL implementation of TicketRepository
#[derive(Clone)]
pub struct PgTicketRepository {
    pool: PgPool,
}

impl PgTicketRepository {
    /// Create a new PgTicketRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Move a hold from `from` to `to`, optionally giving its quantity back
    async fn transition_hold(
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
                    UPDATE inventory_holds
                    SET state = $3, updated_at = NOW()
                    WHERE id = $1 AND state = $2
                    RETURNING ticket_id, quantity
                )
                UPDATE tickets t
                SET sold_count = t.sold_count - moved.quantity
                FROM moved
                WHERE t.id = moved.ticket_id
                "#,
            )
        } else {
            sqlx::query(
                r#"
                UPDATE inventory_holds
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
impl TicketRepository for PgTicketRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Ticket>> {
        let result = sqlx::query_as::<_, TicketModel>(
            r#"
            SELECT id, event_id, name, price, quantity, sold_count, require_invite_code,
                   require_sms_verification, sale_start, sale_end, hidden, is_active, created_at
            FROM tickets
            WHERE id = $1
            "#,
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Ticket::from))
    }

    #[instrument(skip(self, ticket), fields(ticket_id = %ticket.id))]
    async fn create(&self, ticket: &Ticket) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tickets (id, event_id, name, price, quantity, sold_count, require_invite_code,
                                 require_sms_verification, sale_start, sale_end, hidden, is_active,
                                 created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(ticket.id.into_inner())
        .bind(ticket.event_id.into_inner())
        .bind(&ticket.name)
        .bind(ticket.price)
        .bind(ticket.quantity)
        .bind(ticket.sold_count)
        .bind(ticket.require_invite_code)
        .bind(ticket.require_sms_verification)
        .bind(ticket.sale_start)
        .bind(ticket.sale_end)
        .bind(ticket.hidden)
        .bind(ticket.is_active)
        .bind(ticket.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_check_violation(e, || {
                DomainError::ValidationError("sold count must be within capacity".to_string())
            })
        })?;

        Ok(())
    }

    #[instrument(skip(self, hold), fields(hold_id = %hold.id, ticket_id = %hold.ticket_id))]
    async fn reserve(&self, hold: &InventoryHold, now: DateTime<Utc>) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let result = sqlx::query(
            r#"
            UPDATE tickets
            SET sold_count = sold_count + $2
            WHERE id = $1
              AND is_active
              AND sold_count + $2 <= quantity
              AND (sale_start IS NULL OR sale_start <= $3)
              AND (sale_end IS NULL OR $3 <= sale_end)
            "#,
        )
        .bind(hold.ticket_id.into_inner())
        .bind(hold.quantity)
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
            INSERT INTO inventory_holds (id, ticket_id, quantity, state, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            "#,
        )
        .bind(hold.id.into_inner())
        .bind(hold.ticket_id.into_inner())
        .bind(hold.quantity)
        .bind(HoldState::Held.as_str())
        .bind(hold.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;

        Ok(true)
    }

    #[instrument(skip(self))]
    async fn find_hold(&self, id: Snowflake) -> RepoResult<Option<InventoryHold>> {
        let result = sqlx::query_as::<_, InventoryHoldModel>(
            r#"
            SELECT id, ticket_id, quantity, state, created_at
            FROM inventory_holds
            WHERE id = $1
            "#,
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(InventoryHold::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn release_hold(&self, id: Snowflake) -> RepoResult<bool> {
        self.transition_hold(id, HoldState::Held, HoldState::Released, true)
            .await
    }

    #[instrument(skip(self))]
    async fn commit_hold(&self, id: Snowflake) -> RepoResult<bool> {
        self.transition_hold(id, HoldState::Held, HoldState::Committed, false)
            .await
    }

    #[instrument(skip(self))]
    async fn return_hold(&self, id: Snowflake) -> RepoResult<bool> {
        self.transition_hold(id, HoldState::Committed, HoldState::Returned, true)
            .await
    }

    #[instrument(skip(self))]
    async fn stale_holds(&self, older_than: DateTime<Utc>) -> RepoResult<Vec<Snowflake>> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id FROM inventory_holds
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
