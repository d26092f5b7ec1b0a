//! Inventory ledger
//!
//! Owns `sold_count`. A reservation increments the counter immediately and
//! leaves an inventory hold behind; the hold is later committed by the
//! admission, or released if the admission aborts.

use admit_core::entities::{Availability, InventoryHold};
use admit_core::{DomainError, Snowflake};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument};

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Proof of a successful reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct ReservationToken {
    pub hold_id: Snowflake,
    pub ticket_id: Snowflake,
    pub quantity: i32,
}

/// Per-ticket capacity ledger
pub struct InventoryLedger<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> InventoryLedger<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Reserve `quantity` seats of `ticket_id`
    pub async fn try_reserve(&self, ticket_id: Snowflake, quantity: i32) -> ServiceResult<ReservationToken> {
        self.reserve_as(self.ctx.generate_id(), ticket_id, quantity).await
    }

    /// Reserve under a caller-chosen hold ID
    ///
    /// Lets the caller compensate by ID even if it never observed the token.
    #[instrument(skip(self))]
    pub async fn reserve_as(
        &self,
        hold_id: Snowflake,
        ticket_id: Snowflake,
        quantity: i32,
    ) -> ServiceResult<ReservationToken> {
        if quantity < 1 {
            return Err(DomainError::ValidationError("quantity must be at least 1".to_string()).into());
        }

        let now = Utc::now();
        let hold = InventoryHold::new(hold_id, ticket_id, quantity);
        if self.ctx.ticket_repo().reserve(&hold, now).await? {
            debug!(hold_id = %hold_id, ticket_id = %ticket_id, quantity, "Inventory reserved");
            return Ok(ReservationToken {
                hold_id,
                ticket_id,
                quantity,
            });
        }

        Err(self.explain_refusal(ticket_id, now).await?.into())
    }

    /// Work out why a guarded reservation was refused
    async fn explain_refusal(&self, ticket_id: Snowflake, now: DateTime<Utc>) -> ServiceResult<DomainError> {
        let ticket = self
            .ctx
            .ticket_repo()
            .find_by_id(ticket_id)
            .await?
            .ok_or(DomainError::TicketNotFound(ticket_id))?;

        Ok(if !ticket.is_active {
            DomainError::TicketUnavailable(ticket_id)
        } else if !ticket.sales_window_open(now) {
            DomainError::SalesWindowClosed { ticket_id }
        } else {
            DomainError::SoldOut { ticket_id }
        })
    }

    /// Mark the hold as consumed by a persisted registration
    ///
    /// Fails with `DeadlineExceeded` if the hold is no longer held, which
    /// means the sweeper reclaimed it.
    #[instrument(skip(self))]
    pub async fn commit(&self, hold_id: Snowflake) -> ServiceResult<()> {
        if self.ctx.ticket_repo().commit_hold(hold_id).await? {
            Ok(())
        } else {
            Err(DomainError::DeadlineExceeded.into())
        }
    }

    /// Give an uncommitted hold back; `false` if there was nothing to release
    #[instrument(skip(self))]
    pub async fn release(&self, hold_id: Snowflake) -> ServiceResult<bool> {
        let repo = self.ctx.ticket_repo();
        let released = self
            .ctx
            .retry_policy()
            .run("release_hold", || repo.release_hold(hold_id))
            .await?;
        if released {
            debug!(hold_id = %hold_id, "Inventory released");
        }
        Ok(released)
    }

    /// Give a committed hold back; used by cancellation
    #[instrument(skip(self))]
    pub async fn return_committed(&self, hold_id: Snowflake) -> ServiceResult<bool> {
        let repo = self.ctx.ticket_repo();
        Ok(self
            .ctx
            .retry_policy()
            .run("return_hold", || repo.return_hold(hold_id))
            .await?)
    }

    /// Undo a hold whatever phase it reached
    pub async fn release_or_return(&self, hold_id: Snowflake) -> ServiceResult<bool> {
        if self.release(hold_id).await? {
            return Ok(true);
        }
        self.return_committed(hold_id).await
    }

    /// Current counters of a ticket
    pub async fn availability(&self, ticket_id: Snowflake) -> ServiceResult<Availability> {
        let ticket = self
            .ctx
            .ticket_repo()
            .find_by_id(ticket_id)
            .await?
            .ok_or(DomainError::TicketNotFound(ticket_id))?;
        Ok(ticket.availability(Utc::now()))
    }

    /// Release every hold still `Held` that was created before `older_than`
    ///
    /// Returns the number of holds released.
    #[instrument(skip(self))]
    pub async fn sweep_stale(&self, older_than: DateTime<Utc>) -> ServiceResult<usize> {
        let stale = self.ctx.ticket_repo().stale_holds(older_than).await?;
        let mut released = 0;
        for hold_id in stale {
            match self.release(hold_id).await {
                Ok(true) => released += 1,
                Ok(false) => {}
                Err(e) => error!(hold_id = %hold_id, error = %e, "Failed to release stale hold"),
            }
        }
        if released > 0 {
            info!(released, "Released stale inventory holds");
        }
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use admit_core::entities::Ticket;
    use admit_db::MemoryStore;
    use chrono::Duration;

    use super::*;
    use crate::services::error::ServiceError;

    const EVENT: Snowflake = Snowflake::new(1);

    fn setup(ticket: Ticket) -> (Arc<MemoryStore>, ServiceContext) {
        let store = MemoryStore::shared();
        store.seed_ticket(ticket);
        let ctx = ServiceContext::builder()
            .memory_store(store.clone())
            .build()
            .unwrap();
        (store, ctx)
    }

    fn domain(err: ServiceError) -> DomainError {
        match err {
            ServiceError::Domain(e) => e,
            other => panic!("expected domain error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reserve_and_release() {
        let ticket_id = Snowflake::new(10);
        let (_store, ctx) = setup(Ticket::new(ticket_id, EVENT, "General", 1));
        let ledger = InventoryLedger::new(&ctx);

        let token = ledger.try_reserve(ticket_id, 1).await.unwrap();
        assert_eq!(ledger.availability(ticket_id).await.unwrap().remaining, 0);

        let err = domain(ledger.try_reserve(ticket_id, 1).await.unwrap_err());
        assert_eq!(err, DomainError::SoldOut { ticket_id });

        assert!(ledger.release(token.hold_id).await.unwrap());
        assert!(!ledger.release(token.hold_id).await.unwrap());
        assert_eq!(ledger.availability(ticket_id).await.unwrap().sold, 0);
    }

    #[tokio::test]
    async fn test_refusal_reasons() {
        let now = Utc::now();
        let (store, ctx) = setup(
            Ticket::new(Snowflake::new(10), EVENT, "Closed", 5)
                .with_sales_window(Some(now + Duration::days(1)), None),
        );
        store.seed_ticket(Ticket::new(Snowflake::new(11), EVENT, "Off", 5).deactivated());
        let ledger = InventoryLedger::new(&ctx);

        let closed = domain(ledger.try_reserve(Snowflake::new(10), 1).await.unwrap_err());
        assert_eq!(closed.code(), "SALES_WINDOW_CLOSED");

        let inactive = domain(ledger.try_reserve(Snowflake::new(11), 1).await.unwrap_err());
        assert_eq!(inactive.code(), "TICKET_UNAVAILABLE");

        let missing = domain(ledger.try_reserve(Snowflake::new(12), 1).await.unwrap_err());
        assert_eq!(missing.code(), "UNKNOWN_TICKET");

        let zero = domain(ledger.try_reserve(Snowflake::new(10), 0).await.unwrap_err());
        assert_eq!(zero.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_release_or_return_covers_both_phases() {
        let ticket_id = Snowflake::new(10);
        let (_store, ctx) = setup(Ticket::new(ticket_id, EVENT, "General", 3));
        let ledger = InventoryLedger::new(&ctx);

        let held = ledger.try_reserve(ticket_id, 1).await.unwrap();
        let committed = ledger.try_reserve(ticket_id, 1).await.unwrap();
        ledger.commit(committed.hold_id).await.unwrap();

        assert!(ledger.release_or_return(held.hold_id).await.unwrap());
        assert!(ledger.release_or_return(committed.hold_id).await.unwrap());
        assert!(!ledger.release_or_return(committed.hold_id).await.unwrap());
        assert_eq!(ledger.availability(ticket_id).await.unwrap().sold, 0);
    }

    #[tokio::test]
    async fn test_commit_after_sweep_fails() {
        let ticket_id = Snowflake::new(10);
        let (_store, ctx) = setup(Ticket::new(ticket_id, EVENT, "General", 3));
        let ledger = InventoryLedger::new(&ctx);

        let token = ledger.try_reserve(ticket_id, 1).await.unwrap();
        let swept = ledger.sweep_stale(Utc::now() + Duration::seconds(1)).await.unwrap();
        assert_eq!(swept, 1);

        let err = domain(ledger.commit(token.hold_id).await.unwrap_err());
        assert_eq!(err, DomainError::DeadlineExceeded);
        assert_eq!(ledger.availability(ticket_id).await.unwrap().sold, 0);
    }
}
