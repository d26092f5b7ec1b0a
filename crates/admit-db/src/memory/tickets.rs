//! Tickets and inventory holds

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::error;

use admit_core::entities::{HoldState, InventoryHold, Ticket};
use admit_core::error::DomainError;
use admit_core::traits::{RepoResult, TicketRepository};
use admit_core::value_objects::Snowflake;

use super::{MemoryStore, TicketSlot};

impl TicketSlot {
    fn snapshot(&self) -> Ticket {
        let (quantity, sold_count) = self.capacity.load();
        Ticket {
            quantity,
            sold_count,
            ..self.ticket.clone()
        }
    }
}

impl MemoryStore {
    fn transition_hold(&self, id: Snowflake, from: HoldState, to: HoldState, give_back: bool) -> bool {
        // The hold entry stays write-locked until the counter moved, so a
        // concurrent transition of the same hold observes the new state.
        let Some(mut hold) = self.holds.get_mut(&id) else {
            return false;
        };
        if hold.state != from {
            return false;
        }
        hold.state = to;

        if give_back {
            let quantity = hold.quantity;
            let returned = self.ticket_slot(hold.ticket_id).is_some_and(|slot| {
                slot.capacity
                    .update(|q, sold| (sold >= quantity).then_some((q, sold - quantity)))
            });
            if !returned {
                error!(hold_id = %id, ticket_id = %hold.ticket_id, "Hold returned more than was sold");
            }
        }
        true
    }
}

#[async_trait]
impl TicketRepository for MemoryStore {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Ticket>> {
        Ok(self.ticket_slot(id).map(|slot| slot.snapshot()))
    }

    async fn create(&self, ticket: &Ticket) -> RepoResult<()> {
        if ticket.sold_count < 0 || ticket.sold_count > ticket.quantity {
            return Err(DomainError::ValidationError(
                "sold count must be within capacity".to_string(),
            ));
        }
        self.seed_ticket(ticket.clone());
        Ok(())
    }

    async fn reserve(&self, hold: &InventoryHold, now: DateTime<Utc>) -> RepoResult<bool> {
        let Some(slot) = self.ticket_slot(hold.ticket_id) else {
            return Ok(false);
        };
        if !slot.ticket.is_active || !slot.ticket.sales_window_open(now) {
            return Ok(false);
        }

        let requested = hold.quantity;
        let reserved = slot.capacity.update(|quantity, sold| {
            sold.checked_add(requested)
                .filter(|total| *total <= quantity)
                .map(|total| (quantity, total))
        });

        if reserved {
            self.holds.insert(
                hold.id,
                InventoryHold {
                    state: HoldState::Held,
                    ..hold.clone()
                },
            );
        }
        Ok(reserved)
    }

    async fn find_hold(&self, id: Snowflake) -> RepoResult<Option<InventoryHold>> {
        Ok(self.holds.get(&id).map(|hold| hold.clone()))
    }

    async fn release_hold(&self, id: Snowflake) -> RepoResult<bool> {
        Ok(self.transition_hold(id, HoldState::Held, HoldState::Released, true))
    }

    async fn commit_hold(&self, id: Snowflake) -> RepoResult<bool> {
        Ok(self.transition_hold(id, HoldState::Held, HoldState::Committed, false))
    }

    async fn return_hold(&self, id: Snowflake) -> RepoResult<bool> {
        Ok(self.transition_hold(id, HoldState::Committed, HoldState::Returned, true))
    }

    async fn stale_holds(&self, older_than: DateTime<Utc>) -> RepoResult<Vec<Snowflake>> {
        Ok(self
            .holds
            .iter()
            .filter(|hold| hold.state == HoldState::Held && hold.created_at < older_than)
            .map(|hold| hold.id)
            .collect())
    }
}
