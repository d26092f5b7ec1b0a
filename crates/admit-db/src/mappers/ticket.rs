//! Ticket and hold entity <-> model mappers

use admit_core::entities::{HoldState, InventoryHold, Ticket};
use admit_core::error::DomainError;
use admit_core::value_objects::Snowflake;

use crate::models::{InventoryHoldModel, TicketModel};

/// Parse a stored hold state
pub fn parse_hold_state(state: &str) -> Result<HoldState, DomainError> {
    HoldState::parse(state)
        .ok_or_else(|| DomainError::DatabaseError(format!("unknown hold state '{state}'")))
}

/// Convert TicketModel to Ticket entity
impl From<TicketModel> for Ticket {
    fn from(model: TicketModel) -> Self {
        Ticket {
            id: Snowflake::new(model.id),
            event_id: Snowflake::new(model.event_id),
            name: model.name,
            price: model.price,
            quantity: model.quantity,
            sold_count: model.sold_count,
            require_invite_code: model.require_invite_code,
            require_sms_verification: model.require_sms_verification,
            sale_start: model.sale_start,
            sale_end: model.sale_end,
            hidden: model.hidden,
            is_active: model.is_active,
            created_at: model.created_at,
        }
    }
}

impl TryFrom<InventoryHoldModel> for InventoryHold {
    type Error = DomainError;

    fn try_from(model: InventoryHoldModel) -> Result<Self, Self::Error> {
        Ok(InventoryHold {
            id: Snowflake::new(model.id),
            ticket_id: Snowflake::new(model.ticket_id),
            quantity: model.quantity,
            state: parse_hold_state(&model.state)?,
            created_at: model.created_at,
        })
    }
}
