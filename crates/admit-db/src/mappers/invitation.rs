//! Invitation entity <-> model mappers

use admit_core::entities::{InvitationCode, InvitationRedemption};
use admit_core::error::DomainError;
use admit_core::value_objects::Snowflake;

use crate::models::{InvitationCodeModel, InvitationRedemptionModel};

use super::ticket::parse_hold_state;

/// Convert InvitationCodeModel to InvitationCode entity
impl From<InvitationCodeModel> for InvitationCode {
    fn from(model: InvitationCodeModel) -> Self {
        InvitationCode {
            id: Snowflake::new(model.id),
            code: model.code,
            ticket_id: Snowflake::new(model.ticket_id),
            usage_limit: model.usage_limit,
            used_count: model.used_count,
            valid_from: model.valid_from,
            valid_until: model.valid_until,
            is_active: model.is_active,
            created_at: model.created_at,
        }
    }
}

impl TryFrom<InvitationRedemptionModel> for InvitationRedemption {
    type Error = DomainError;

    fn try_from(model: InvitationRedemptionModel) -> Result<Self, Self::Error> {
        Ok(InvitationRedemption {
            id: Snowflake::new(model.id),
            invitation_id: Snowflake::new(model.invitation_id),
            code: model.code,
            ticket_id: Snowflake::new(model.ticket_id),
            state: parse_hold_state(&model.state)?,
            created_at: model.created_at,
        })
    }
}
