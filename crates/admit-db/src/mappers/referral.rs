//! Referral entity <-> model mappers

use admit_core::entities::Referral;
use admit_core::value_objects::Snowflake;

use crate::models::ReferralModel;

/// Convert ReferralModel to Referral entity
impl From<ReferralModel> for Referral {
    fn from(model: ReferralModel) -> Self {
        Referral {
            id: Snowflake::new(model.id),
            code: model.code,
            registration_id: Snowflake::new(model.registration_id),
            event_id: Snowflake::new(model.event_id),
            is_active: model.is_active,
            created_at: model.created_at,
        }
    }
}

