//! Event entity <-> model mapper

use admit_core::entities::Event;
use admit_core::value_objects::Snowflake;

use crate::models::EventModel;

/// Convert EventModel to Event entity
impl From<EventModel> for Event {
    fn from(model: EventModel) -> Self {
        Event {
            id: Snowflake::new(model.id),
            name: model.name,
            starts_at: model.starts_at,
            ends_at: model.ends_at,
            is_active: model.is_active,
            hidden: model.hidden,
            created_at: model.created_at,
        }
    }
}
