//! Event entity - the scheduling container that owns tickets and registrations

use chrono::{DateTime, Utc};

use crate::value_objects::Snowflake;

/// Event entity
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: Snowflake,
    /// Localized display name, stored as an opaque JSON blob
    pub name: serde_json::Value,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub hidden: bool,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Create a new active, visible Event
    pub fn new(id: Snowflake, name: serde_json::Value) -> Self {
        Self {
            id,
            name,
            starts_at: None,
            ends_at: None,
            is_active: true,
            hidden: false,
            created_at: Utc::now(),
        }
    }

    /// Set the scheduling window
    pub fn with_schedule(mut self, starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Self {
        self.starts_at = Some(starts_at);
        self.ends_at = Some(ends_at);
        self
    }

    /// Hide the event from public listing
    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Mark the event as inactive
    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Registrations are accepted only for active, visible events
    #[inline]
    pub fn accepts_registrations(&self) -> bool {
        self.is_active && !self.hidden
    }
}
