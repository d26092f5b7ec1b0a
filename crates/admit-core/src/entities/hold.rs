//! Counter holds - audit records for every counter increment
//!
//! Each increment of a ticket's `sold_count` or an invitation code's
//! `used_count` is recorded as a hold. A hold moves `Held -> Committed ->
//! Returned` on the happy path and cancellation, or `Held -> Released` when
//! an admission aborts. Only the state change that leaves `Held` (or
//! `Committed`, for returns) touches the counter, which makes release and
//! return idempotent.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::value_objects::Snowflake;

/// Hold lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HoldState {
    Held,
    Committed,
    Released,
    Returned,
}

impl HoldState {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Held => "held",
            Self::Committed => "committed",
            Self::Released => "released",
            Self::Returned => "returned",
        }
    }

    /// Parse the storage representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "held" => Some(Self::Held),
            "committed" => Some(Self::Committed),
            "released" => Some(Self::Released),
            "returned" => Some(Self::Returned),
            _ => None,
        }
    }

    /// Whether the hold still counts against its counter
    #[inline]
    pub fn is_counted(&self) -> bool {
        matches!(self, Self::Held | Self::Committed)
    }
}

impl fmt::Display for HoldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inventory hold against a ticket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryHold {
    pub id: Snowflake,
    pub ticket_id: Snowflake,
    pub quantity: i32,
    pub state: HoldState,
    pub created_at: DateTime<Utc>,
}

impl InventoryHold {
    /// Create a new hold in the `Held` state
    pub fn new(id: Snowflake, ticket_id: Snowflake, quantity: i32) -> Self {
        Self {
            id,
            ticket_id,
            quantity,
            state: HoldState::Held,
            created_at: Utc::now(),
        }
    }
}

/// Redemption hold against an invitation code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationRedemption {
    pub id: Snowflake,
    pub invitation_id: Snowflake,
    pub code: String,
    pub ticket_id: Snowflake,
    pub state: HoldState,
    pub created_at: DateTime<Utc>,
}

impl InvitationRedemption {
    /// Create a new redemption in the `Held` state
    pub fn new(id: Snowflake, invitation_id: Snowflake, code: impl Into<String>, ticket_id: Snowflake) -> Self {
        Self {
            id,
            invitation_id,
            code: code.into(),
            ticket_id,
            state: HoldState::Held,
            created_at: Utc::now(),
        }
    }
}
