//! Invitation code entity - a limited-use credential gating one ticket

use chrono::{DateTime, Utc};

use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Invitation code entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationCode {
    pub id: Snowflake,
    pub code: String,
    pub ticket_id: Snowflake,
    /// `None` means unlimited
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl InvitationCode {
    /// Create a new active, unlimited invitation code
    pub fn new(id: Snowflake, code: impl Into<String>, ticket_id: Snowflake) -> Self {
        Self {
            id,
            code: code.into(),
            ticket_id,
            usage_limit: None,
            used_count: 0,
            valid_from: None,
            valid_until: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    /// Limit the number of redemptions
    pub fn with_usage_limit(mut self, limit: i32) -> Self {
        self.usage_limit = Some(limit);
        self
    }

    /// Restrict the validity window; either bound may be open
    pub fn with_validity(
        mut self,
        valid_from: Option<DateTime<Utc>>,
        valid_until: Option<DateTime<Utc>>,
    ) -> Self {
        self.valid_from = valid_from;
        self.valid_until = valid_until;
        self
    }

    /// Mark the code as inactive
    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Check if `now` falls inside the validity window
    pub fn is_within_validity(&self, now: DateTime<Utc>) -> bool {
        let started = self.valid_from.is_none_or(|from| from <= now);
        let not_ended = self.valid_until.is_none_or(|until| now <= until);
        started && not_ended
    }

    /// Check if the code has reached its usage limit
    pub fn is_exhausted(&self) -> bool {
        self.usage_limit.is_some_and(|limit| self.used_count >= limit)
    }

    /// Get remaining uses (None if unlimited)
    pub fn remaining_uses(&self) -> Option<i32> {
        self.usage_limit.map(|limit| (limit - self.used_count).max(0))
    }

    /// Validate this code for one more redemption against `ticket_id`
    ///
    /// Checks run in a fixed order: ticket association, active flag,
    /// validity window, then usage limit.
    pub fn check_redeemable(&self, ticket_id: Snowflake, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.ticket_id != ticket_id {
            return Err(DomainError::CodeTicketMismatch {
                code: self.code.clone(),
                ticket_id,
            });
        }
        if !self.is_active {
            return Err(DomainError::InvalidCode {
                code: self.code.clone(),
            });
        }
        if !self.is_within_validity(now) {
            return Err(DomainError::ExpiredCode {
                code: self.code.clone(),
            });
        }
        if self.is_exhausted() {
            return Err(DomainError::UsageLimitExceeded {
                code: self.code.clone(),
            });
        }
        Ok(())
    }
}
