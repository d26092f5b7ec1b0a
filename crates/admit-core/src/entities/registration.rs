//! Registration entity - one admitted attendee for one event

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

use crate::error::DomainError;
use crate::value_objects::{FormPayload, Snowflake};

/// Registration lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Confirmed,
    CheckedIn,
    Cancelled,
}

impl RegistrationStatus {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::CheckedIn => "checked_in",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse the storage representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "confirmed" => Some(Self::Confirmed),
            "checked_in" => Some(Self::CheckedIn),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Only a confirmed registration may move, and only forward
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Confirmed, Self::CheckedIn) | (Self::Confirmed, Self::Cancelled)
        )
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registration entity
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub id: Snowflake,
    pub user_id: Snowflake,
    pub event_id: Snowflake,
    pub ticket_id: Snowflake,
    /// Normalized (trimmed, lower-cased); unique per event
    pub email: String,
    pub status: RegistrationStatus,
    pub form_data: Option<FormPayload>,
    /// Referral code this registration was referred through, at admission or later
    /// Referral code redeemed to create this registration
    pub referred_by: Option<String>,
    /// Inventory hold consumed by this registration
    pub reservation_id: Snowflake,
    /// Invitation redemption consumed by this registration
    pub redemption_id: Option<Snowflake>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    /// Check if the registration still holds a seat
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status != RegistrationStatus::Cancelled
    }
}

/// Normalize an email address for uniqueness checks
///
/// # Errors
/// Returns `ValidationError` if the address is not well formed
pub fn normalize_email(email: &str) -> Result<String, DomainError> {
    let normalized = email.trim().to_lowercase();
    if !normalized.validate_email() {
        return Err(DomainError::ValidationError(
            "Invalid email format".to_string(),
        ));
    }
    Ok(normalized)
}
