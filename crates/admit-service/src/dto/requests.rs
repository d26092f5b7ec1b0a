//! Request DTOs for API endpoints
//!
//! All request DTOs implement `Deserialize` and `Validate` for input validation.

use admit_core::{FormPayload, Snowflake};
use serde::Deserialize;
use validator::Validate;

use crate::services::RegistrationIntent;

// ============================================================================
// Registration Requests
// ============================================================================

/// Registration request for an event
///
/// The attendee identity, email included, comes only from the bearer token.
/// Any `email` in the body is not part of this type and is dropped.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    pub ticket_id: Snowflake,

    #[validate(length(min = 1, max = 64, message = "Invitation code must be 1-64 characters"))]
    pub invitation_code: Option<String>,

    #[validate(length(min = 1, max = 32, message = "Referral code must be 1-32 characters"))]
    pub referral_code: Option<String>,

    /// Answers to the event's registration form
    pub form_data: Option<FormPayload>,
}

impl RegisterRequest {
    /// Combine with the caller's identity into an admission intent
    pub fn into_intent(self, user_id: Snowflake, event_id: Snowflake, verified_email: &str) -> RegistrationIntent {
        RegistrationIntent {
            user_id,
            event_id,
            ticket_id: self.ticket_id,
            email: verified_email.to_string(),
            invitation_code: self.invitation_code,
            referral_code: self.referral_code,
            form_data: self.form_data,
        }
    }
}

/// Redeem a referral code for an existing registration
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RedeemReferralRequest {
    #[validate(length(min = 1, max = 32, message = "Referral code must be 1-32 characters"))]
    pub code: String,
}

/// Administrative cancellation
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CancelRegistrationRequest {
    #[validate(length(max = 500, message = "Reason must be at most 500 characters"))]
    pub reason: Option<String>,
}
