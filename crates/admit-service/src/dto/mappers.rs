//! Entity to DTO mappers
//!
//! Implements `From` conversions from domain entities to response DTOs.

use admit_core::entities::{Availability, Referral, ReferralUsage, Registration};

use super::responses::{AvailabilityResponse, ReferralResponse, ReferralUsageResponse, RegistrationResponse};

// ============================================================================
// Registration Mappers
// ============================================================================

impl From<&Registration> for RegistrationResponse {
    fn from(registration: &Registration) -> Self {
        Self {
            id: registration.id.to_string(),
            user_id: registration.user_id.to_string(),
            event_id: registration.event_id.to_string(),
            ticket_id: registration.ticket_id.to_string(),
            email: registration.email.clone(),
            status: registration.status,
            form_data: registration.form_data.clone(),
            referred_by: registration.referred_by.clone(),
            invitation_redeemed: registration.redemption_id.is_some(),
            created_at: registration.created_at,
            updated_at: registration.updated_at,
        }
    }
}

impl From<Registration> for RegistrationResponse {
    fn from(registration: Registration) -> Self {
        Self::from(&registration)
    }
}

// ============================================================================
// Referral Mappers
// ============================================================================

impl From<Referral> for ReferralResponse {
    fn from(referral: Referral) -> Self {
        Self {
            registration_id: referral.registration_id.to_string(),
            event_id: referral.event_id.to_string(),
            is_active: referral.is_active,
            created_at: referral.created_at,
            code: referral.code,
        }
    }
}

impl From<ReferralUsage> for ReferralUsageResponse {
    fn from(usage: ReferralUsage) -> Self {
        Self {
            id: usage.id.to_string(),
            registration_id: usage.registration_id.to_string(),
            referrer_registration_id: usage.referrer_registration_id.to_string(),
            event_id: usage.event_id.to_string(),
            used_at: usage.used_at,
        }
    }
}

// ============================================================================
// Ticket Mappers
// ============================================================================

impl From<Availability> for AvailabilityResponse {
    fn from(availability: Availability) -> Self {
        Self {
            ticket_id: availability.ticket_id.to_string(),
            capacity: availability.capacity,
            sold: availability.sold,
            remaining: availability.remaining,
            on_sale: availability.on_sale,
        }
    }
}
