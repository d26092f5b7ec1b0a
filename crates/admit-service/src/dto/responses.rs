//! Response DTOs for API endpoints
//!
//! All response DTOs implement `Serialize` for JSON output.
//! Snowflake IDs are serialized as strings for JavaScript compatibility.

use admit_core::{FormPayload, RegistrationStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

// ============================================================================
// Registration Responses
// ============================================================================

/// Registration as seen by its owner or an administrator
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationResponse {
    pub id: String,
    pub user_id: String,
    pub event_id: String,
    pub ticket_id: String,
    pub email: String,
    pub status: RegistrationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_data: Option<FormPayload>,
    /// Referral code redeemed at admission
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referred_by: Option<String>,
    pub invitation_redeemed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Referral Responses
// ============================================================================

/// A registration's own referral code
#[derive(Debug, Clone, Serialize)]
pub struct ReferralResponse {
    pub code: String,
    pub registration_id: String,
    pub event_id: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A recorded referral edge
#[derive(Debug, Clone, Serialize)]
pub struct ReferralUsageResponse {
    pub id: String,
    pub registration_id: String,
    pub referrer_registration_id: String,
    pub event_id: String,
    pub used_at: DateTime<Utc>,
}

// ============================================================================
// Ticket Responses
// ============================================================================

/// Availability counts for display
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityResponse {
    pub ticket_id: String,
    pub capacity: i32,
    pub sold: i32,
    pub remaining: i32,
    pub on_sale: bool,
}

// ============================================================================
// Health Responses
// ============================================================================

/// Basic health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Readiness check response
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub checks: HealthChecks,
}

/// Health of each dependency
#[derive(Debug, Clone, Serialize)]
pub struct HealthChecks {
    /// `postgres` or `memory`
    pub storage_backend: String,
    pub storage: String,
}

impl ReadinessResponse {
    pub fn ready(storage_backend: &str, storage_healthy: bool) -> Self {
        Self {
            status: if storage_healthy { "ready" } else { "not_ready" }.to_string(),
            timestamp: Utc::now(),
            checks: HealthChecks {
                storage_backend: storage_backend.to_string(),
                storage: if storage_healthy { "healthy" } else { "unhealthy" }.to_string(),
            },
        }
    }
}
