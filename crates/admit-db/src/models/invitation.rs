//! Invitation code and redemption database models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for invitation_codes table
#[derive(Debug, Clone, FromRow)]
pub struct InvitationCodeModel {
    pub id: i64,
    pub code: String,
    pub ticket_id: i64,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Database model for invitation_redemptions table
#[derive(Debug, Clone, FromRow)]
pub struct InvitationRedemptionModel {
    pub id: i64,
    pub invitation_id: i64,
    pub code: String,
    pub ticket_id: i64,
    pub state: String,
    pub created_at: DateTime<Utc>,
}
