//! Referral database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for referrals table
#[derive(Debug, Clone, FromRow)]
pub struct ReferralModel {
    pub id: i64,
    pub code: String,
    pub registration_id: i64,
    pub event_id: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

