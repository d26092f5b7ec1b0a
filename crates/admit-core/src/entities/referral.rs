//! Referral entities - shareable codes owned by registrations and the
//! usage edges recorded when another registration redeems one

use chrono::{DateTime, Utc};

use crate::value_objects::Snowflake;

/// Referral code owned by exactly one registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Referral {
    pub id: Snowflake,
    pub code: String,
    /// Owning registration
    pub registration_id: Snowflake,
    pub event_id: Snowflake,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Referral {
    /// Create a new active referral
    pub fn new(
        id: Snowflake,
        code: impl Into<String>,
        registration_id: Snowflake,
        event_id: Snowflake,
    ) -> Self {
        Self {
            id,
            code: code.into(),
            registration_id,
            event_id,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

/// Record that a registration redeemed a referral
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralUsage {
    pub id: Snowflake,
    pub referral_id: Snowflake,
    /// Redeeming registration
    pub registration_id: Snowflake,
    /// Owner of the redeemed referral, denormalized for chain walks
    pub referrer_registration_id: Snowflake,
    pub event_id: Snowflake,
    pub used_at: DateTime<Utc>,
}

/// Outcome of inserting a referral
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferralInsert {
    /// The referral was stored
    Created(Referral),
    /// The registration already owns a referral; it is returned unchanged
    Existing(Referral),
    /// The generated code collides with another registration's code
    CodeTaken,
}

/// Outcome of a checked usage insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageInsert {
    /// The usage was stored
    Created,
    /// The redeemer already has an incoming usage
    AlreadyReferred,
    /// The referrer's chain already leads back to the redeemer
    WouldCycle,
}

/// Generate a random referral code
pub fn generate_referral_code() -> String {
    use rand::Rng;

    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    const CODE_LEN: usize = 8;

    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}
