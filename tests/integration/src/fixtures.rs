//! Test fixtures and data generators
//!
//! The standard catalog and the response shapes tests deserialize into.

use std::sync::atomic::{AtomicU64, Ordering};

use admit_core::entities::{Event, InvitationCode, Ticket};
use admit_core::Snowflake;
use admit_db::MemoryStore;
use serde::Deserialize;
use serde_json::{json, Value};

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Get a unique suffix for test data
pub fn unique_suffix() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

pub const EVENT_ID: i64 = 100;
pub const GENERAL_TICKET_ID: i64 = 110;
/// Requires [`VIP_CODE`]
pub const VIP_TICKET_ID: i64 = 111;
pub const VIP_CODE: &str = "VIP-GUEST";
pub const VIP_CODE_USES: i32 = 2;
pub const GENERAL_CAPACITY: i32 = 50;

/// One event with a general ticket and an invite-only ticket
pub fn seed_catalog(store: &MemoryStore, general_capacity: i32) {
    let event_id = Snowflake::new(EVENT_ID);
    store.seed_event(Event::new(event_id, json!({"en": "Integration Summit"})));
    store.seed_ticket(Ticket::new(
        Snowflake::new(GENERAL_TICKET_ID),
        event_id,
        "General",
        general_capacity,
    ));
    store.seed_ticket(
        Ticket::new(Snowflake::new(VIP_TICKET_ID), event_id, "VIP", 10).with_invite_required(true),
    );
    store.seed_invitation(
        InvitationCode::new(Snowflake::new(120), VIP_CODE, Snowflake::new(VIP_TICKET_ID))
            .with_usage_limit(VIP_CODE_USES),
    );
}

pub fn registrations_path() -> String {
    format!("/api/v1/events/{EVENT_ID}/registrations")
}

pub fn availability_path(ticket_id: i64) -> String {
    format!("/api/v1/tickets/{ticket_id}/availability")
}

/// Body for a general-admission registration
pub fn register_body() -> Value {
    json!({ "ticket_id": GENERAL_TICKET_ID.to_string() })
}

/// A fresh caller identity
pub fn unique_user() -> (i64, String) {
    let suffix = unique_suffix();
    (10_000 + suffix as i64, format!("attendee{suffix}@example.com"))
}

/// Registration response
#[derive(Debug, Deserialize)]
pub struct RegistrationBody {
    pub id: String,
    pub user_id: String,
    pub event_id: String,
    pub ticket_id: String,
    pub email: String,
    pub status: String,
    pub referred_by: Option<String>,
    pub invitation_redeemed: bool,
}

/// Referral code response
#[derive(Debug, Deserialize)]
pub struct ReferralBody {
    pub code: String,
    pub registration_id: String,
    pub is_active: bool,
}

/// Referral usage response
#[derive(Debug, Deserialize)]
pub struct ReferralUsageBody {
    pub registration_id: String,
    pub referrer_registration_id: String,
}

/// Availability response
#[derive(Debug, Deserialize)]
pub struct AvailabilityBody {
    pub capacity: i32,
    pub sold: i32,
    pub remaining: i32,
    pub on_sale: bool,
}

/// Error envelope returned for every failure
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorDetailBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetailBody {
    pub code: String,
    pub message: String,
    pub details: Option<Value>,
}
