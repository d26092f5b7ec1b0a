//! Shared fixtures for admission tests
//!
//! Everything runs against the in-process store. The wrappers below inject
//! storage failures and latency into one repository at a time.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use admit_common::AdmissionConfig;
use admit_core::entities::{
    Event, InvitationCode, Referral, ReferralInsert, ReferralUsage, Registration, RegistrationStatus, Ticket,
    UsageInsert,
};
use admit_core::traits::{InvitationRepository, ReferralRepository, RegistrationRepository, RepoResult, TicketRepository};
use admit_core::{DomainError, Snowflake};
use admit_db::MemoryStore;
use admit_service::{RegistrationIntent, RetryPolicy, ServiceContext, ServiceContextBuilder};
use async_trait::async_trait;

pub const EVENT: Snowflake = Snowflake::new(1);
pub const OTHER_EVENT: Snowflake = Snowflake::new(2);
pub const TICKET: Snowflake = Snowflake::new(10);
/// Requires an invitation code
pub const VIP_TICKET: Snowflake = Snowflake::new(11);
pub const OTHER_EVENT_TICKET: Snowflake = Snowflake::new(12);
pub const VIP_CODE: &str = "VIP-2026";

/// Store with two events, a general ticket of `capacity` seats, and an
/// invite-only ticket whose code allows `invite_uses` redemptions
pub fn seeded_store(capacity: i32, invite_uses: i32) -> Arc<MemoryStore> {
    let store = MemoryStore::shared();
    store.seed_event(Event::new(EVENT, serde_json::json!({"en": "RustConf"})));
    store.seed_event(Event::new(OTHER_EVENT, serde_json::json!({"en": "Meetup"})));
    store.seed_ticket(Ticket::new(TICKET, EVENT, "General", capacity));
    store.seed_ticket(Ticket::new(VIP_TICKET, EVENT, "VIP", 100).with_invite_required(true));
    store.seed_ticket(Ticket::new(OTHER_EVENT_TICKET, OTHER_EVENT, "General", 100));
    store.seed_invitation(InvitationCode::new(Snowflake::new(20), VIP_CODE, VIP_TICKET).with_usage_limit(invite_uses));
    store
}

/// Retries quickly so compensation tests stay fast
pub fn fast_retries() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        multiplier: 2,
    }
}

pub fn builder(store: &Arc<MemoryStore>) -> ServiceContextBuilder {
    ServiceContext::builder()
        .memory_store(Arc::clone(store))
        .retry_policy(fast_retries())
}

pub fn context(store: &Arc<MemoryStore>) -> ServiceContext {
    builder(store).build().unwrap()
}

pub fn context_with_deadline(store: &Arc<MemoryStore>, deadline_ms: u64) -> ServiceContextBuilder {
    builder(store).admission(AdmissionConfig {
        register_deadline_ms: deadline_ms,
        ..AdmissionConfig::default()
    })
}

pub fn intent(user: i64, email: &str) -> RegistrationIntent {
    RegistrationIntent {
        user_id: Snowflake::new(user),
        event_id: EVENT,
        ticket_id: TICKET,
        email: email.to_string(),
        invitation_code: None,
        referral_code: None,
        form_data: None,
    }
}

pub fn vip_intent(user: i64, email: &str) -> RegistrationIntent {
    RegistrationIntent {
        ticket_id: VIP_TICKET,
        invitation_code: Some(VIP_CODE.to_string()),
        ..intent(user, email)
    }
}

pub async fn sold(store: &MemoryStore, ticket_id: Snowflake) -> i32 {
    TicketRepository::find_by_id(store, ticket_id)
        .await
        .unwrap()
        .unwrap()
        .sold_count
}

pub async fn used(store: &MemoryStore, code: &str) -> i32 {
    InvitationRepository::find_by_code(store, code)
        .await
        .unwrap()
        .unwrap()
        .used_count
}

// ============================================================================
// Fault injection
// ============================================================================

/// Registration storage whose inserts always fail with an infrastructure error
pub struct FailingRegistrations {
    pub inner: Arc<MemoryStore>,
}

#[async_trait]
impl RegistrationRepository for FailingRegistrations {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Registration>> {
        RegistrationRepository::find_by_id(self.inner.as_ref(), id).await
    }

    async fn find_by_email(&self, event_id: Snowflake, email: &str) -> RepoResult<Option<Registration>> {
        self.inner.find_by_email(event_id, email).await
    }

    async fn create(&self, _registration: &Registration) -> RepoResult<()> {
        Err(DomainError::DatabaseError("connection reset by peer".to_string()))
    }

    async fn update_status(
        &self,
        id: Snowflake,
        from: RegistrationStatus,
        to: RegistrationStatus,
    ) -> RepoResult<bool> {
        self.inner.update_status(id, from, to).await
    }

    async fn set_referred_by(&self, id: Snowflake, code: &str) -> RepoResult<bool> {
        self.inner.set_referred_by(id, code).await
    }
}

/// Referral storage that stalls before every code lookup
pub struct SlowReferrals {
    pub inner: Arc<MemoryStore>,
    pub delay: Duration,
}

#[async_trait]
impl ReferralRepository for SlowReferrals {
    async fn find_by_code(&self, code: &str) -> RepoResult<Option<Referral>> {
        tokio::time::sleep(self.delay).await;
        ReferralRepository::find_by_code(self.inner.as_ref(), code).await
    }

    async fn find_by_registration(&self, registration_id: Snowflake) -> RepoResult<Option<Referral>> {
        self.inner.find_by_registration(registration_id).await
    }

    async fn insert(&self, referral: &Referral) -> RepoResult<ReferralInsert> {
        self.inner.insert(referral).await
    }

    async fn set_active(&self, code: &str, active: bool) -> RepoResult<bool> {
        self.inner.set_active(code, active).await
    }

    async fn create_usage_checked(&self, usage: &ReferralUsage) -> RepoResult<UsageInsert> {
        self.inner.create_usage_checked(usage).await
    }

    async fn delete_usage(&self, id: Snowflake) -> RepoResult<bool> {
        self.inner.delete_usage(id).await
    }
}

/// Follow "referred by" edges from every registration; panics on a loop
pub async fn assert_acyclic(store: &MemoryStore, registrations: &[Snowflake]) {
    for start in registrations {
        let mut current = *start;
        let mut steps = 0;
        while let Some(referrer) = store.referrer_of(current) {
            steps += 1;
            assert!(
                steps <= registrations.len(),
                "referral chain from {start} does not terminate"
            );
            current = referrer;
        }
    }
}
