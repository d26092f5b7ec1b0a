//! Storage traits
//!
//! Implemented by the PostgreSQL repositories and the in-process store in
//! `admit-db`. Counter-mutating methods (`reserve`, `redeem`, and the hold
//! transitions) must each be a single atomic step in the backing store: a
//! guarded conditional update, never a read followed by a later write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{
    Event, InventoryHold, InvitationCode, InvitationRedemption, Referral, ReferralInsert,
    ReferralUsage, Registration, RegistrationStatus, Ticket, UsageInsert,
};
use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// Event Repository
// ============================================================================

#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Find event by ID
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Event>>;

    /// Create a new event
    async fn create(&self, event: &Event) -> RepoResult<()>;
}

// ============================================================================
// Ticket Repository
// ============================================================================

#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Find ticket by ID
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Ticket>>;

    /// Create a new ticket
    async fn create(&self, ticket: &Ticket) -> RepoResult<()>;

    /// Atomically add `hold.quantity` to `sold_count` and record the hold
    ///
    /// Returns `false` without side effects when the ticket is missing,
    /// inactive, outside its sales window, or lacks capacity.
    async fn reserve(&self, hold: &InventoryHold, now: DateTime<Utc>) -> RepoResult<bool>;

    /// Find a hold by ID
    async fn find_hold(&self, id: Snowflake) -> RepoResult<Option<InventoryHold>>;

    /// `Held -> Released`, giving the quantity back; `false` if not held
    async fn release_hold(&self, id: Snowflake) -> RepoResult<bool>;

    /// `Held -> Committed`; `false` if not held
    async fn commit_hold(&self, id: Snowflake) -> RepoResult<bool>;

    /// `Committed -> Returned`, giving the quantity back; `false` if not committed
    async fn return_hold(&self, id: Snowflake) -> RepoResult<bool>;

    /// IDs of holds still `Held` that were created before `older_than`
    async fn stale_holds(&self, older_than: DateTime<Utc>) -> RepoResult<Vec<Snowflake>>;
}

// ============================================================================
// Invitation Repository
// ============================================================================

#[async_trait]
pub trait InvitationRepository: Send + Sync {
    /// Find invitation code by its code string
    async fn find_by_code(&self, code: &str) -> RepoResult<Option<InvitationCode>>;

    /// Create a new invitation code
    async fn create(&self, invitation: &InvitationCode) -> RepoResult<()>;

    /// Atomically add one to `used_count` and record the redemption
    ///
    /// Returns `false` without side effects when the code is missing,
    /// bound to another ticket, inactive, outside its window, or exhausted.
    async fn redeem(&self, redemption: &InvitationRedemption, now: DateTime<Utc>) -> RepoResult<bool>;

    /// Find a redemption by ID
    async fn find_redemption(&self, id: Snowflake) -> RepoResult<Option<InvitationRedemption>>;

    /// `Held -> Released`, giving the use back; `false` if not held
    async fn release_redemption(&self, id: Snowflake) -> RepoResult<bool>;

    /// `Held -> Committed`; `false` if not held
    async fn commit_redemption(&self, id: Snowflake) -> RepoResult<bool>;

    /// `Committed -> Returned`, giving the use back; `false` if not committed
    async fn return_redemption(&self, id: Snowflake) -> RepoResult<bool>;

    /// IDs of redemptions still `Held` that were created before `older_than`
    async fn stale_redemptions(&self, older_than: DateTime<Utc>) -> RepoResult<Vec<Snowflake>>;
}

// ============================================================================
// Registration Repository
// ============================================================================

#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    /// Find registration by ID
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Registration>>;

    /// Find registration by (event, normalized email)
    async fn find_by_email(&self, event_id: Snowflake, email: &str) -> RepoResult<Option<Registration>>;

    /// Insert a registration
    ///
    /// Fails with `DuplicateRegistration` if (email, event) is taken.
    async fn create(&self, registration: &Registration) -> RepoResult<()>;

    /// Compare-and-set the status; `false` if the current status is not `from`
    async fn update_status(
        &self,
        id: Snowflake,
        from: RegistrationStatus,
        to: RegistrationStatus,
    ) -> RepoResult<bool>;

    /// Record the referral code a registration was referred through
    ///
    /// `false` if the registration is unknown or already has one.
    async fn set_referred_by(&self, id: Snowflake, code: &str) -> RepoResult<bool>;
}

// ============================================================================
// Referral Repository
// ============================================================================

#[async_trait]
pub trait ReferralRepository: Send + Sync {
    /// Find referral by code
    async fn find_by_code(&self, code: &str) -> RepoResult<Option<Referral>>;

    /// Find the referral owned by a registration
    async fn find_by_registration(&self, registration_id: Snowflake) -> RepoResult<Option<Referral>>;

    /// Insert a referral unless its owner already has one
    async fn insert(&self, referral: &Referral) -> RepoResult<ReferralInsert>;

    /// Activate or deactivate a referral; `false` if the code is unknown
    async fn set_active(&self, code: &str, active: bool) -> RepoResult<bool>;

    /// Insert a usage unless it would break the referral forest
    ///
    /// Checked inserts for the same event are serialised across every
    /// writer of the store. Under that serialisation the redeemer must not
    /// have an incoming usage yet, and following "referred by" edges from
    /// `usage.referrer_registration_id` must not reach the redeemer.
    async fn create_usage_checked(&self, usage: &ReferralUsage) -> RepoResult<UsageInsert>;

    /// Remove a usage recorded by an aborted admission
    async fn delete_usage(&self, id: Snowflake) -> RepoResult<bool>;
}
