//! In-process store
//!
//! Implements every storage trait on concurrent maps so the service can run
//! without PostgreSQL. Counters live in atomics and move only through
//! compare-and-swap loops; uniqueness rules are enforced with `DashMap`
//! entry locks. Referral usage inserts are additionally serialised per
//! event, the only lock awaited on.

mod events;
mod invitations;
mod referrals;
mod registrations;
mod tickets;

use std::sync::atomic::{AtomicI32, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use admit_core::entities::{
    Event, InventoryHold, InvitationCode, InvitationRedemption, Referral, ReferralUsage,
    Registration, Ticket,
};
use admit_core::value_objects::Snowflake;

/// Ticket configuration plus its live counters
struct TicketSlot {
    ticket: Ticket,
    capacity: Capacity,
}

/// Invitation configuration plus its live usage counter
struct InvitationSlot {
    invitation: InvitationCode,
    used: AtomicI32,
}

/// `quantity` and `sold_count` packed into one word so a reservation checks
/// and moves both in a single compare-and-swap
struct Capacity(AtomicU64);

impl Capacity {
    fn new(quantity: i32, sold: i32) -> Self {
        Self(AtomicU64::new(Self::pack(quantity, sold)))
    }

    fn pack(quantity: i32, sold: i32) -> u64 {
        (u64::from(quantity as u32) << 32) | u64::from(sold as u32)
    }

    fn unpack(word: u64) -> (i32, i32) {
        ((word >> 32) as u32 as i32, word as u32 as i32)
    }

    /// Current `(quantity, sold)`
    fn load(&self) -> (i32, i32) {
        Self::unpack(self.0.load(Ordering::Acquire))
    }

    /// Apply `f` with a CAS loop; `false` if `f` declined
    fn update(&self, f: impl Fn(i32, i32) -> Option<(i32, i32)>) -> bool {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |word| {
                let (quantity, sold) = Self::unpack(word);
                f(quantity, sold).map(|(q, s)| Self::pack(q, s))
            })
            .is_ok()
    }
}

/// Concurrent in-memory implementation of the storage traits
#[derive(Default)]
pub struct MemoryStore {
    events: DashMap<Snowflake, Event>,
    tickets: DashMap<Snowflake, Arc<TicketSlot>>,
    holds: DashMap<Snowflake, InventoryHold>,
    invitations: DashMap<String, Arc<InvitationSlot>>,
    redemptions: DashMap<Snowflake, InvitationRedemption>,
    registrations: DashMap<Snowflake, Registration>,
    /// (event, normalized email) -> registration
    registration_emails: DashMap<(Snowflake, String), Snowflake>,
    registration_counts: DashMap<Snowflake, AtomicI64>,
    /// code -> referral
    referrals: DashMap<String, Referral>,
    /// owning registration -> code
    referral_owners: DashMap<Snowflake, String>,
    usages: DashMap<Snowflake, ReferralUsage>,
    /// redeeming registration -> usage
    usage_by_redeemer: DashMap<Snowflake, Snowflake>,
    /// event -> lock serialising checked usage inserts
    usage_locks: DashMap<Snowflake, Arc<tokio::sync::Mutex<()>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store behind an `Arc`, ready to hand to the service
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn ticket_slot(&self, id: Snowflake) -> Option<Arc<TicketSlot>> {
        self.tickets.get(&id).map(|slot| Arc::clone(slot.value()))
    }

    fn invitation_slot(&self, code: &str) -> Option<Arc<InvitationSlot>> {
        self.invitations.get(code).map(|slot| Arc::clone(slot.value()))
    }

    // ------------------------------------------------------------------
    // Seeding helpers
    // ------------------------------------------------------------------

    /// Insert or replace an event
    pub fn seed_event(&self, event: Event) {
        self.events.insert(event.id, event);
    }

    /// Insert or replace a ticket, counters included
    pub fn seed_ticket(&self, ticket: Ticket) {
        let slot = TicketSlot {
            capacity: Capacity::new(ticket.quantity, ticket.sold_count),
            ticket,
        };
        self.tickets.insert(slot.ticket.id, Arc::new(slot));
    }

    /// Insert or replace an invitation code, usage counter included
    pub fn seed_invitation(&self, invitation: InvitationCode) {
        let slot = InvitationSlot {
            used: AtomicI32::new(invitation.used_count),
            invitation,
        };
        self.invitations.insert(slot.invitation.code.clone(), Arc::new(slot));
    }

    /// Number of inventory hold records, whatever their state
    pub fn hold_count(&self) -> usize {
        self.holds.len()
    }
}
