//! Repository implementations
//!
//! PostgreSQL implementations of the storage traits defined in admit-core.
//! Each repository handles database operations for one aggregate.

mod error;
mod event;
mod invitation;
mod referral;
mod registration;
mod ticket;

pub use event::PgEventRepository;
pub use invitation::PgInvitationRepository;
pub use referral::PgReferralRepository;
pub use registration::PgRegistrationRepository;
pub use ticket::PgTicketRepository;
