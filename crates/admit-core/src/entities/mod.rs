//! Domain entities - core business objects

mod event;
mod hold;
mod invitation;
mod referral;
mod registration;
mod ticket;

pub use event::Event;
pub use hold::{HoldState, InventoryHold, InvitationRedemption};
pub use invitation::InvitationCode;
pub use referral::{generate_referral_code, Referral, ReferralInsert, ReferralUsage, UsageInsert};
pub use registration::{normalize_email, Registration, RegistrationStatus};
pub use ticket::{Availability, Ticket};
