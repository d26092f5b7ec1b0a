//! Database models - SQLx-compatible structs for PostgreSQL tables

mod event;
mod invitation;
mod referral;
mod registration;
mod ticket;

pub use event::EventModel;
pub use invitation::{InvitationCodeModel, InvitationRedemptionModel};
pub use referral::ReferralModel;
pub use registration::RegistrationModel;
pub use ticket::{InventoryHoldModel, TicketModel};
