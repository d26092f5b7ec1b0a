//! Entity to model mappers
//!
//! Conversions between domain entities (admit-core) and database models.
//! - `From<Model> for Entity`: rows whose columns map one-to-one
//! - `TryFrom<Model> for Entity`: rows carrying stored enum strings
//! - `*Insert` structs: prepare entity data for database writes

mod event;
mod invitation;
mod referral;
mod registration;
mod ticket;

pub use registration::RegistrationInsert;
pub use ticket::parse_hold_state;
