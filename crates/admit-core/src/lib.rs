//! # admit-core
//!
//! Domain layer for registration admission: entities, value objects, storage
//! traits, and the domain error taxonomy.
//! This crate has zero dependencies on infrastructure (database, web framework, etc.).

pub mod entities;
pub mod error;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    generate_referral_code, normalize_email, Availability, Event, HoldState, InventoryHold,
    InvitationCode, InvitationRedemption, Referral, ReferralInsert, ReferralUsage, Registration,
    RegistrationStatus, Ticket, UsageInsert,
};
pub use error::DomainError;
pub use traits::{
    AcceptAllForms, EventRepository, FormValidator, InvitationRepository, MaxSizeForms,
    ReferralRepository, RegistrationRepository, RepoResult, TicketRepository,
};
pub use value_objects::{FormPayload, Snowflake, SnowflakeGenerator, SnowflakeParseError};
