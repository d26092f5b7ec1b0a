//! Storage and capability traits

mod form;
mod repositories;

pub use form::{AcceptAllForms, FormValidator, MaxSizeForms};
pub use repositories::{
    EventRepository, InvitationRepository, ReferralRepository, RegistrationRepository,
    RepoResult, TicketRepository,
};
