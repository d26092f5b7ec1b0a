//! Domain errors - error types for the domain layer
//!
//! Every variant names the ticket, code, or event involved so callers can
//! render an actionable message. Variants never carry counter values or
//! another registrant's data.

use thiserror::Error;

use crate::entities::RegistrationStatus;
use crate::value_objects::Snowflake;

/// Domain layer errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("Event not found: {0}")]
    EventNotFound(Snowflake),

    #[error("Ticket not found: {0}")]
    TicketNotFound(Snowflake),

    #[error("Registration not found: {0}")]
    RegistrationNotFound(Snowflake),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Event {0} is not open for registration")]
    EventUnavailable(Snowflake),

    #[error("Ticket {0} is not available")]
    TicketUnavailable(Snowflake),

    #[error("Ticket {ticket_id} does not belong to event {event_id}")]
    TicketEventMismatch {
        ticket_id: Snowflake,
        event_id: Snowflake,
    },

    #[error("Form data rejected: {0}")]
    FormRejected(String),

    // =========================================================================
    // Conflict Errors
    // =========================================================================
    #[error("Email is already registered for event {event_id}")]
    DuplicateRegistration { event_id: Snowflake },

    #[error("Registration {registration_id} has already redeemed a referral code")]
    AlreadyReferred { registration_id: Snowflake },

    #[error("Registration {registration_id} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        registration_id: Snowflake,
        from: RegistrationStatus,
        to: RegistrationStatus,
    },

    // =========================================================================
    // Inventory
    // =========================================================================
    #[error("Ticket {ticket_id} is sold out")]
    SoldOut { ticket_id: Snowflake },

    #[error("Sales for ticket {ticket_id} are closed")]
    SalesWindowClosed { ticket_id: Snowflake },

    // =========================================================================
    // Invitation Codes
    // =========================================================================
    #[error("Ticket {ticket_id} requires an invitation code")]
    InvitationRequired { ticket_id: Snowflake },

    #[error("Invitation code is invalid: {code}")]
    InvalidCode { code: String },

    #[error("Invitation code is outside its validity window: {code}")]
    ExpiredCode { code: String },

    #[error("Invitation code has reached its usage limit: {code}")]
    UsageLimitExceeded { code: String },

    #[error("Invitation code {code} is not valid for ticket {ticket_id}")]
    CodeTicketMismatch { code: String, ticket_id: Snowflake },

    // =========================================================================
    // Referrals
    // =========================================================================
    #[error("Referral code is invalid: {code}")]
    InvalidReferralCode { code: String },

    #[error("A registration cannot redeem its own referral code: {code}")]
    SelfReferral { code: String },

    #[error("Redeeming referral code {code} would create a referral cycle")]
    CyclicReferral { code: String },

    #[error("Referral code {code} belongs to a different event than {event_id}")]
    ReferralEventMismatch { code: String, event_id: Snowflake },

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Registration deadline exceeded")]
    DeadlineExceeded,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for API responses
    pub fn code(&self) -> &'static str {
        match self {
            // Not Found
            Self::EventNotFound(_) => "UNKNOWN_EVENT",
            Self::TicketNotFound(_) => "UNKNOWN_TICKET",
            Self::RegistrationNotFound(_) => "UNKNOWN_REGISTRATION",

            // Validation
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::EventUnavailable(_) => "EVENT_UNAVAILABLE",
            Self::TicketUnavailable(_) => "TICKET_UNAVAILABLE",
            Self::TicketEventMismatch { .. } => "TICKET_EVENT_MISMATCH",
            Self::FormRejected(_) => "FORM_REJECTED",

            // Conflict
            Self::DuplicateRegistration { .. } => "DUPLICATE_REGISTRATION",
            Self::AlreadyReferred { .. } => "ALREADY_REFERRED",
            Self::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",

            // Inventory
            Self::SoldOut { .. } => "SOLD_OUT",
            Self::SalesWindowClosed { .. } => "SALES_WINDOW_CLOSED",

            // Invitation codes
            Self::InvitationRequired { .. } => "INVITATION_REQUIRED",
            Self::InvalidCode { .. } => "INVALID_CODE",
            Self::ExpiredCode { .. } => "EXPIRED_CODE",
            Self::UsageLimitExceeded { .. } => "USAGE_LIMIT_EXCEEDED",
            Self::CodeTicketMismatch { .. } => "CODE_TICKET_MISMATCH",

            // Referrals
            Self::InvalidReferralCode { .. } => "INVALID_REFERRAL_CODE",
            Self::SelfReferral { .. } => "SELF_REFERRAL",
            Self::CyclicReferral { .. } => "CYCLIC_REFERRAL",
            Self::ReferralEventMismatch { .. } => "REFERRAL_EVENT_MISMATCH",

            // Infrastructure
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::DatabaseError(_) => "INFRASTRUCTURE_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::EventNotFound(_) | Self::TicketNotFound(_) | Self::RegistrationNotFound(_)
        )
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_)
                | Self::EventUnavailable(_)
                | Self::TicketUnavailable(_)
                | Self::TicketEventMismatch { .. }
                | Self::FormRejected(_)
                | Self::InvitationRequired { .. }
                | Self::InvalidCode { .. }
                | Self::CodeTicketMismatch { .. }
                | Self::InvalidReferralCode { .. }
                | Self::ReferralEventMismatch { .. }
                | Self::SelfReferral { .. }
        )
    }

    /// Check if this is a conflict with current state (business rule)
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::DuplicateRegistration { .. }
                | Self::AlreadyReferred { .. }
                | Self::InvalidStatusTransition { .. }
                | Self::SoldOut { .. }
                | Self::SalesWindowClosed { .. }
                | Self::ExpiredCode { .. }
                | Self::UsageLimitExceeded { .. }
                | Self::CyclicReferral { .. }
        )
    }

    /// Storage or transport failure rather than a business decision
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::DatabaseError(_) | Self::DeadlineExceeded)
    }

    /// Whether the caller may retry the whole registration unchanged
    pub fn is_retryable(&self) -> bool {
        self.is_infrastructure()
    }
}
