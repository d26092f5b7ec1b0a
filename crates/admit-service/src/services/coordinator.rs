//! Registration coordinator
//!
//! Drives one admission through
//! `Validating -> ReservingInventory -> RedeemingInvitation? -> RedeemingReferral? -> Committing`
//! and ends in `Committed` or `RolledBack`. Every counter touched on the way
//! is recorded under a pre-allocated ID before the storage call is made, so a
//! rollback can undo it even when the call was cut off by the deadline.

use std::fmt;

use admit_core::entities::{normalize_email, Availability, Referral, ReferralUsage, Registration, RegistrationStatus, Ticket};
use admit_core::{DomainError, FormPayload, Snowflake};
use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::invitation::InvitationRedeemer;
use super::ledger::InventoryLedger;
use super::referral::ReferralGraph;

/// A request to admit one attendee
#[derive(Debug, Clone)]
pub struct RegistrationIntent {
    pub user_id: Snowflake,
    pub event_id: Snowflake,
    pub ticket_id: Snowflake,
    pub email: String,
    pub invitation_code: Option<String>,
    pub referral_code: Option<String>,
    pub form_data: Option<FormPayload>,
}

/// Admission state machine phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionPhase {
    Validating,
    ReservingInventory,
    RedeemingInvitation,
    RedeemingReferral,
    Committing,
    Committed,
    RolledBack,
}

impl fmt::Display for AdmissionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validating => "validating",
            Self::ReservingInventory => "reserving_inventory",
            Self::RedeemingInvitation => "redeeming_invitation",
            Self::RedeemingReferral => "redeeming_referral",
            Self::Committing => "committing",
            Self::Committed => "committed",
            Self::RolledBack => "rolled_back",
        };
        f.write_str(name)
    }
}

/// Side effects an aborted admission has to undo
#[derive(Debug, Default)]
struct Compensation {
    hold: Option<Snowflake>,
    redemption: Option<Snowflake>,
    usage: Option<Snowflake>,
}

/// Everything acquired before the registration row is written
struct Acquired {
    email: String,
    hold_id: Snowflake,
    redemption_id: Option<Snowflake>,
}

/// Registration coordinator
pub struct RegistrationCoordinator<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> RegistrationCoordinator<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Admit a registration or fail with every counter left untouched
    #[instrument(skip(self, intent), fields(event_id = %intent.event_id, ticket_id = %intent.ticket_id))]
    pub async fn register(&self, intent: RegistrationIntent) -> ServiceResult<Registration> {
        let registration_id = self.ctx.generate_id();
        let mut undo = Compensation::default();
        let deadline = self.ctx.admission().register_deadline();

        let acquired = tokio::time::timeout(deadline, self.acquire(&intent, registration_id, &mut undo)).await;
        let acquired = match acquired {
            Ok(Ok(acquired)) => acquired,
            Ok(Err(e)) => return Err(self.roll_back(registration_id, undo, e).await),
            Err(_) => {
                warn!(registration_id = %registration_id, deadline_ms = deadline.as_millis() as u64, "Admission deadline exceeded");
                return Err(self
                    .roll_back(registration_id, undo, DomainError::DeadlineExceeded.into())
                    .await);
            }
        };

        let registration = match self.persist(&intent, registration_id, acquired).await {
            Ok(registration) => registration,
            Err(e) => return Err(self.roll_back(registration_id, undo, e).await),
        };

        // The admission stands even if this fails; the code is created lazily on read
        if let Err(e) = ReferralGraph::new(self.ctx)
            .create_referral(registration.id, registration.event_id)
            .await
        {
            warn!(registration_id = %registration.id, error = %e, "Referral code not created at admission");
        }

        info!(
            registration_id = %registration.id,
            user_id = %registration.user_id,
            phase = %AdmissionPhase::Committed,
            "Registration admitted"
        );
        Ok(registration)
    }

    /// Pre-commit phases; runs under the admission deadline
    async fn acquire(
        &self,
        intent: &RegistrationIntent,
        registration_id: Snowflake,
        undo: &mut Compensation,
    ) -> ServiceResult<Acquired> {
        enter(registration_id, AdmissionPhase::Validating);
        let (ticket, email) = self.validate(intent).await?;

        enter(registration_id, AdmissionPhase::ReservingInventory);
        let hold_id = self.ctx.generate_id();
        undo.hold = Some(hold_id);
        let reservation = InventoryLedger::new(self.ctx)
            .reserve_as(hold_id, ticket.id, 1)
            .await?;

        let mut redemption_id = None;
        if let Some(code) = intent.invitation_code.as_deref() {
            enter(registration_id, AdmissionPhase::RedeemingInvitation);
            let id = self.ctx.generate_id();
            undo.redemption = Some(id);
            let token = InvitationRedeemer::new(self.ctx)
                .redeem_as(id, code, ticket.id)
                .await?;
            redemption_id = Some(token.redemption_id);
        }

        if let Some(code) = intent.referral_code.as_deref() {
            enter(registration_id, AdmissionPhase::RedeemingReferral);
            let id = self.ctx.generate_id();
            undo.usage = Some(id);
            ReferralGraph::new(self.ctx)
                .redeem_as(id, code, registration_id, intent.event_id)
                .await?;
        }

        Ok(Acquired {
            email,
            hold_id: reservation.hold_id,
            redemption_id,
        })
    }

    /// Checks that need no counter; returns the ticket and normalized email
    async fn validate(&self, intent: &RegistrationIntent) -> ServiceResult<(Ticket, String)> {
        let event = self
            .ctx
            .event_repo()
            .find_by_id(intent.event_id)
            .await?
            .ok_or(DomainError::EventNotFound(intent.event_id))?;
        if !event.accepts_registrations() {
            return Err(DomainError::EventUnavailable(event.id).into());
        }

        let ticket = self
            .ctx
            .ticket_repo()
            .find_by_id(intent.ticket_id)
            .await?
            .ok_or(DomainError::TicketNotFound(intent.ticket_id))?;
        if ticket.event_id != event.id {
            return Err(DomainError::TicketEventMismatch {
                ticket_id: ticket.id,
                event_id: event.id,
            }
            .into());
        }
        if !ticket.is_active {
            return Err(DomainError::TicketUnavailable(ticket.id).into());
        }

        let email = normalize_email(&intent.email)?;

        if let Some(form) = &intent.form_data {
            self.ctx
                .form_validator()
                .validate(event.id, form)
                .map_err(DomainError::FormRejected)?;
        }

        if ticket.require_invite_code && intent.invitation_code.is_none() {
            return Err(DomainError::InvitationRequired { ticket_id: ticket.id }.into());
        }

        if self
            .ctx
            .registration_repo()
            .find_by_email(event.id, &email)
            .await?
            .is_some()
        {
            return Err(DomainError::DuplicateRegistration { event_id: event.id }.into());
        }

        Ok((ticket, email))
    }

    /// Commit the holds and write the registration row
    ///
    /// The unique (event, email) constraint decides races that slipped past
    /// the duplicate check.
    async fn persist(
        &self,
        intent: &RegistrationIntent,
        registration_id: Snowflake,
        acquired: Acquired,
    ) -> ServiceResult<Registration> {
        enter(registration_id, AdmissionPhase::Committing);
        InventoryLedger::new(self.ctx).commit(acquired.hold_id).await?;
        if let Some(redemption_id) = acquired.redemption_id {
            InvitationRedeemer::new(self.ctx).commit(redemption_id).await?;
        }

        let now = Utc::now();
        let registration = Registration {
            id: registration_id,
            user_id: intent.user_id,
            event_id: intent.event_id,
            ticket_id: intent.ticket_id,
            email: acquired.email,
            status: RegistrationStatus::Confirmed,
            form_data: intent.form_data.clone(),
            referred_by: intent.referral_code.clone(),
            reservation_id: acquired.hold_id,
            redemption_id: acquired.redemption_id,
            created_at: now,
            updated_at: now,
        };
        self.ctx.registration_repo().create(&registration).await?;
        Ok(registration)
    }

    /// Undo in reverse order of acquisition and hand back the original error
    ///
    /// A step that still fails after retries is logged and left to the
    /// stale-hold sweeper.
    async fn roll_back(&self, registration_id: Snowflake, undo: Compensation, cause: ServiceError) -> ServiceError {
        if let Some(usage_id) = undo.usage {
            if let Err(e) = ReferralGraph::new(self.ctx).revoke_usage(usage_id).await {
                error!(registration_id = %registration_id, usage_id = %usage_id, error = %e, "Failed to revoke referral usage");
            }
        }
        if let Some(redemption_id) = undo.redemption {
            if let Err(e) = InvitationRedeemer::new(self.ctx).release_or_return(redemption_id).await {
                error!(registration_id = %registration_id, redemption_id = %redemption_id, error = %e, "Failed to release invitation redemption");
            }
        }
        if let Some(hold_id) = undo.hold {
            if let Err(e) = InventoryLedger::new(self.ctx).release_or_return(hold_id).await {
                error!(registration_id = %registration_id, hold_id = %hold_id, error = %e, "Failed to release inventory hold");
            }
        }

        info!(
            registration_id = %registration_id,
            phase = %AdmissionPhase::RolledBack,
            reason = cause.error_code(),
            "Admission rolled back"
        );
        cause
    }

    // =========================================================================
    // Post-admission operations
    // =========================================================================

    /// Cancel a confirmed registration and give back what it consumed
    ///
    /// Cancelling an already cancelled registration re-runs the idempotent
    /// returns, which completes a cancellation interrupted by a storage failure.
    #[instrument(skip(self))]
    pub async fn cancel(&self, registration_id: Snowflake, actor_id: Snowflake) -> ServiceResult<Registration> {
        let registration = self.get_registration(registration_id).await?;
        let target = RegistrationStatus::Cancelled;

        if registration.status != target {
            if !registration.status.can_transition_to(target) {
                return Err(DomainError::InvalidStatusTransition {
                    registration_id,
                    from: registration.status,
                    to: target,
                }
                .into());
            }
            let moved = self
                .ctx
                .registration_repo()
                .update_status(registration_id, RegistrationStatus::Confirmed, target)
                .await?;
            if !moved {
                let current = self.get_registration(registration_id).await?;
                if current.status != target {
                    return Err(DomainError::InvalidStatusTransition {
                        registration_id,
                        from: current.status,
                        to: target,
                    }
                    .into());
                }
            }
        }

        if InventoryLedger::new(self.ctx)
            .return_committed(registration.reservation_id)
            .await?
        {
            debug!(hold_id = %registration.reservation_id, "Inventory returned");
        }
        if let Some(redemption_id) = registration.redemption_id {
            InvitationRedeemer::new(self.ctx).return_committed(redemption_id).await?;
        }
        let graph = ReferralGraph::new(self.ctx);
        if let Some(referral) = graph.referral_for(registration_id).await? {
            if referral.is_active {
                graph.set_active(&referral.code, false).await?;
            }
        }

        info!(
            registration_id = %registration_id,
            actor_id = %actor_id,
            event_id = %registration.event_id,
            "Registration cancelled"
        );
        self.get_registration(registration_id).await
    }

    /// Mark a confirmed registration as checked in
    #[instrument(skip(self))]
    pub async fn check_in(&self, registration_id: Snowflake, actor_id: Snowflake) -> ServiceResult<Registration> {
        let registration = self.get_registration(registration_id).await?;
        let target = RegistrationStatus::CheckedIn;

        let moved = registration.status.can_transition_to(target)
            && self
                .ctx
                .registration_repo()
                .update_status(registration_id, RegistrationStatus::Confirmed, target)
                .await?;
        if !moved {
            let current = self.get_registration(registration_id).await?;
            return Err(DomainError::InvalidStatusTransition {
                registration_id,
                from: current.status,
                to: target,
            }
            .into());
        }

        info!(registration_id = %registration_id, actor_id = %actor_id, "Registration checked in");
        self.get_registration(registration_id).await
    }

    // =========================================================================
    // Read accessors
    // =========================================================================

    pub async fn get_registration(&self, registration_id: Snowflake) -> ServiceResult<Registration> {
        Ok(self
            .ctx
            .registration_repo()
            .find_by_id(registration_id)
            .await?
            .ok_or(DomainError::RegistrationNotFound(registration_id))?)
    }

    /// Fetch a registration on behalf of `caller`, who must own it or be an admin
    pub async fn get_registration_for(
        &self,
        registration_id: Snowflake,
        caller: Snowflake,
        is_admin: bool,
    ) -> ServiceResult<Registration> {
        let registration = self.get_registration(registration_id).await?;
        if registration.user_id != caller && !is_admin {
            return Err(ServiceError::permission_denied("access this registration"));
        }
        Ok(registration)
    }

    /// The registration's referral code, created on first request
    #[instrument(skip(self))]
    pub async fn referral_code(&self, registration_id: Snowflake) -> ServiceResult<Referral> {
        let registration = self.get_registration(registration_id).await?;
        let graph = ReferralGraph::new(self.ctx);
        if let Some(referral) = graph.referral_for(registration_id).await? {
            return Ok(referral);
        }
        if !registration.is_active() {
            return Err(ServiceError::conflict("registration is cancelled"));
        }
        graph.create_referral(registration.id, registration.event_id).await
    }

    /// Redeem a referral code for an existing registration
    ///
    /// The registration's `referred_by` is set to the code along with the
    /// usage edge; if that write fails the edge is revoked again.
    #[instrument(skip(self))]
    pub async fn redeem_referral(&self, registration_id: Snowflake, code: &str) -> ServiceResult<ReferralUsage> {
        let registration = self.get_registration(registration_id).await?;
        if !registration.is_active() {
            return Err(ServiceError::conflict("registration is cancelled"));
        }
        let graph = ReferralGraph::new(self.ctx);
        let usage = graph
            .redeem_referral(code, registration.id, registration.event_id)
            .await?;

        match self.ctx.registration_repo().set_referred_by(registration.id, code).await {
            Ok(true) => {}
            Ok(false) => warn!(registration_id = %registration.id, "Registration already records a referral code"),
            Err(e) => {
                error!(registration_id = %registration.id, error = %e, "Recording referral code failed");
                graph.revoke_usage(usage.id).await?;
                return Err(e.into());
            }
        }
        Ok(usage)
    }

    /// Current counters of a ticket
    pub async fn availability(&self, ticket_id: Snowflake) -> ServiceResult<Availability> {
        InventoryLedger::new(self.ctx).availability(ticket_id).await
    }
}

fn enter(registration_id: Snowflake, phase: AdmissionPhase) {
    debug!(registration_id = %registration_id, phase = %phase, "Admission phase");
}
