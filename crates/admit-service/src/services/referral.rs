//! Referral graph
//!
//! Registrations are nodes; a referral usage is an edge from the redeemer
//! to the code's owner. Each node has at most one outgoing edge, so the
//! graph is a forest as long as no redemption closes a loop. The loop check
//! and the edge insert happen together in storage, serialised per event
//! across every process sharing the store.

use admit_core::entities::{generate_referral_code, Referral, ReferralInsert, ReferralUsage, UsageInsert};
use admit_core::{DomainError, Snowflake};
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Attempts at a fresh code before giving up on collisions
const MAX_CODE_ATTEMPTS: usize = 8;

/// Referral codes and usage edges
pub struct ReferralGraph<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ReferralGraph<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Return the registration's referral, creating it on first call
    ///
    /// Concurrent callers for the same registration all observe one code.
    #[instrument(skip(self))]
    pub async fn create_referral(&self, registration_id: Snowflake, event_id: Snowflake) -> ServiceResult<Referral> {
        let repo = self.ctx.referral_repo();
        for _ in 0..MAX_CODE_ATTEMPTS {
            let candidate = Referral::new(
                self.ctx.generate_id(),
                generate_referral_code(),
                registration_id,
                event_id,
            );
            match repo.insert(&candidate).await? {
                ReferralInsert::Created(referral) => {
                    info!(registration_id = %registration_id, code = %referral.code, "Referral code created");
                    return Ok(referral);
                }
                ReferralInsert::Existing(referral) => return Ok(referral),
                ReferralInsert::CodeTaken => {
                    debug!(code = %candidate.code, "Referral code collision, retrying");
                }
            }
        }
        Err(ServiceError::internal("could not allocate a unique referral code"))
    }

    /// Record that `redeemer` was referred through `code`
    pub async fn redeem_referral(
        &self,
        code: &str,
        redeemer: Snowflake,
        event_id: Snowflake,
    ) -> ServiceResult<ReferralUsage> {
        self.redeem_as(self.ctx.generate_id(), code, redeemer, event_id).await
    }

    /// Redeem under a caller-chosen usage ID
    #[instrument(skip(self))]
    pub async fn redeem_as(
        &self,
        usage_id: Snowflake,
        code: &str,
        redeemer: Snowflake,
        event_id: Snowflake,
    ) -> ServiceResult<ReferralUsage> {
        let repo = self.ctx.referral_repo();

        let referral = repo
            .find_by_code(code)
            .await?
            .filter(|r| r.is_active)
            .ok_or_else(|| DomainError::InvalidReferralCode {
                code: code.to_string(),
            })?;

        if referral.event_id != event_id {
            return Err(DomainError::ReferralEventMismatch {
                code: code.to_string(),
                event_id,
            }
            .into());
        }
        if referral.registration_id == redeemer {
            return Err(DomainError::SelfReferral {
                code: code.to_string(),
            }
            .into());
        }

        let usage = ReferralUsage {
            id: usage_id,
            referral_id: referral.id,
            registration_id: redeemer,
            referrer_registration_id: referral.registration_id,
            event_id,
            used_at: Utc::now(),
        };
        match repo.create_usage_checked(&usage).await? {
            UsageInsert::Created => {
                debug!(usage_id = %usage_id, code = %code, "Referral redeemed");
                Ok(usage)
            }
            UsageInsert::AlreadyReferred => Err(DomainError::AlreadyReferred {
                registration_id: redeemer,
            }
            .into()),
            UsageInsert::WouldCycle => {
                warn!(code = %code, redeemer = %redeemer, "Rejected cyclic referral");
                Err(DomainError::CyclicReferral {
                    code: code.to_string(),
                }
                .into())
            }
        }
    }

    /// Remove a usage recorded by an aborted admission
    #[instrument(skip(self))]
    pub async fn revoke_usage(&self, usage_id: Snowflake) -> ServiceResult<bool> {
        let repo = self.ctx.referral_repo();
        Ok(self
            .ctx
            .retry_policy()
            .run("delete_usage", || repo.delete_usage(usage_id))
            .await?)
    }

    /// The referral owned by a registration, if created yet
    pub async fn referral_for(&self, registration_id: Snowflake) -> ServiceResult<Option<Referral>> {
        Ok(self.ctx.referral_repo().find_by_registration(registration_id).await?)
    }

    /// Enable or disable a referral code
    #[instrument(skip(self))]
    pub async fn set_active(&self, code: &str, active: bool) -> ServiceResult<()> {
        if self.ctx.referral_repo().set_active(code, active).await? {
            info!(code = %code, active, "Referral code toggled");
            Ok(())
        } else {
            Err(DomainError::InvalidReferralCode {
                code: code.to_string(),
            }
            .into())
        }
    }
}
