//! Invitation redeemer
//!
//! Owns `used_count`. Validation against the code's configuration happens
//! before the guarded increment; if the increment is refused anyway the
//! code is re-read to report what changed underneath us.

use admit_core::entities::InvitationRedemption;
use admit_core::{DomainError, Snowflake};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument};

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Proof of a successful redemption
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct RedemptionToken {
    pub redemption_id: Snowflake,
    pub code: String,
    pub ticket_id: Snowflake,
}

/// Consumes invitation-code allowances
pub struct InvitationRedeemer<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> InvitationRedeemer<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Consume one use of `code` for `ticket_id`
    pub async fn try_redeem(&self, code: &str, ticket_id: Snowflake) -> ServiceResult<RedemptionToken> {
        self.redeem_as(self.ctx.generate_id(), code, ticket_id).await
    }

    /// Redeem under a caller-chosen redemption ID
    #[instrument(skip(self))]
    pub async fn redeem_as(
        &self,
        redemption_id: Snowflake,
        code: &str,
        ticket_id: Snowflake,
    ) -> ServiceResult<RedemptionToken> {
        let repo = self.ctx.invitation_repo();
        let invalid = || DomainError::InvalidCode {
            code: code.to_string(),
        };

        let invitation = repo.find_by_code(code).await?.ok_or_else(invalid)?;
        let now = Utc::now();
        invitation.check_redeemable(ticket_id, now)?;

        let redemption = InvitationRedemption::new(redemption_id, invitation.id, &invitation.code, ticket_id);
        if repo.redeem(&redemption, now).await? {
            debug!(redemption_id = %redemption_id, code = %code, "Invitation redeemed");
            return Ok(RedemptionToken {
                redemption_id,
                code: invitation.code,
                ticket_id,
            });
        }

        // Lost a race: report the current reason, exhaustion if none is visible
        let current = repo.find_by_code(code).await?.ok_or_else(invalid)?;
        current.check_redeemable(ticket_id, now)?;
        Err(DomainError::UsageLimitExceeded {
            code: code.to_string(),
        }
        .into())
    }

    /// Mark the redemption as consumed by a persisted registration
    #[instrument(skip(self))]
    pub async fn commit(&self, redemption_id: Snowflake) -> ServiceResult<()> {
        if self.ctx.invitation_repo().commit_redemption(redemption_id).await? {
            Ok(())
        } else {
            Err(DomainError::DeadlineExceeded.into())
        }
    }

    /// Give an uncommitted use back; `false` if there was nothing to release
    #[instrument(skip(self))]
    pub async fn release(&self, redemption_id: Snowflake) -> ServiceResult<bool> {
        let repo = self.ctx.invitation_repo();
        Ok(self
            .ctx
            .retry_policy()
            .run("release_redemption", || repo.release_redemption(redemption_id))
            .await?)
    }

    /// Give a committed use back; used by cancellation
    #[instrument(skip(self))]
    pub async fn return_committed(&self, redemption_id: Snowflake) -> ServiceResult<bool> {
        let repo = self.ctx.invitation_repo();
        Ok(self
            .ctx
            .retry_policy()
            .run("return_redemption", || repo.return_redemption(redemption_id))
            .await?)
    }

    pub async fn release_or_return(&self, redemption_id: Snowflake) -> ServiceResult<bool> {
        if self.release(redemption_id).await? {
            return Ok(true);
        }
        self.return_committed(redemption_id).await
    }

    /// Release every redemption still `Held` that was created before `older_than`
    #[instrument(skip(self))]
    pub async fn sweep_stale(&self, older_than: DateTime<Utc>) -> ServiceResult<usize> {
        let stale = self.ctx.invitation_repo().stale_redemptions(older_than).await?;
        let mut released = 0;
        for redemption_id in stale {
            match self.release(redemption_id).await {
                Ok(true) => released += 1,
                Ok(false) => {}
                Err(e) => error!(redemption_id = %redemption_id, error = %e, "Failed to release stale redemption"),
            }
        }
        if released > 0 {
            info!(released, "Released stale invitation redemptions");
        }
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use admit_core::entities::InvitationCode;
    use admit_core::traits::InvitationRepository;
    use admit_db::MemoryStore;
    use chrono::Duration;

    use super::*;
    use crate::services::error::ServiceError;

    const TICKET: Snowflake = Snowflake::new(10);

    fn setup(code: InvitationCode) -> (Arc<MemoryStore>, ServiceContext) {
        let store = MemoryStore::shared();
        store.seed_invitation(code);
        let ctx = ServiceContext::builder()
            .memory_store(store.clone())
            .build()
            .unwrap();
        (store, ctx)
    }

    fn code_of(err: ServiceError) -> String {
        err.error_code().to_string()
    }

    #[tokio::test]
    async fn test_validation_order() {
        let now = Utc::now();
        let (store, ctx) = setup(InvitationCode::new(Snowflake::new(1), "OTHER", Snowflake::new(99)));
        store.seed_invitation(InvitationCode::new(Snowflake::new(2), "OFF", TICKET).deactivated());
        store.seed_invitation(
            InvitationCode::new(Snowflake::new(3), "LATER", TICKET)
                .with_validity(Some(now + Duration::hours(1)), None),
        );
        store.seed_invitation(
            InvitationCode::new(Snowflake::new(4), "USED", TICKET)
                .with_usage_limit(1)
                .with_validity(None, None),
        );
        let redeemer = InvitationRedeemer::new(&ctx);

        assert_eq!(code_of(redeemer.try_redeem("NOPE", TICKET).await.unwrap_err()), "INVALID_CODE");
        assert_eq!(code_of(redeemer.try_redeem("OTHER", TICKET).await.unwrap_err()), "CODE_TICKET_MISMATCH");
        assert_eq!(code_of(redeemer.try_redeem("OFF", TICKET).await.unwrap_err()), "INVALID_CODE");
        assert_eq!(code_of(redeemer.try_redeem("LATER", TICKET).await.unwrap_err()), "EXPIRED_CODE");

        let _token = redeemer.try_redeem("USED", TICKET).await.unwrap();
        assert_eq!(code_of(redeemer.try_redeem("USED", TICKET).await.unwrap_err()), "USAGE_LIMIT_EXCEEDED");
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let (store, ctx) = setup(InvitationCode::new(Snowflake::new(1), "ONCE", TICKET).with_usage_limit(1));
        let redeemer = InvitationRedeemer::new(&ctx);

        let token = redeemer.try_redeem("ONCE", TICKET).await.unwrap();
        assert!(redeemer.release(token.redemption_id).await.unwrap());
        assert!(!redeemer.release(token.redemption_id).await.unwrap());
        assert_eq!(store.find_by_code("ONCE").await.unwrap().unwrap().used_count, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_redemptions_report_exhaustion() {
        let (store, ctx) = setup(InvitationCode::new(Snowflake::new(1), "RUSH", TICKET).with_usage_limit(3));

        let tasks: Vec<_> = (0..40)
            .map(|_| {
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    InvitationRedeemer::new(&ctx)
                        .try_redeem("RUSH", TICKET)
                        .await
                        .map_err(|e| e.error_code().to_string())
                })
            })
            .collect();

        let results = futures::future::join_all(tasks).await;
        let granted = results.iter().filter(|r| matches!(r, Ok(Ok(_)))).count();
        let exhausted = results
            .iter()
            .filter(|r| matches!(r, Ok(Err(code)) if code == "USAGE_LIMIT_EXCEEDED"))
            .count();

        assert_eq!(granted, 3);
        assert_eq!(exhausted, 37);
        assert_eq!(store.find_by_code("RUSH").await.unwrap().unwrap().used_count, 3);
    }
}
