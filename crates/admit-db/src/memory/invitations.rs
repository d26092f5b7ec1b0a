//! Invitation codes and redemptions

use std::sync::atomic::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::error;

use admit_core::entities::{HoldState, InvitationCode, InvitationRedemption};
use admit_core::error::DomainError;
use admit_core::traits::{InvitationRepository, RepoResult};
use admit_core::value_objects::Snowflake;

use super::{InvitationSlot, MemoryStore};

impl InvitationSlot {
    fn snapshot(&self) -> InvitationCode {
        InvitationCode {
            used_count: self.used.load(Ordering::Acquire),
            ..self.invitation.clone()
        }
    }
}

impl MemoryStore {
    fn transition_redemption(&self, id: Snowflake, from: HoldState, to: HoldState, give_back: bool) -> bool {
        let Some(mut redemption) = self.redemptions.get_mut(&id) else {
            return false;
        };
        if redemption.state != from {
            return false;
        }
        redemption.state = to;

        if give_back {
            let returned = self.invitation_slot(&redemption.code).is_some_and(|slot| {
                slot.used
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                        (used > 0).then_some(used - 1)
                    })
                    .is_ok()
            });
            if !returned {
                error!(redemption_id = %id, code = %redemption.code, "Redemption returned more than was used");
            }
        }
        true
    }
}

#[async_trait]
impl InvitationRepository for MemoryStore {
    async fn find_by_code(&self, code: &str) -> RepoResult<Option<InvitationCode>> {
        Ok(self.invitation_slot(code).map(|slot| slot.snapshot()))
    }

    async fn create(&self, invitation: &InvitationCode) -> RepoResult<()> {
        if self.invitations.contains_key(&invitation.code) {
            return Err(DomainError::ValidationError(format!(
                "invitation code '{}' already exists",
                invitation.code
            )));
        }
        self.seed_invitation(invitation.clone());
        Ok(())
    }

    async fn redeem(&self, redemption: &InvitationRedemption, now: DateTime<Utc>) -> RepoResult<bool> {
        let Some(slot) = self.invitation_slot(&redemption.code) else {
            return Ok(false);
        };
        let invitation = &slot.invitation;
        if invitation.id != redemption.invitation_id
            || invitation.ticket_id != redemption.ticket_id
            || !invitation.is_active
            || !invitation.is_within_validity(now)
        {
            return Ok(false);
        }

        let limit = invitation.usage_limit;
        let redeemed = slot
            .used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| match limit {
                Some(limit) if used >= limit => None,
                _ => Some(used + 1),
            })
            .is_ok();

        if redeemed {
            self.redemptions.insert(
                redemption.id,
                InvitationRedemption {
                    state: HoldState::Held,
                    ..redemption.clone()
                },
            );
        }
        Ok(redeemed)
    }

    async fn find_redemption(&self, id: Snowflake) -> RepoResult<Option<InvitationRedemption>> {
        Ok(self.redemptions.get(&id).map(|r| r.clone()))
    }

    async fn release_redemption(&self, id: Snowflake) -> RepoResult<bool> {
        Ok(self.transition_redemption(id, HoldState::Held, HoldState::Released, true))
    }

    async fn commit_redemption(&self, id: Snowflake) -> RepoResult<bool> {
        Ok(self.transition_redemption(id, HoldState::Held, HoldState::Committed, false))
    }

    async fn return_redemption(&self, id: Snowflake) -> RepoResult<bool> {
        Ok(self.transition_redemption(id, HoldState::Committed, HoldState::Returned, true))
    }

    async fn stale_redemptions(&self, older_than: DateTime<Utc>) -> RepoResult<Vec<Snowflake>> {
        Ok(self
            .redemptions
            .iter()
            .filter(|r| r.state == HoldState::Held && r.created_at < older_than)
            .map(|r| r.id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;

    const TICKET: Snowflake = Snowflake::new(10);

    fn seeded(code: InvitationCode) -> MemoryStore {
        let store = MemoryStore::new();
        store.seed_invitation(code);
        store
    }

    fn redemption(id: i64, invitation: &InvitationCode) -> InvitationRedemption {
        InvitationRedemption::new(Snowflake::new(id), invitation.id, &invitation.code, invitation.ticket_id)
    }

    #[tokio::test]
    async fn test_redeem_until_exhausted() {
        let code = InvitationCode::new(Snowflake::new(1), "VIP", TICKET).with_usage_limit(2);
        let store = seeded(code.clone());
        let now = Utc::now();

        assert!(store.redeem(&redemption(1, &code), now).await.unwrap());
        assert!(store.redeem(&redemption(2, &code), now).await.unwrap());
        assert!(!store.redeem(&redemption(3, &code), now).await.unwrap());

        let stored = store.find_by_code("VIP").await.unwrap().unwrap();
        assert_eq!(stored.used_count, 2);
    }

    #[tokio::test]
    async fn test_redeem_rejects_wrong_ticket_and_expired() {
        let now = Utc::now();
        let expired = InvitationCode::new(Snowflake::new(1), "OLD", TICKET)
            .with_validity(None, Some(now - Duration::days(1)));
        let store = seeded(expired.clone());

        assert!(!store.redeem(&redemption(1, &expired), now).await.unwrap());

        let active = InvitationCode::new(Snowflake::new(2), "NEW", TICKET);
        store.seed_invitation(active.clone());
        let mut other_ticket = redemption(2, &active);
        other_ticket.ticket_id = Snowflake::new(99);
        assert!(!store.redeem(&other_ticket, now).await.unwrap());
    }

    #[tokio::test]
    async fn test_release_gives_the_use_back_once() {
        let code = InvitationCode::new(Snowflake::new(1), "ONCE", TICKET).with_usage_limit(1);
        let store = seeded(code.clone());
        let first = redemption(1, &code);

        assert!(store.redeem(&first, Utc::now()).await.unwrap());
        assert!(store.release_redemption(first.id).await.unwrap());
        assert!(!store.release_redemption(first.id).await.unwrap());
        assert_eq!(store.find_by_code("ONCE").await.unwrap().unwrap().used_count, 0);

        // The freed use is available again
        assert!(store.redeem(&redemption(2, &code), Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_code_is_rejected() {
        let code = InvitationCode::new(Snowflake::new(1), "DUP", TICKET);
        let store = MemoryStore::new();
        InvitationRepository::create(&store, &code).await.unwrap();
        assert!(InvitationRepository::create(&store, &code).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_redemptions_respect_limit() {
        let code = InvitationCode::new(Snowflake::new(1), "RUSH", TICKET).with_usage_limit(7);
        let store = Arc::new(seeded(code.clone()));

        let tasks: Vec<_> = (0..100)
            .map(|i| {
                let store = Arc::clone(&store);
                let r = redemption(100 + i, &code);
                tokio::spawn(async move { store.redeem(&r, Utc::now()).await.unwrap() })
            })
            .collect();

        let mut granted = 0;
        for task in tasks {
            if task.await.unwrap() {
                granted += 1;
            }
        }

        assert_eq!(granted, 7);
        assert_eq!(store.find_by_code("RUSH").await.unwrap().unwrap().used_count, 7);
    }
}
