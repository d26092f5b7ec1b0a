//! Referrals and referral usages
//!
//! Checked usage inserts take the event's async lock; the chain walk and
//! the insert run without awaiting while it is held.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use tokio::sync::Mutex;

use admit_core::entities::{Referral, ReferralInsert, ReferralUsage, UsageInsert};
use admit_core::error::DomainError;
use admit_core::traits::{ReferralRepository, RepoResult};
use admit_core::value_objects::Snowflake;

use super::MemoryStore;

impl MemoryStore {
    fn usage_lock(&self, event_id: Snowflake) -> Arc<Mutex<()>> {
        Arc::clone(
            self.usage_locks
                .entry(event_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    /// The registration that referred `redeemer`, if any
    pub fn referrer_of(&self, redeemer: Snowflake) -> Option<Snowflake> {
        let usage_id = *self.usage_by_redeemer.get(&redeemer)?;
        self.usages.get(&usage_id).map(|u| u.referrer_registration_id)
    }

    /// Whether following "referred by" edges from `start` reaches `target`
    ///
    /// A chain that revisits a node is already a loop and counts as reaching.
    fn chain_reaches(&self, start: Snowflake, target: Snowflake) -> bool {
        let mut seen = HashSet::new();
        let mut current = start;
        while let Some(next) = self.referrer_of(current) {
            if next == target || !seen.insert(next) {
                return true;
            }
            current = next;
        }
        false
    }
}

#[async_trait]
impl ReferralRepository for MemoryStore {
    async fn find_by_code(&self, code: &str) -> RepoResult<Option<Referral>> {
        Ok(self.referrals.get(code).map(|r| r.clone()))
    }

    async fn find_by_registration(&self, registration_id: Snowflake) -> RepoResult<Option<Referral>> {
        let code = match self.referral_owners.get(&registration_id) {
            Some(code) => code.clone(),
            None => return Ok(None),
        };
        Ok(self.referrals.get(&code).map(|r| r.clone()))
    }

    async fn insert(&self, referral: &Referral) -> RepoResult<ReferralInsert> {
        // Lock order: owner entry, then code entry
        match self.referral_owners.entry(referral.registration_id) {
            Entry::Occupied(owner) => {
                let existing = self.referrals.get(owner.get()).map(|r| r.clone());
                existing.map(ReferralInsert::Existing).ok_or_else(|| {
                    DomainError::InternalError(format!(
                        "referral owner {} points at a missing code",
                        referral.registration_id
                    ))
                })
            }
            Entry::Vacant(owner) => match self.referrals.entry(referral.code.clone()) {
                Entry::Occupied(_) => Ok(ReferralInsert::CodeTaken),
                Entry::Vacant(code) => {
                    code.insert(referral.clone());
                    owner.insert(referral.code.clone());
                    Ok(ReferralInsert::Created(referral.clone()))
                }
            },
        }
    }

    async fn set_active(&self, code: &str, active: bool) -> RepoResult<bool> {
        match self.referrals.get_mut(code) {
            Some(mut referral) => {
                referral.is_active = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_usage_checked(&self, usage: &ReferralUsage) -> RepoResult<UsageInsert> {
        let lock = self.usage_lock(usage.event_id);
        let _guard = lock.lock().await;

        if self.usage_by_redeemer.contains_key(&usage.registration_id) {
            return Ok(UsageInsert::AlreadyReferred);
        }
        if usage.referrer_registration_id == usage.registration_id
            || self.chain_reaches(usage.referrer_registration_id, usage.registration_id)
        {
            return Ok(UsageInsert::WouldCycle);
        }

        match self.usage_by_redeemer.entry(usage.registration_id) {
            Entry::Occupied(_) => Ok(UsageInsert::AlreadyReferred),
            Entry::Vacant(slot) => {
                self.usages.insert(usage.id, usage.clone());
                slot.insert(usage.id);
                Ok(UsageInsert::Created)
            }
        }
    }

    async fn delete_usage(&self, id: Snowflake) -> RepoResult<bool> {
        let Some((_, usage)) = self.usages.remove(&id) else {
            return Ok(false);
        };
        self.usage_by_redeemer
            .remove_if(&usage.registration_id, |_, usage_id| *usage_id == id);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    const EVENT: Snowflake = Snowflake::new(1);

    fn usage(id: i64, redeemer: i64, referrer: i64) -> ReferralUsage {
        ReferralUsage {
            id: Snowflake::new(id),
            referral_id: Snowflake::new(77),
            registration_id: Snowflake::new(redeemer),
            referrer_registration_id: Snowflake::new(referrer),
            event_id: EVENT,
            used_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_is_idempotent_per_owner() {
        let store = MemoryStore::new();
        let first = Referral::new(Snowflake::new(1), "AAAA2222", Snowflake::new(100), EVENT);
        let second = Referral::new(Snowflake::new(2), "BBBB3333", Snowflake::new(100), EVENT);

        assert!(matches!(store.insert(&first).await.unwrap(), ReferralInsert::Created(_)));
        match store.insert(&second).await.unwrap() {
            ReferralInsert::Existing(existing) => assert_eq!(existing.code, "AAAA2222"),
            other => panic!("expected existing referral, got {other:?}"),
        }
        assert!(store.find_by_code("BBBB3333").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_code_collision_is_reported() {
        let store = MemoryStore::new();
        let taken = Referral::new(Snowflake::new(1), "SAMECODE", Snowflake::new(100), EVENT);
        let clash = Referral::new(Snowflake::new(2), "SAMECODE", Snowflake::new(101), EVENT);

        store.insert(&taken).await.unwrap();
        assert_eq!(store.insert(&clash).await.unwrap(), ReferralInsert::CodeTaken);
        assert!(store.find_by_registration(Snowflake::new(101)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_one_incoming_usage_per_registration() {
        let store = MemoryStore::new();
        assert_eq!(store.create_usage_checked(&usage(1, 200, 100)).await.unwrap(), UsageInsert::Created);
        assert_eq!(
            store.create_usage_checked(&usage(2, 200, 101)).await.unwrap(),
            UsageInsert::AlreadyReferred
        );
        assert_eq!(store.referrer_of(Snowflake::new(200)), Some(Snowflake::new(100)));
    }

    #[tokio::test]
    async fn test_checked_insert_refuses_to_close_a_loop() {
        // 1 was referred by 2, 2 by 3; 3 redeeming 1's code closes the loop
        let store = MemoryStore::new();
        store.create_usage_checked(&usage(1, 1, 2)).await.unwrap();
        store.create_usage_checked(&usage(2, 2, 3)).await.unwrap();

        assert_eq!(store.create_usage_checked(&usage(3, 3, 1)).await.unwrap(), UsageInsert::WouldCycle);
        assert_eq!(store.create_usage_checked(&usage(4, 4, 4)).await.unwrap(), UsageInsert::WouldCycle);
        assert!(store.referrer_of(Snowflake::new(3)).is_none());

        assert_eq!(store.create_usage_checked(&usage(5, 4, 1)).await.unwrap(), UsageInsert::Created);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_mutual_checked_inserts_keep_one() {
        let store = Arc::new(MemoryStore::new());
        let a = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.create_usage_checked(&usage(1, 1, 2)).await.unwrap() }
        });
        let b = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.create_usage_checked(&usage(2, 2, 1)).await.unwrap() }
        });

        let mut outcomes = vec![a.await.unwrap(), b.await.unwrap()];
        outcomes.sort_by_key(|o| *o == UsageInsert::WouldCycle);
        assert_eq!(outcomes, vec![UsageInsert::Created, UsageInsert::WouldCycle]);
    }

    #[tokio::test]
    async fn test_delete_usage_frees_the_redeemer() {
        let store = MemoryStore::new();
        store.create_usage_checked(&usage(1, 200, 100)).await.unwrap();

        assert!(store.delete_usage(Snowflake::new(1)).await.unwrap());
        assert!(!store.delete_usage(Snowflake::new(1)).await.unwrap());
        assert!(store.referrer_of(Snowflake::new(200)).is_none());
        assert_eq!(store.create_usage_checked(&usage(2, 200, 101)).await.unwrap(), UsageInsert::Created);
    }

    #[tokio::test]
    async fn test_set_active() {
        let store = MemoryStore::new();
        store
            .insert(&Referral::new(Snowflake::new(1), "TOGGLE22", Snowflake::new(100), EVENT))
            .await
            .unwrap();

        assert!(store.set_active("TOGGLE22", false).await.unwrap());
        assert!(!store.find_by_code("TOGGLE22").await.unwrap().unwrap().is_active);
        assert!(!store.set_active("MISSING2", false).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_inserts_observe_one_code() {
        let store = Arc::new(MemoryStore::new());
        let owner = Snowflake::new(100);

        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let referral = Referral::new(Snowflake::new(i), format!("CODE{i:04}"), owner, EVENT);
                    match store.insert(&referral).await.unwrap() {
                        ReferralInsert::Created(r) | ReferralInsert::Existing(r) => r.code,
                        ReferralInsert::CodeTaken => unreachable!("codes are distinct"),
                    }
                })
            })
            .collect();

        let mut codes = Vec::new();
        for task in tasks {
            codes.push(task.await.unwrap());
        }
        codes.dedup();
        assert_eq!(codes.len(), 1);
    }
}
