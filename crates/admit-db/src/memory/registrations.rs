//! Registrations
//!
//! `(event, email)` uniqueness is decided under the entry lock of
//! `registration_emails`; the registration row is written while that lock
//! is held, so a reader that finds the email also finds the row.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;

use admit_core::entities::{Registration, RegistrationStatus};
use admit_core::error::DomainError;
use admit_core::traits::{RegistrationRepository, RepoResult};
use admit_core::value_objects::Snowflake;

use super::MemoryStore;

#[async_trait]
impl RegistrationRepository for MemoryStore {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Registration>> {
        Ok(self.registrations.get(&id).map(|r| r.clone()))
    }

    async fn find_by_email(&self, event_id: Snowflake, email: &str) -> RepoResult<Option<Registration>> {
        let id = match self.registration_emails.get(&(event_id, email.to_string())) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.registrations.get(&id).map(|r| r.clone()))
    }

    async fn create(&self, registration: &Registration) -> RepoResult<()> {
        let key = (registration.event_id, registration.email.clone());
        match self.registration_emails.entry(key) {
            Entry::Occupied(_) => Err(DomainError::DuplicateRegistration {
                event_id: registration.event_id,
            }),
            Entry::Vacant(slot) => {
                self.registrations.insert(registration.id, registration.clone());
                self.registration_counts
                    .entry(registration.event_id)
                    .or_insert_with(|| AtomicI64::new(0))
                    .fetch_add(1, Ordering::AcqRel);
                slot.insert(registration.id);
                Ok(())
            }
        }
    }

    async fn update_status(
        &self,
        id: Snowflake,
        from: RegistrationStatus,
        to: RegistrationStatus,
    ) -> RepoResult<bool> {
        let Some(mut registration) = self.registrations.get_mut(&id) else {
            return Ok(false);
        };
        if registration.status != from {
            return Ok(false);
        }
        registration.status = to;
        registration.updated_at = Utc::now();
        Ok(true)
    }

    async fn set_referred_by(&self, id: Snowflake, code: &str) -> RepoResult<bool> {
        let Some(mut registration) = self.registrations.get_mut(&id) else {
            return Ok(false);
        };
        if registration.referred_by.is_some() {
            return Ok(false);
        }
        registration.referred_by = Some(code.to_string());
        registration.updated_at = Utc::now();
        Ok(true)
    }
}

impl MemoryStore {
    /// Registrations stored for an event, cancelled ones included
    pub fn registration_count(&self, event_id: Snowflake) -> i64 {
        self.registration_counts
            .get(&event_id)
            .map_or(0, |count| count.load(Ordering::Acquire))
    }
}
