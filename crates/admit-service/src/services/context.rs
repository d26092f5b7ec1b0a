//! Service context - dependency container for services
//!
//! Holds the storage traits, ID generator, form validation capability, and
//! admission settings shared by the ledger components and the coordinator.

use std::sync::Arc;

use admit_common::AdmissionConfig;
use admit_core::traits::{
    EventRepository, FormValidator, InvitationRepository, MaxSizeForms, ReferralRepository,
    RegistrationRepository, TicketRepository,
};
use admit_core::{Snowflake, SnowflakeGenerator};
use admit_db::MemoryStore;

use super::error::{ServiceError, ServiceResult};
use super::retry::RetryPolicy;

/// Service context containing all dependencies
///
/// Cheap to clone; every field is shared.
#[derive(Clone)]
pub struct ServiceContext {
    // Repositories
    event_repo: Arc<dyn EventRepository>,
    ticket_repo: Arc<dyn TicketRepository>,
    invitation_repo: Arc<dyn InvitationRepository>,
    registration_repo: Arc<dyn RegistrationRepository>,
    referral_repo: Arc<dyn ReferralRepository>,

    // Capabilities
    form_validator: Arc<dyn FormValidator>,
    snowflake_generator: Arc<SnowflakeGenerator>,

    // Settings
    admission: AdmissionConfig,
    retry_policy: RetryPolicy,
}

impl ServiceContext {
    /// Start building a context
    pub fn builder() -> ServiceContextBuilder {
        ServiceContextBuilder::new()
    }

    // === Repositories ===

    pub fn event_repo(&self) -> &dyn EventRepository {
        self.event_repo.as_ref()
    }

    pub fn ticket_repo(&self) -> &dyn TicketRepository {
        self.ticket_repo.as_ref()
    }

    pub fn invitation_repo(&self) -> &dyn InvitationRepository {
        self.invitation_repo.as_ref()
    }

    pub fn registration_repo(&self) -> &dyn RegistrationRepository {
        self.registration_repo.as_ref()
    }

    pub fn referral_repo(&self) -> &dyn ReferralRepository {
        self.referral_repo.as_ref()
    }

    // === Capabilities ===

    /// Get the form validation capability
    pub fn form_validator(&self) -> &dyn FormValidator {
        self.form_validator.as_ref()
    }

    /// Generate a new Snowflake ID
    pub fn generate_id(&self) -> Snowflake {
        self.snowflake_generator.generate()
    }

    // === Settings ===

    pub fn admission(&self) -> &AdmissionConfig {
        &self.admission
    }

    /// Backoff used for compensating releases
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("repositories", &"...")
            .field("worker_id", &self.snowflake_generator.worker_id())
            .field("admission", &self.admission)
            .finish()
    }
}

/// Builder for creating ServiceContext with custom configuration
#[derive(Default)]
pub struct ServiceContextBuilder {
    event_repo: Option<Arc<dyn EventRepository>>,
    ticket_repo: Option<Arc<dyn TicketRepository>>,
    invitation_repo: Option<Arc<dyn InvitationRepository>>,
    registration_repo: Option<Arc<dyn RegistrationRepository>>,
    referral_repo: Option<Arc<dyn ReferralRepository>>,
    form_validator: Option<Arc<dyn FormValidator>>,
    snowflake_generator: Option<Arc<SnowflakeGenerator>>,
    admission: Option<AdmissionConfig>,
    retry_policy: Option<RetryPolicy>,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_repo(mut self, repo: Arc<dyn EventRepository>) -> Self {
        self.event_repo = Some(repo);
        self
    }

    pub fn ticket_repo(mut self, repo: Arc<dyn TicketRepository>) -> Self {
        self.ticket_repo = Some(repo);
        self
    }

    pub fn invitation_repo(mut self, repo: Arc<dyn InvitationRepository>) -> Self {
        self.invitation_repo = Some(repo);
        self
    }

    pub fn registration_repo(mut self, repo: Arc<dyn RegistrationRepository>) -> Self {
        self.registration_repo = Some(repo);
        self
    }

    pub fn referral_repo(mut self, repo: Arc<dyn ReferralRepository>) -> Self {
        self.referral_repo = Some(repo);
        self
    }

    /// Use one in-process store for every repository
    pub fn memory_store(self, store: Arc<MemoryStore>) -> Self {
        self.event_repo(store.clone())
            .ticket_repo(store.clone())
            .invitation_repo(store.clone())
            .registration_repo(store.clone())
            .referral_repo(store)
    }

    pub fn form_validator(mut self, validator: Arc<dyn FormValidator>) -> Self {
        self.form_validator = Some(validator);
        self
    }

    pub fn snowflake_generator(mut self, generator: Arc<SnowflakeGenerator>) -> Self {
        self.snowflake_generator = Some(generator);
        self
    }

    pub fn admission(mut self, config: AdmissionConfig) -> Self {
        self.admission = Some(config);
        self
    }

    /// Override the retry policy derived from the admission settings
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Build the ServiceContext
    ///
    /// Missing settings fall back to defaults; the form validator defaults
    /// to a size limit taken from the admission settings.
    ///
    /// # Errors
    /// Returns `ServiceError::Internal` if a repository was not provided
    pub fn build(self) -> ServiceResult<ServiceContext> {
        let admission = self.admission.unwrap_or_default();
        let retry_policy = self
            .retry_policy
            .unwrap_or_else(|| RetryPolicy::from_config(&admission));
        let form_validator = self.form_validator.unwrap_or_else(|| {
            Arc::new(MaxSizeForms {
                max_bytes: admission.max_form_bytes,
            })
        });

        Ok(ServiceContext {
            event_repo: self.event_repo.ok_or_else(|| missing("event_repo"))?,
            ticket_repo: self.ticket_repo.ok_or_else(|| missing("ticket_repo"))?,
            invitation_repo: self.invitation_repo.ok_or_else(|| missing("invitation_repo"))?,
            registration_repo: self.registration_repo.ok_or_else(|| missing("registration_repo"))?,
            referral_repo: self.referral_repo.ok_or_else(|| missing("referral_repo"))?,
            form_validator,
            snowflake_generator: self
                .snowflake_generator
                .unwrap_or_else(|| Arc::new(SnowflakeGenerator::new(0))),
            admission,
            retry_policy,
        })
    }
}

fn missing(name: &str) -> ServiceError {
    ServiceError::internal(format!("{name} is required"))
}
