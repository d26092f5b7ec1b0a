//! Application state
//!
//! Holds the shared state for the Axum application including
//! the service context, token validation, and configuration.

use std::sync::Arc;

use admit_common::{AppConfig, JwtService};
use admit_db::PgPool;
use admit_service::ServiceContext;

/// Backing store the service context was built on
#[derive(Clone)]
pub enum Storage {
    Postgres(PgPool),
    /// In-process store, lost on restart
    Memory,
}

impl Storage {
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Memory => "memory",
        }
    }

    /// Whether the store can serve requests right now
    pub async fn is_healthy(&self) -> bool {
        match self {
            Self::Postgres(pool) => pool.acquire().await.is_ok(),
            Self::Memory => true,
        }
    }
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    service_context: Arc<ServiceContext>,
    jwt_service: Arc<JwtService>,
    config: Arc<AppConfig>,
    storage: Storage,
}

impl AppState {
    pub fn new(
        service_context: ServiceContext,
        jwt_service: Arc<JwtService>,
        config: AppConfig,
        storage: Storage,
    ) -> Self {
        Self {
            service_context: Arc::new(service_context),
            jwt_service,
            config: Arc::new(config),
            storage,
        }
    }

    pub fn service_context(&self) -> &ServiceContext {
        &self.service_context
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Validates bearer tokens issued by the identity service
    pub fn jwt_service(&self) -> &JwtService {
        &self.jwt_service
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service_context", &self.service_context)
            .field("storage", &self.storage.backend_name())
            .field("env", &self.config.app.env)
            .finish_non_exhaustive()
    }
}
