//! Server setup and initialization
//!
//! Provides the application builder, state wiring for both storage backends,
//! and the server runner.

use std::sync::Arc;

use admit_common::{AppConfig, AppError, JwtService};
use admit_core::SnowflakeGenerator;
use admit_db::{
    create_pool, run_migrations, DatabaseConfig, MemoryStore, PgEventRepository,
    PgInvitationRepository, PgReferralRepository, PgRegistrationRepository, PgTicketRepository,
};
use admit_service::{spawn_sweeper, ServiceContext, ServiceContextBuilder};
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use crate::middleware::{apply_middleware, apply_middleware_with_config};
use crate::routes::{create_router, health_routes};
use crate::state::{AppState, Storage};

/// Build the complete Axum application with all routes and middleware
///
/// Health checks skip rate limiting and CORS.
pub fn create_app(state: AppState) -> Router {
    let config = state.config();
    let api = apply_middleware_with_config(create_router(), config);
    let health = apply_middleware(health_routes(), config.api.request_timeout_secs);
    api.merge(health).with_state(state)
}

fn base_context(config: &AppConfig) -> ServiceContextBuilder {
    ServiceContext::builder()
        .snowflake_generator(Arc::new(SnowflakeGenerator::new(config.snowflake.worker_id)))
        .admission(config.admission.clone())
}

fn jwt_service(config: &AppConfig) -> Arc<JwtService> {
    Arc::new(JwtService::new(&config.jwt.secret, config.jwt.access_token_expiry))
}

/// Initialize all dependencies and create AppState
///
/// Connects to PostgreSQL when a database URL is configured, otherwise the
/// service runs on a fresh in-process store.
pub async fn create_app_state(config: AppConfig) -> Result<AppState, AppError> {
    let Some(db_config) = DatabaseConfig::from_app_config(&config.database) else {
        warn!("DATABASE_URL not set, using the in-process store");
        return create_app_state_with_store(config, MemoryStore::shared());
    };

    info!("Connecting to PostgreSQL...");
    let pool = create_pool(&db_config)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    info!("PostgreSQL connection established");

    if config.database.run_migrations {
        run_migrations(&pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
    }

    let service_context = base_context(&config)
        .event_repo(Arc::new(PgEventRepository::new(pool.clone())))
        .ticket_repo(Arc::new(PgTicketRepository::new(pool.clone())))
        .invitation_repo(Arc::new(PgInvitationRepository::new(pool.clone())))
        .registration_repo(Arc::new(PgRegistrationRepository::new(pool.clone())))
        .referral_repo(Arc::new(PgReferralRepository::new(pool.clone())))
        .build()
        .map_err(|e| AppError::Config(e.to_string()))?;

    let jwt = jwt_service(&config);
    Ok(AppState::new(service_context, jwt, config, Storage::Postgres(pool)))
}

/// Create AppState on top of an existing in-process store
///
/// Events, tickets and invitation codes are seeded through the store's
/// helpers before or after the state is built.
pub fn create_app_state_with_store(config: AppConfig, store: Arc<MemoryStore>) -> Result<AppState, AppError> {
    let service_context = base_context(&config)
        .memory_store(store)
        .build()
        .map_err(|e| AppError::Config(e.to_string()))?;

    let jwt = jwt_service(&config);
    Ok(AppState::new(service_context, jwt, config, Storage::Memory))
}

/// Serve on an already bound listener until a shutdown signal arrives
pub async fn run_server(app: Router, listener: TcpListener) -> Result<(), AppError> {
    if let Ok(addr) = listener.local_addr() {
        info!("Server listening on http://{}", addr);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    info!("Server stopped");
    Ok(())
}

/// Run the complete server with configuration
///
/// The stale-hold sweeper runs for as long as the server does.
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr = config.api.address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    let state = create_app_state(config).await?;
    let sweeper = spawn_sweeper(state.service_context().clone());

    let result = run_server(create_app(state), listener).await;
    sweeper.shutdown().await;
    result
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_state_without_database_uses_memory_store() {
        let config = AppConfig::in_memory("test-secret-key-that-is-long-enough");
        let state = create_app_state(config).await.unwrap();

        assert_eq!(state.storage().backend_name(), "memory");
        assert!(state.storage().is_healthy().await);
    }
}
