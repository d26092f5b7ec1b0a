//! # admit-db
//!
//! Storage layer implementing the admit-core storage traits.
//!
//! ## Overview
//!
//! - PostgreSQL repositories (SQLx, runtime-checked queries) with connection
//!   pool management and schema migrations
//! - Database models with SQLx `FromRow` derives and entity mappers
//! - [`MemoryStore`], a lock-free in-process implementation used when no
//!   database is configured and throughout the test suites
//!
//! ## Usage
//!
//! ```rust,ignore
//! use admit_db::{create_pool, run_migrations, DatabaseConfig, PgTicketRepository};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool(&DatabaseConfig::new("postgres://localhost/admit")).await?;
//!     run_migrations(&pool).await?;
//!     let tickets = PgTicketRepository::new(pool);
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod memory;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use memory::MemoryStore;
pub use pool::{create_pool, run_migrations, DatabaseConfig, PgPool};
pub use repositories::{
    PgEventRepository, PgInvitationRepository, PgReferralRepository, PgRegistrationRepository,
    PgTicketRepository,
};
