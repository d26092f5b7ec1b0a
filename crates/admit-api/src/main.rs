//! Admission API server entry point
//!
//! Run with:
//! ```bash
//! cargo run -p admit-api
//! ```
//!
//! Configuration is loaded from environment variables (and `.env`). Without
//! `DATABASE_URL` the server runs on the in-process store.

use admit_common::{try_init_tracing, try_init_tracing_with_config, AppConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            if let Err(e) = try_init_tracing() {
                eprintln!("Warning: Failed to initialize tracing: {e}");
            }
            error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        env = ?config.app.env,
        port = config.api.port,
        storage = if config.database.url.is_some() { "postgres" } else { "memory" },
        "Configuration loaded"
    );

    if let Err(e) = admit_api::run(config).await {
        error!(error = %e, "Server failed");
        std::process::exit(1);
    }
}
