//! Test helpers for integration tests
//!
//! Spawns a server on an ephemeral port and wraps the HTTP calls the tests make.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use admit_api::{create_app, create_app_state_with_store};
use admit_common::{AppConfig, JwtService};
use admit_core::Snowflake;
use admit_db::MemoryStore;
use anyhow::Result;
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Shared by the server under test and the token helper
pub const TEST_JWT_SECRET: &str = "integration-test-secret-that-is-long-enough";

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    /// Seed or inspect storage directly
    pub store: Arc<MemoryStore>,
    jwt: JwtService,
    handle: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl TestServer {
    /// Start a server over the standard catalog (see [`crate::seed_catalog`])
    pub async fn start() -> Result<Self> {
        let store = MemoryStore::shared();
        crate::seed_catalog(&store, crate::GENERAL_CAPACITY);
        Self::start_with_store(store).await
    }

    /// Start a server over a store the caller seeded
    pub async fn start_with_store(store: Arc<MemoryStore>) -> Result<Self> {
        Self::start_with_config(AppConfig::in_memory(TEST_JWT_SECRET), store).await
    }

    pub async fn start_with_config(config: AppConfig, store: Arc<MemoryStore>) -> Result<Self> {
        let jwt = JwtService::new(&config.jwt.secret, config.jwt.access_token_expiry);
        let state = create_app_state_with_store(config, Arc::clone(&store))?;
        let app = create_app(state);

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            store,
            jwt,
            handle,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Bearer token as the identity service would issue it
    pub fn token(&self, user_id: i64, email: &str) -> String {
        self.jwt
            .issue(Snowflake::new(user_id), email, false)
            .expect("token issue")
    }

    /// Bearer token with staff rights
    pub fn admin_token(&self, user_id: i64) -> String {
        self.jwt
            .issue(Snowflake::new(user_id), "staff@example.com", true)
            .expect("token issue")
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Make a GET request with auth token
    pub async fn get_auth(&self, path: &str, token: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).bearer_auth(token).send().await?)
    }

    /// Make a POST request with JSON body and no credentials
    pub async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.post(&url).json(body).send().await?)
    }

    /// Make a POST request with auth token
    pub async fn post_auth<T: Serialize>(&self, path: &str, token: &str, body: &T) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.post(&url).bearer_auth(token).json(body).send().await?)
    }

    /// Make a POST request with auth token and an empty body
    pub async fn post_auth_empty(&self, path: &str, token: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.post(&url).bearer_auth(token).send().await?)
    }
}

/// Assert response status and parse JSON body
pub async fn assert_json<T: DeserializeOwned>(response: Response, expected_status: StatusCode) -> Result<T> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!("Expected status {expected_status}, got {status}. Body: {body}");
    }
    Ok(response.json().await?)
}

/// Assert response status without parsing body
pub async fn assert_status(response: Response, expected_status: StatusCode) -> Result<()> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!("Expected status {expected_status}, got {status}. Body: {body}");
    }
    Ok(())
}

/// Assert an error response and return its machine code
pub async fn assert_error(response: Response, expected_status: StatusCode) -> Result<String> {
    let body: crate::ErrorEnvelope = assert_json(response, expected_status).await?;
    Ok(body.error.code)
}
