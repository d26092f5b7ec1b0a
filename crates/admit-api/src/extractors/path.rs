//! Path parameter extractors
//!
//! Type-safe extraction of Snowflake IDs from path parameters.

use admit_core::Snowflake;
use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::response::ApiError;

/// Path extractor that rejects with [`ApiError`] instead of axum's plain text
#[derive(Debug, Clone)]
pub struct SnowflakePath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for SnowflakePath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(inner) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::invalid_path(e.to_string()))?;

        Ok(SnowflakePath(inner))
    }
}

fn parse_id(raw: &str, name: &str) -> Result<Snowflake, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::invalid_path(format!("Invalid {name} format")))
}

/// Path parameters with event_id
#[derive(Debug, serde::Deserialize)]
pub struct EventIdPath {
    pub event_id: String,
}

impl EventIdPath {
    pub fn event_id(&self) -> Result<Snowflake, ApiError> {
        parse_id(&self.event_id, "event_id")
    }
}

/// Path parameters with registration_id
#[derive(Debug, serde::Deserialize)]
pub struct RegistrationIdPath {
    pub registration_id: String,
}

impl RegistrationIdPath {
    pub fn registration_id(&self) -> Result<Snowflake, ApiError> {
        parse_id(&self.registration_id, "registration_id")
    }
}

/// Path parameters with ticket_id
#[derive(Debug, serde::Deserialize)]
pub struct TicketIdPath {
    pub ticket_id: String,
}

impl TicketIdPath {
    pub fn ticket_id(&self) -> Result<Snowflake, ApiError> {
        parse_id(&self.ticket_id, "ticket_id")
    }
}
