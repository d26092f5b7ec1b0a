//! Registration database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for registrations table
#[derive(Debug, Clone, FromRow)]
pub struct RegistrationModel {
    pub id: i64,
    pub user_id: i64,
    pub event_id: i64,
    pub ticket_id: i64,
    pub email: String,
    pub status: String,
    pub form_schema_version: Option<i32>,
    pub form_data: Option<serde_json::Value>,
    pub referred_by: Option<String>,
    pub reservation_id: i64,
    pub redemption_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
