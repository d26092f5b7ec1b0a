//! Ticket and inventory hold database models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for tickets table
#[derive(Debug, Clone, FromRow)]
pub struct TicketModel {
    pub id: i64,
    pub event_id: i64,
    pub name: String,
    pub price: i64,
    pub quantity: i32,
    pub sold_count: i32,
    pub require_invite_code: bool,
    pub require_sms_verification: bool,
    pub sale_start: Option<DateTime<Utc>>,
    pub sale_end: Option<DateTime<Utc>>,
    pub hidden: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Database model for inventory_holds table
#[derive(Debug, Clone, FromRow)]
pub struct InventoryHoldModel {
    pub id: i64,
    pub ticket_id: i64,
    pub quantity: i32,
    pub state: String,
    pub created_at: DateTime<Utc>,
}
