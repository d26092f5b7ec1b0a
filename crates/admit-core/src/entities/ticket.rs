//! Ticket entity - a bounded inventory of admissions to one event

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::value_objects::Snowflake;

/// Ticket entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub id: Snowflake,
    pub event_id: Snowflake,
    pub name: String,
    /// Price in minor currency units; stored, never interpreted here
    pub price: i64,
    /// Capacity
    pub quantity: i32,
    /// Committed plus currently held admissions
    pub sold_count: i32,
    pub require_invite_code: bool,
    pub require_sms_verification: bool,
    pub sale_start: Option<DateTime<Utc>>,
    pub sale_end: Option<DateTime<Utc>>,
    pub hidden: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    /// Create a new active Ticket with the given capacity and nothing sold
    pub fn new(id: Snowflake, event_id: Snowflake, name: impl Into<String>, quantity: i32) -> Self {
        Self {
            id,
            event_id,
            name: name.into(),
            price: 0,
            quantity,
            sold_count: 0,
            require_invite_code: false,
            require_sms_verification: false,
            sale_start: None,
            sale_end: None,
            hidden: false,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    /// Set the price
    pub fn with_price(mut self, price: i64) -> Self {
        self.price = price;
        self
    }

    /// Restrict sales to a window; either bound may be open
    pub fn with_sales_window(
        mut self,
        sale_start: Option<DateTime<Utc>>,
        sale_end: Option<DateTime<Utc>>,
    ) -> Self {
        self.sale_start = sale_start;
        self.sale_end = sale_end;
        self
    }

    /// Require an invitation code to register
    pub fn with_invite_required(mut self, required: bool) -> Self {
        self.require_invite_code = required;
        self
    }

    /// Set the already-sold count (seeding and tests)
    pub fn with_sold_count(mut self, sold_count: i32) -> Self {
        self.sold_count = sold_count;
        self
    }

    /// Mark the ticket as inactive
    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Check whether `now` falls inside the sales window
    pub fn sales_window_open(&self, now: DateTime<Utc>) -> bool {
        let started = self.sale_start.is_none_or(|start| start <= now);
        let not_ended = self.sale_end.is_none_or(|end| now <= end);
        started && not_ended
    }

    /// Check whether `requested` more admissions fit in the remaining capacity
    #[inline]
    pub fn has_capacity_for(&self, requested: i32) -> bool {
        self.sold_count
            .checked_add(requested)
            .is_some_and(|total| total <= self.quantity)
    }

    /// Remaining capacity (never negative)
    #[inline]
    pub fn remaining(&self) -> i32 {
        (self.quantity - self.sold_count).max(0)
    }

    /// Snapshot of availability for display
    pub fn availability(&self, now: DateTime<Utc>) -> Availability {
        Availability {
            ticket_id: self.id,
            capacity: self.quantity,
            sold: self.sold_count,
            remaining: self.remaining(),
            on_sale: self.is_active && self.sales_window_open(now) && self.remaining() > 0,
        }
    }
}

/// Point-in-time availability of a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub ticket_id: Snowflake,
    pub capacity: i32,
    pub sold: i32,
    pub remaining: i32,
    pub on_sale: bool,
}
