//! Registration entity <-> model mapper

use admit_core::entities::{Registration, RegistrationStatus};
use admit_core::error::DomainError;
use admit_core::value_objects::{FormPayload, Snowflake};

use crate::models::RegistrationModel;

impl TryFrom<RegistrationModel> for Registration {
    type Error = DomainError;

    fn try_from(model: RegistrationModel) -> Result<Self, Self::Error> {
        let status = RegistrationStatus::parse(&model.status).ok_or_else(|| {
            DomainError::DatabaseError(format!("unknown registration status '{}'", model.status))
        })?;
        let form_data = model.form_data.map(|value| {
            let version = model
                .form_schema_version
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(1);
            FormPayload::new(version, value)
        });

        Ok(Registration {
            id: Snowflake::new(model.id),
            user_id: Snowflake::new(model.user_id),
            event_id: Snowflake::new(model.event_id),
            ticket_id: Snowflake::new(model.ticket_id),
            email: model.email,
            status,
            form_data,
            referred_by: model.referred_by,
            reservation_id: Snowflake::new(model.reservation_id),
            redemption_id: model.redemption_id.map(Snowflake::new),
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

/// Registration values prepared for database insertion
pub struct RegistrationInsert<'a> {
    pub id: i64,
    pub user_id: i64,
    pub event_id: i64,
    pub ticket_id: i64,
    pub email: &'a str,
    pub status: &'static str,
    pub form_schema_version: Option<i32>,
    pub form_data: Option<&'a serde_json::Value>,
    pub referred_by: Option<&'a str>,
    pub reservation_id: i64,
    pub redemption_id: Option<i64>,
}

impl<'a> RegistrationInsert<'a> {
    pub fn new(registration: &'a Registration) -> Self {
        Self {
            id: registration.id.into_inner(),
            user_id: registration.user_id.into_inner(),
            event_id: registration.event_id.into_inner(),
            ticket_id: registration.ticket_id.into_inner(),
            email: &registration.email,
            status: registration.status.as_str(),
            form_schema_version: registration
                .form_data
                .as_ref()
                .and_then(|f| i32::try_from(f.schema_version).ok()),
            form_data: registration.form_data.as_ref().map(|f| &f.value),
            referred_by: registration.referred_by.as_deref(),
            reservation_id: registration.reservation_id.into_inner(),
            redemption_id: registration.redemption_id.map(Snowflake::into_inner),
        }
    }
}
