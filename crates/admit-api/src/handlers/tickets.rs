//! Ticket handlers

use admit_service::{AvailabilityResponse, RegistrationCoordinator};
use axum::{extract::State, Json};

use crate::extractors::{SnowflakePath, TicketIdPath};
use crate::response::ApiResult;
use crate::state::AppState;

/// Remaining seats of a ticket (no auth required)
///
/// GET /tickets/{ticket_id}/availability
pub async fn get_availability(
    State(state): State<AppState>,
    SnowflakePath(path): SnowflakePath<TicketIdPath>,
) -> ApiResult<Json<AvailabilityResponse>> {
    let availability = RegistrationCoordinator::new(state.service_context())
        .availability(path.ticket_id()?)
        .await?;
    Ok(Json(availability.into()))
}
