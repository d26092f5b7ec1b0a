//! Registration handlers
//!
//! Admission, lookups, referral codes and staff operations on registrations.

use admit_service::{
    CancelRegistrationRequest, RedeemReferralRequest, ReferralResponse, ReferralUsageResponse,
    RegisterRequest, RegistrationCoordinator, RegistrationResponse,
};
use axum::{extract::State, Json};
use tracing::info;

use crate::extractors::{
    AuthUser, EventIdPath, OptionalValidatedJson, RegistrationIdPath, SnowflakePath, ValidatedJson,
};
use crate::response::{ApiResult, Created};
use crate::state::AppState;

/// Register the caller for an event
///
/// POST /events/{event_id}/registrations
pub async fn register(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(path): SnowflakePath<EventIdPath>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> ApiResult<Created<Json<RegistrationResponse>>> {
    let intent = request.into_intent(auth.user_id, path.event_id()?, &auth.email);

    let registration = RegistrationCoordinator::new(state.service_context())
        .register(intent)
        .await?;
    Ok(Created(Json(registration.into())))
}

/// Get a registration (owner or staff)
///
/// GET /registrations/{registration_id}
pub async fn get_registration(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(path): SnowflakePath<RegistrationIdPath>,
) -> ApiResult<Json<RegistrationResponse>> {
    let registration = RegistrationCoordinator::new(state.service_context())
        .get_registration_for(path.registration_id()?, auth.user_id, auth.admin)
        .await?;
    Ok(Json(registration.into()))
}

/// Get the registration's shareable referral code
///
/// GET /registrations/{registration_id}/referral
pub async fn get_referral(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(path): SnowflakePath<RegistrationIdPath>,
) -> ApiResult<Json<ReferralResponse>> {
    let coordinator = RegistrationCoordinator::new(state.service_context());
    let registration = coordinator
        .get_registration_for(path.registration_id()?, auth.user_id, auth.admin)
        .await?;

    let referral = coordinator.referral_code(registration.id).await?;
    Ok(Json(referral.into()))
}

/// Record that an existing registration was referred by `code`
///
/// POST /registrations/{registration_id}/referral-usage
pub async fn redeem_referral(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(path): SnowflakePath<RegistrationIdPath>,
    ValidatedJson(request): ValidatedJson<RedeemReferralRequest>,
) -> ApiResult<Created<Json<ReferralUsageResponse>>> {
    let coordinator = RegistrationCoordinator::new(state.service_context());
    let registration = coordinator
        .get_registration_for(path.registration_id()?, auth.user_id, auth.admin)
        .await?;

    let usage = coordinator.redeem_referral(registration.id, &request.code).await?;
    Ok(Created(Json(usage.into())))
}

/// Cancel a registration and return its seat and invitation use
///
/// POST /registrations/{registration_id}/cancel
pub async fn cancel_registration(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(path): SnowflakePath<RegistrationIdPath>,
    OptionalValidatedJson(request): OptionalValidatedJson<CancelRegistrationRequest>,
) -> ApiResult<Json<RegistrationResponse>> {
    auth.require_admin()?;
    let registration_id = path.registration_id()?;

    if let Some(reason) = request.and_then(|r| r.reason) {
        info!(registration_id = %registration_id, actor_id = %auth.user_id, reason = %reason, "Cancellation requested");
    }

    let registration = RegistrationCoordinator::new(state.service_context())
        .cancel(registration_id, auth.user_id)
        .await?;
    Ok(Json(registration.into()))
}

/// Check an attendee in at the venue
///
/// POST /registrations/{registration_id}/check-in
pub async fn check_in(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(path): SnowflakePath<RegistrationIdPath>,
) -> ApiResult<Json<RegistrationResponse>> {
    auth.require_admin()?;

    let registration = RegistrationCoordinator::new(state.service_context())
        .check_in(path.registration_id()?, auth.user_id)
        .await?;
    Ok(Json(registration.into()))
}
