//! # admit-service
//!
//! Application layer: the inventory ledger, invitation redeemer, referral
//! graph, and the registration coordinator that drives them, plus DTOs.

pub mod dto;
pub mod services;

pub use services::{
    AdmissionPhase, InventoryLedger, InvitationRedeemer, ReferralGraph, RegistrationCoordinator,
    RegistrationIntent, RedemptionToken, ReservationToken, RetryPolicy, ServiceContext,
    ServiceContextBuilder, ServiceError, ServiceResult, SweepReport, SweeperHandle, spawn_sweeper,
    sweep_once,
};

pub use dto::{
    AvailabilityResponse, CancelRegistrationRequest, HealthResponse, ReadinessResponse,
    RedeemReferralRequest, ReferralResponse, ReferralUsageResponse, RegisterRequest,
    RegistrationResponse,
};
