//! API Integration Tests
//!
//! Each test spawns its own server on the in-process store; no external
//! services are needed.
//!
//! Run with: cargo test -p integration-tests --test api_tests

use admit_db::MemoryStore;
use futures::future::join_all;
use integration_tests::{
    assert_error, assert_json, assert_status, fixtures::*, TestServer,
};
use reqwest::StatusCode;
use serde_json::json;

async fn register_as(server: &TestServer, token: &str, body: &serde_json::Value) -> RegistrationBody {
    let response = server.post_auth(&registrations_path(), token, body).await.unwrap();
    assert_json(response, StatusCode::CREATED).await.unwrap()
}

async fn availability(server: &TestServer, ticket_id: i64) -> AvailabilityBody {
    let response = server.get(&availability_path(ticket_id)).await.unwrap();
    assert_json(response, StatusCode::OK).await.unwrap()
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/health").await.expect("Request failed");
    assert_status(response, StatusCode::OK).await.unwrap();
}

#[tokio::test]
async fn test_health_ready_reports_backend() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/health/ready").await.expect("Request failed");
    let body: serde_json::Value = assert_json(response, StatusCode::OK).await.unwrap();

    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["storage_backend"], "memory");
}

// ============================================================================
// Authentication Tests
// ============================================================================

#[tokio::test]
async fn test_register_requires_token() {
    let server = TestServer::start().await.unwrap();

    let response = server.post(&registrations_path(), &register_body()).await.unwrap();
    let code = assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(code, "MISSING_AUTHORIZATION");
}

#[tokio::test]
async fn test_register_rejects_forged_token() {
    let server = TestServer::start().await.unwrap();

    let response = server
        .post_auth(&registrations_path(), "not.a.jwt", &register_body())
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(code, "INVALID_TOKEN");
}

// ============================================================================
// Registration Tests
// ============================================================================

#[tokio::test]
async fn test_register_happy_path() {
    let server = TestServer::start().await.unwrap();
    let (user_id, email) = unique_user();
    let token = server.token(user_id, &email);

    let registration = register_as(&server, &token, &register_body()).await;

    assert_eq!(registration.user_id, user_id.to_string());
    assert_eq!(registration.event_id, EVENT_ID.to_string());
    assert_eq!(registration.ticket_id, GENERAL_TICKET_ID.to_string());
    assert_eq!(registration.email, email);
    assert_eq!(registration.status, "confirmed");
    assert!(!registration.invitation_redeemed);
    assert!(registration.referred_by.is_none());

    let counts = availability(&server, GENERAL_TICKET_ID).await;
    assert_eq!(counts.capacity, GENERAL_CAPACITY);
    assert_eq!(counts.sold, 1);
    assert_eq!(counts.remaining, GENERAL_CAPACITY - 1);
    assert!(counts.on_sale);
}

#[tokio::test]
async fn test_register_rejects_malformed_input() {
    let server = TestServer::start().await.unwrap();
    let (user_id, email) = unique_user();
    let token = server.token(user_id, &email);

    let response = server
        .post_auth("/api/v1/events/not-an-id/registrations", &token, &register_body())
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(code, "INVALID_PATH_PARAMETER");

    let body = json!({ "ticket_id": GENERAL_TICKET_ID.to_string(), "referral_code": "" });
    let response = server.post_auth(&registrations_path(), &token, &body).await.unwrap();
    let code = assert_error(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(code, "VALIDATION_ERROR");

    assert_eq!(availability(&server, GENERAL_TICKET_ID).await.sold, 0);
}

#[tokio::test]
async fn test_register_ignores_body_email() {
    let server = TestServer::start().await.unwrap();
    let (user_id, email) = unique_user();
    let token = server.token(user_id, &email);

    let mut statuses = Vec::new();
    for i in 0..3 {
        let body = json!({
            "ticket_id": GENERAL_TICKET_ID.to_string(),
            "email": format!("alias{i}-{}@example.com", unique_suffix()),
        });
        let response = server.post_auth(&registrations_path(), &token, &body).await.unwrap();
        statuses.push(response.status());
        if response.status() == StatusCode::CREATED {
            let registration: RegistrationBody = response.json().await.unwrap();
            assert_eq!(registration.email, email);
        } else {
            let code = assert_error(response, StatusCode::CONFLICT).await.unwrap();
            assert_eq!(code, "DUPLICATE_REGISTRATION");
        }
    }

    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::CONFLICT, StatusCode::CONFLICT]);
    assert_eq!(availability(&server, GENERAL_TICKET_ID).await.sold, 1);
}

#[tokio::test]
async fn test_register_unknown_ticket() {
    let server = TestServer::start().await.unwrap();
    let (user_id, email) = unique_user();
    let token = server.token(user_id, &email);

    let body = json!({ "ticket_id": "999999" });
    let response = server.post_auth(&registrations_path(), &token, &body).await.unwrap();
    let code = assert_error(response, StatusCode::NOT_FOUND).await.unwrap();
    assert_eq!(code, "UNKNOWN_TICKET");
}

#[tokio::test]
async fn test_register_sold_out() {
    let store = MemoryStore::shared();
    seed_catalog(&store, 1);
    let server = TestServer::start_with_store(store).await.unwrap();

    let (first, first_email) = unique_user();
    register_as(&server, &server.token(first, &first_email), &register_body()).await;

    let (second, second_email) = unique_user();
    let response = server
        .post_auth(&registrations_path(), &server.token(second, &second_email), &register_body())
        .await
        .unwrap();
    let body: ErrorEnvelope = assert_json(response, StatusCode::CONFLICT).await.unwrap();
    assert_eq!(body.error.code, "SOLD_OUT");
    assert!(body.error.details.is_none());

    let counts = availability(&server, GENERAL_TICKET_ID).await;
    assert_eq!(counts.sold, 1);
    assert_eq!(counts.remaining, 0);
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let server = TestServer::start().await.unwrap();
    let (user_id, email) = unique_user();
    let token = server.token(user_id, &email);

    register_as(&server, &token, &register_body()).await;

    let response = server.post_auth(&registrations_path(), &token, &register_body()).await.unwrap();
    let code = assert_error(response, StatusCode::CONFLICT).await.unwrap();
    assert_eq!(code, "DUPLICATE_REGISTRATION");

    assert_eq!(availability(&server, GENERAL_TICKET_ID).await.sold, 1);
}

#[tokio::test]
async fn test_concurrent_registrations_do_not_oversell() {
    let store = MemoryStore::shared();
    seed_catalog(&store, 5);
    let server = TestServer::start_with_store(store).await.unwrap();

    let tokens: Vec<String> = (0..20)
        .map(|_| {
            let (user_id, email) = unique_user();
            server.token(user_id, &email)
        })
        .collect();

    let body = register_body();
    let path = registrations_path();
    let responses = join_all(tokens.iter().map(|token| server.post_auth(&path, token, &body))).await;

    let statuses: Vec<StatusCode> = responses.into_iter().map(|r| r.unwrap().status()).collect();
    let created = statuses.iter().filter(|s| **s == StatusCode::CREATED).count();
    let refused = statuses.iter().filter(|s| **s == StatusCode::CONFLICT).count();
    assert_eq!(created, 5);
    assert_eq!(refused, 15);

    let counts = availability(&server, GENERAL_TICKET_ID).await;
    assert_eq!(counts.sold, 5);
    assert_eq!(counts.remaining, 0);
}

// ============================================================================
// Invitation Code Tests
// ============================================================================

#[tokio::test]
async fn test_invite_only_ticket() {
    let server = TestServer::start().await.unwrap();
    let vip = |code: Option<&str>| json!({ "ticket_id": VIP_TICKET_ID.to_string(), "invitation_code": code });

    let (user_id, email) = unique_user();
    let token = server.token(user_id, &email);
    let response = server.post_auth(&registrations_path(), &token, &vip(None)).await.unwrap();
    let code = assert_error(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(code, "INVITATION_REQUIRED");

    let response = server
        .post_auth(&registrations_path(), &token, &vip(Some("NO-SUCH-CODE")))
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(code, "INVALID_CODE");

    for _ in 0..VIP_CODE_USES {
        let (user_id, email) = unique_user();
        let registration = register_as(&server, &server.token(user_id, &email), &vip(Some(VIP_CODE))).await;
        assert!(registration.invitation_redeemed);
    }

    let (user_id, email) = unique_user();
    let response = server
        .post_auth(&registrations_path(), &server.token(user_id, &email), &vip(Some(VIP_CODE)))
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::CONFLICT).await.unwrap();
    assert_eq!(code, "USAGE_LIMIT_EXCEEDED");

    // The refused attempt returned its seat
    assert_eq!(availability(&server, VIP_TICKET_ID).await.sold, VIP_CODE_USES);
}

// ============================================================================
// Access Control Tests
// ============================================================================

#[tokio::test]
async fn test_get_registration_owner_or_staff() {
    let server = TestServer::start().await.unwrap();
    let (owner, owner_email) = unique_user();
    let owner_token = server.token(owner, &owner_email);
    let registration = register_as(&server, &owner_token, &register_body()).await;
    let path = format!("/api/v1/registrations/{}", registration.id);

    let fetched: RegistrationBody =
        assert_json(server.get_auth(&path, &owner_token).await.unwrap(), StatusCode::OK)
            .await
            .unwrap();
    assert_eq!(fetched.id, registration.id);

    let (stranger, stranger_email) = unique_user();
    let response = server.get_auth(&path, &server.token(stranger, &stranger_email)).await.unwrap();
    let code = assert_error(response, StatusCode::FORBIDDEN).await.unwrap();
    assert_eq!(code, "INSUFFICIENT_PERMISSIONS");

    let response = server.get_auth(&path, &server.admin_token(1)).await.unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();

    let response = server
        .get_auth("/api/v1/registrations/424242", &owner_token)
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::NOT_FOUND).await.unwrap();
    assert_eq!(code, "UNKNOWN_REGISTRATION");
}

// ============================================================================
// Referral Tests
// ============================================================================

#[tokio::test]
async fn test_referral_flow_and_cycle_rejection() {
    let server = TestServer::start().await.unwrap();

    let (alice, alice_email) = unique_user();
    let alice_token = server.token(alice, &alice_email);
    let alice_registration = register_as(&server, &alice_token, &register_body()).await;

    let referral_path = format!("/api/v1/registrations/{}/referral", alice_registration.id);
    let alice_referral: ReferralBody =
        assert_json(server.get_auth(&referral_path, &alice_token).await.unwrap(), StatusCode::OK)
            .await
            .unwrap();
    assert_eq!(alice_referral.registration_id, alice_registration.id);
    assert!(alice_referral.is_active);

    // Bob is referred by Alice
    let (bob, bob_email) = unique_user();
    let bob_token = server.token(bob, &bob_email);
    let body = json!({
        "ticket_id": GENERAL_TICKET_ID.to_string(),
        "referral_code": alice_referral.code,
    });
    let bob_registration = register_as(&server, &bob_token, &body).await;
    assert_eq!(bob_registration.referred_by.as_deref(), Some(alice_referral.code.as_str()));

    let bob_referral: ReferralBody = assert_json(
        server
            .get_auth(&format!("/api/v1/registrations/{}/referral", bob_registration.id), &bob_token)
            .await
            .unwrap(),
        StatusCode::OK,
    )
    .await
    .unwrap();

    // Alice redeeming Bob's code would close a loop
    let usage_path = format!("/api/v1/registrations/{}/referral-usage", alice_registration.id);
    let response = server
        .post_auth(&usage_path, &alice_token, &json!({ "code": bob_referral.code }))
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::CONFLICT).await.unwrap();
    assert_eq!(code, "CYCLIC_REFERRAL");

    // Bob already has a referrer
    let usage_path = format!("/api/v1/registrations/{}/referral-usage", bob_registration.id);
    let response = server
        .post_auth(&usage_path, &bob_token, &json!({ "code": alice_referral.code }))
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::CONFLICT).await.unwrap();
    assert_eq!(code, "ALREADY_REFERRED");
}

#[tokio::test]
async fn test_referral_usage_after_admission() {
    let server = TestServer::start().await.unwrap();

    let (alice, alice_email) = unique_user();
    let alice_token = server.token(alice, &alice_email);
    let alice_registration = register_as(&server, &alice_token, &register_body()).await;
    let alice_referral: ReferralBody = assert_json(
        server
            .get_auth(&format!("/api/v1/registrations/{}/referral", alice_registration.id), &alice_token)
            .await
            .unwrap(),
        StatusCode::OK,
    )
    .await
    .unwrap();

    let (carol, carol_email) = unique_user();
    let carol_token = server.token(carol, &carol_email);
    let carol_registration = register_as(&server, &carol_token, &register_body()).await;

    let usage_path = format!("/api/v1/registrations/{}/referral-usage", carol_registration.id);
    let usage: ReferralUsageBody = assert_json(
        server
            .post_auth(&usage_path, &carol_token, &json!({ "code": alice_referral.code }))
            .await
            .unwrap(),
        StatusCode::CREATED,
    )
    .await
    .unwrap();
    assert_eq!(usage.registration_id, carol_registration.id);
    assert_eq!(usage.referrer_registration_id, alice_registration.id);

    let carol_after: RegistrationBody = assert_json(
        server
            .get_auth(&format!("/api/v1/registrations/{}", carol_registration.id), &carol_token)
            .await
            .unwrap(),
        StatusCode::OK,
    )
    .await
    .unwrap();
    assert_eq!(carol_after.referred_by.as_deref(), Some(alice_referral.code.as_str()));

    // Alice cannot redeem her own code
    let usage_path = format!("/api/v1/registrations/{}/referral-usage", alice_registration.id);
    let response = server
        .post_auth(&usage_path, &alice_token, &json!({ "code": alice_referral.code }))
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(code, "SELF_REFERRAL");
}

// ============================================================================
// Staff Operation Tests
// ============================================================================

#[tokio::test]
async fn test_cancel_requires_staff_and_returns_seat() {
    let server = TestServer::start().await.unwrap();
    let (user_id, email) = unique_user();
    let token = server.token(user_id, &email);
    let registration = register_as(&server, &token, &register_body()).await;
    let cancel_path = format!("/api/v1/registrations/{}/cancel", registration.id);

    let response = server.post_auth_empty(&cancel_path, &token).await.unwrap();
    let code = assert_error(response, StatusCode::FORBIDDEN).await.unwrap();
    assert_eq!(code, "INSUFFICIENT_PERMISSIONS");

    let admin = server.admin_token(1);
    let cancelled: RegistrationBody = assert_json(
        server
            .post_auth(&cancel_path, &admin, &json!({ "reason": "requested by attendee" }))
            .await
            .unwrap(),
        StatusCode::OK,
    )
    .await
    .unwrap();
    assert_eq!(cancelled.status, "cancelled");
    assert_eq!(availability(&server, GENERAL_TICKET_ID).await.sold, 0);

    // Repeating the cancellation changes nothing
    let response = server.post_auth_empty(&cancel_path, &admin).await.unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();
    assert_eq!(availability(&server, GENERAL_TICKET_ID).await.sold, 0);
}

#[tokio::test]
async fn test_checked_in_registration_cannot_be_cancelled() {
    let server = TestServer::start().await.unwrap();
    let (user_id, email) = unique_user();
    let registration = register_as(&server, &server.token(user_id, &email), &register_body()).await;
    let admin = server.admin_token(1);

    let checked_in: RegistrationBody = assert_json(
        server
            .post_auth_empty(&format!("/api/v1/registrations/{}/check-in", registration.id), &admin)
            .await
            .unwrap(),
        StatusCode::OK,
    )
    .await
    .unwrap();
    assert_eq!(checked_in.status, "checked_in");

    let response = server
        .post_auth_empty(&format!("/api/v1/registrations/{}/cancel", registration.id), &admin)
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::CONFLICT).await.unwrap();
    assert_eq!(code, "INVALID_STATUS_TRANSITION");
    assert_eq!(availability(&server, GENERAL_TICKET_ID).await.sold, 1);
}

// ============================================================================
// Ticket Tests
// ============================================================================

#[tokio::test]
async fn test_availability_unknown_ticket() {
    let server = TestServer::start().await.unwrap();

    let response = server.get(&availability_path(424_242)).await.unwrap();
    let code = assert_error(response, StatusCode::NOT_FOUND).await.unwrap();
    assert_eq!(code, "UNKNOWN_TICKET");
}
