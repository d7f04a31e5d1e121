mod common;

use axum::Json;
use axum::Router;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use common::{TestApp, customer, storage_with_session};
use lapak::identity::{HttpIdentityConfig, HttpIdentityService, IdentityError, IdentityService};
use lapak::restore::{RestoreOutcome, bootstrap};
use serde_json::json;
use url::Url;

const GOOD_TOKEN: &str = "good-token";
const API_KEY: &str = "anon-key";

async fn who_am_i(headers: HeaderMap) -> Response {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let api_key = headers.get("apikey").and_then(|v| v.to_str().ok());

    if api_key != Some(API_KEY) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "No API key found in request" })),
        )
            .into_response();
    }

    match bearer {
        Some(value) if value == format!("Bearer {GOOD_TOKEN}") => Json(json!({
            "id": "u-100",
            "aud": "authenticated",
            "role": "authenticated",
            "email": "rina@example.com",
            "phone": "",
            "created_at": "2024-03-01T08:00:00Z",
            "app_metadata": { "provider": "email" },
            "user_metadata": {
                "role": "seller",
                "full_name": "Rina Wulandari",
                "phone": "0812-3456",
                "address": "Jl. Braga 10, Bandung"
            }
        }))
        .into_response(),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "code": 401, "msg": "invalid JWT" })),
        )
            .into_response(),
    }
}

/// Spawn `router` on a random local port and return its base URL.
async fn spawn(router: Router) -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    Url::parse(&format!("http://{addr}")).expect("Invalid URL")
}

async fn identity_server() -> Url {
    spawn(Router::new().route("/auth/v1/user", get(who_am_i))).await
}

fn service(base_url: Url, api_key: Option<&str>) -> HttpIdentityService {
    let mut config = HttpIdentityConfig::new(base_url);
    config.api_key = api_key.map(str::to_string);
    HttpIdentityService::new(config).expect("Failed to build identity client")
}

#[tokio::test]
async fn test_valid_token_maps_profile() {
    let identity = service(identity_server().await, Some(API_KEY));

    let user = identity.current_user(GOOD_TOKEN).await.unwrap();

    assert_eq!(user.id, "u-100");
    assert_eq!(user.email, "rina@example.com");
    assert_eq!(user.role, "seller");
    assert_eq!(user.created_at, "2024-03-01T08:00:00Z");
    assert_eq!(user.full_name.as_deref(), Some("Rina Wulandari"));
    assert_eq!(user.phone.as_deref(), Some("0812-3456"));
    assert_eq!(user.address.as_deref(), Some("Jl. Braga 10, Bandung"));
    assert_eq!(user.avatar_url, None);
}

#[tokio::test]
async fn test_bad_token_is_unauthorized() {
    let identity = service(identity_server().await, Some(API_KEY));

    let err = identity.current_user("expired").await.unwrap_err();

    assert!(matches!(err, IdentityError::Unauthorized), "got {err}");
}

#[tokio::test]
async fn test_missing_api_key_is_unauthorized() {
    let identity = service(identity_server().await, None);

    let err = identity.current_user(GOOD_TOKEN).await.unwrap_err();

    assert!(matches!(err, IdentityError::Unauthorized), "got {err}");
}

#[tokio::test]
async fn test_server_error_is_transport_failure() {
    let base = spawn(Router::new().route(
        "/auth/v1/user",
        get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    ))
    .await;
    let identity = service(base, Some(API_KEY));

    let err = identity.current_user(GOOD_TOKEN).await.unwrap_err();

    assert!(matches!(err, IdentityError::Transport(_)), "got {err}");
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let base = spawn(Router::new().route(
        "/auth/v1/user",
        get(|| async { Json(json!({ "email": "no-id@example.com" })) }),
    ))
    .await;
    let identity = service(base, Some(API_KEY));

    let err = identity.current_user(GOOD_TOKEN).await.unwrap_err();

    assert!(matches!(err, IdentityError::InvalidResponse(_)), "got {err}");
}

#[tokio::test]
async fn test_unreachable_service_is_transport_failure() {
    // Bind then drop so nothing listens on the port.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local address");
    drop(listener);
    let identity = service(
        Url::parse(&format!("http://{addr}")).unwrap(),
        Some(API_KEY),
    );

    let err = identity.current_user(GOOD_TOKEN).await.unwrap_err();

    assert!(matches!(err, IdentityError::Transport(_)), "got {err}");
}

#[tokio::test]
async fn test_bootstrap_against_identity_server() {
    let base = identity_server().await;

    let valid = TestApp::start(storage_with_session(&customer(), GOOD_TOKEN), "/orders");
    let outcome = bootstrap(&valid.ctx.store, &service(base.clone(), Some(API_KEY))).await;
    assert_eq!(
        outcome,
        RestoreOutcome::Restored {
            user_id: "u-100".to_string()
        }
    );
    let user = valid.ctx.store.session().user.unwrap();
    assert_eq!(user.role, "seller");
    assert_eq!(user.full_name.as_deref(), Some("Rina Wulandari"));

    let expired = TestApp::start(storage_with_session(&customer(), "expired"), "/orders");
    let outcome = bootstrap(&expired.ctx.store, &service(base, Some(API_KEY))).await;
    assert_eq!(outcome, RestoreOutcome::Invalidated);
    assert!(!expired.ctx.store.is_authenticated());
}
