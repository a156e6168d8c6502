// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse},
    routing::post,
    Json, Router,
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header};
use order_desk::config::{Config, VendorSettings};
use order_desk::db::FirestoreDb;
use order_desk::middleware::auth::create_jwt;
use order_desk::models::{Permission, Role};
use order_desk::routes::create_router;
use order_desk::services::{GoogleOidcVerifier, KmsService, RoleCache, TasksService};
use order_desk::vendors::{VendorGateway, VendorKind};
use order_desk::AppState;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Key ID the static test verifier trusts.
#[allow(dead_code)]
pub const TEST_OIDC_KID: &str = "order-desk-test-key";

/// Roles seeded into the role cache of every test app.
#[allow(dead_code)]
pub const ADMIN_ROLE: &str = "admin";
#[allow(dead_code)]
pub const CLERK_ROLE: &str = "clerk";
#[allow(dead_code)]
pub const VIEWER_ROLE: &str = "viewer";
#[allow(dead_code)]
pub const NO_RIGHTS_ROLE: &str = "no_rights";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

fn role(id: &str, permissions: &[Permission]) -> Role {
    Role {
        id: id.to_string(),
        name: id.to_string(),
        description: String::new(),
        permissions: permissions.to_vec(),
        built_in: false,
        created_at: "2026-01-01T00:00:00.000000000Z".to_string(),
        updated_at: "2026-01-01T00:00:00.000000000Z".to_string(),
    }
}

/// Role cache pre-filled so permission checks never reach the database.
/// TTL is long enough to outlive any test.
fn seeded_role_cache() -> RoleCache {
    let cache = RoleCache::new(std::time::Duration::from_secs(3600));
    cache.insert(Role::admin("2026-01-01T00:00:00.000000000Z"));
    cache.insert(role(
        CLERK_ROLE,
        &[Permission::SubmitOrders, Permission::ViewOrders],
    ));
    cache.insert(role(VIEWER_ROLE, &[Permission::ViewOrders]));
    cache.insert(role(NO_RIGHTS_ROLE, &[]));
    cache
}

fn static_oidc_verifier(config: &Config) -> GoogleOidcVerifier {
    let decoding_key =
        DecodingKey::from_rsa_pem(include_bytes!("../fixtures/tasks_oidc_test_key.pub.pem"))
            .expect("valid test public key");
    GoogleOidcVerifier::new_with_static_key(config, TEST_OIDC_KID, decoding_key)
        .expect("static verifier")
}

/// Build an app state around the given config with offline dependencies.
#[allow(dead_code)]
pub fn test_state(config: Config) -> Arc<AppState> {
    state_with_db(config, test_db_offline())
}

/// App state backed by the Firestore emulator. Cloud Tasks and KMS stay offline.
#[allow(dead_code)]
pub async fn emulator_state(config: Config) -> Arc<AppState> {
    state_with_db(config, test_db().await)
}

fn state_with_db(config: Config, db: FirestoreDb) -> Arc<AppState> {
    let tasks_service = TasksService::new_mock(&config.gcp_project_id, &config.gcp_region);
    let google_oidc_verifier = Arc::new(static_oidc_verifier(&config));
    let vendor_gateway = VendorGateway::new(&config);

    Arc::new(AppState {
        config,
        db,
        kms: KmsService::new_mock(),
        tasks_service,
        google_oidc_verifier,
        vendor_gateway,
        role_cache: seeded_role_cache(),
    })
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub async fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let state = test_state(Config::test_default());
    (create_router(state.clone()), state)
}

/// Same as `create_test_app` with a different frontend URL (cookie tests).
#[allow(dead_code)]
pub async fn create_test_app_with_frontend_url(url: &str) -> (axum::Router, Arc<AppState>) {
    let mut config = Config::test_default();
    config.frontend_url = url.to_string();
    let state = test_state(config);
    (create_router(state.clone()), state)
}

/// Session JWT for a user holding `role_id`.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, role_id: &str) -> String {
    create_jwt(user_id, role_id, &Config::test_default().jwt_signing_key).expect("test JWT")
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Sign arbitrary claims as a Cloud Tasks OIDC token with the test key.
#[allow(dead_code)]
pub fn sign_tasks_oidc_claims(claims: &serde_json::Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(TEST_OIDC_KID.to_string());
    let key = EncodingKey::from_rsa_pem(include_bytes!("../fixtures/tasks_oidc_test_key.pem"))
        .expect("valid test private key");
    jsonwebtoken::encode(&header, claims, &key).expect("sign test OIDC token")
}

/// Valid Cloud Tasks OIDC claims for this config.
#[allow(dead_code)]
pub fn tasks_oidc_claims(config: &Config) -> serde_json::Value {
    let now = now_secs();
    json!({
        "iss": "https://accounts.google.com",
        "aud": config.api_url,
        "sub": "1234567890",
        "email": format!("order-desk-api@{}.iam.gserviceaccount.com", config.gcp_project_id),
        "email_verified": true,
        "iat": now,
        "exp": now + 300,
    })
}

/// A valid Cloud Tasks OIDC token for this config.
#[allow(dead_code)]
pub fn create_test_tasks_oidc_jwt(config: &Config) -> String {
    sign_tasks_oidc_claims(&tasks_oidc_claims(config))
}

// ─── Stub vendor ─────────────────────────────────────────────

/// Radius API key the stub vendor accepts.
#[allow(dead_code)]
pub const STUB_RADIUS_KEY: &str = "radius-key";

async fn stub_approve(headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
    if headers.get("x-api-key").and_then(|v| v.to_str().ok()) != Some(STUB_RADIUS_KEY) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"success": false, "message": "bad key"})),
        );
    }
    // Echo enough of the request to prove the payload shape.
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "orderId": format!("R-{}", body["externalOrderId"].as_str().unwrap_or("")),
        })),
    )
}

async fn stub_decline() -> Json<Value> {
    Json(json!({"success": false, "message": "Insufficient funds", "errorCode": "51"}))
}

async fn stub_unavailable() -> StatusCode {
    StatusCode::SERVICE_UNAVAILABLE
}

async fn stub_rate_limited() -> StatusCode {
    StatusCode::TOO_MANY_REQUESTS
}

async fn stub_html_page() -> Html<&'static str> {
    Html("<html><body>Maintenance</body></html>")
}

/// Start a local stand-in for the Radius API and return its base URL.
///
/// Each path prefix plays one upstream behavior: `/approve`, `/decline`,
/// `/unavailable`, `/limited` and `/html`.
#[allow(dead_code)]
pub async fn spawn_stub_vendor() -> String {
    let app = Router::new()
        .route("/approve/orders", post(stub_approve))
        .route("/decline/orders", post(stub_decline))
        .route("/unavailable/orders", post(stub_unavailable))
        .route("/limited/orders", post(stub_rate_limited))
        .route("/html/orders", post(stub_html_page));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Test config with Radius pointed at `base_url`.
#[allow(dead_code)]
pub fn config_with_radius(base_url: String, api_key: &str) -> Config {
    let mut config = Config::test_default();
    config.vendors.insert(
        VendorKind::Radius,
        VendorSettings {
            base_url,
            api_key: api_key.to_string(),
            api_secret: None,
        },
    );
    config
}
