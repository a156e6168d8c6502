// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Order Desk API Server
//!
//! Role-based admin backend that validates orders against per-vendor rules
//! and submits them to the upstream order-processing vendors.

use order_desk::{
    config::Config,
    db::FirestoreDb,
    services::{bootstrap, GoogleOidcVerifier, KmsService, RoleCache, TasksService},
    vendors::{VendorGateway, VendorKind},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Order Desk API");

    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    bootstrap::run(&db, &config)
        .await
        .expect("Failed to provision admin role");

    let tasks_service = TasksService::new(&config.gcp_project_id, &config.gcp_region);
    tracing::info!(
        project = %config.gcp_project_id,
        queue = %tasks_service.queue_path(),
        "Cloud Tasks service initialized"
    );

    let google_oidc_verifier =
        Arc::new(GoogleOidcVerifier::new(&config).expect("Failed to initialize OIDC verifier"));

    let kms = KmsService::new(
        &config.gcp_project_id,
        &config.gcp_region,
        KmsService::PAYMENT_KEY_NAME,
    )
    .await
    .expect("Failed to initialize KMS service");
    tracing::info!("KMS service initialized");

    let vendor_gateway = VendorGateway::new(&config);
    let unconfigured: Vec<&str> = VendorKind::ALL
        .iter()
        .filter(|kind| !vendor_gateway.is_configured(**kind))
        .map(|kind| kind.slug())
        .collect();
    if !unconfigured.is_empty() {
        tracing::warn!(
            vendors = ?unconfigured,
            "Vendors without credentials; their orders will end in error"
        );
    }

    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        kms,
        tasks_service,
        google_oidc_verifier,
        vendor_gateway,
        role_cache: RoleCache::default(),
    });

    let app = order_desk::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

const DEFAULT_LOG_FILTER: &str = "order_desk=debug,info";

/// JSON logs in the shape Cloud Logging parses; `RUST_LOG` overrides the default filter.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with(format)
        .init();
}
