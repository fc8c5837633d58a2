//! An [`axum`] front door for provisioning data-sharing recipients
//!
//! The [`router()`] exposes two routes:
//!
//! * `GET /` and `GET /health` answer `{"status":"healthy"}`.
//! * `POST /verify-token` accepts `{"token": "<compact token>"}`, provisions
//!   the recipient for the identity in the token, and answers with the
//!   activation link of the recipient's current token.
//!
//! Failures are reported as `{"error": "<message>"}`; see [`VerifyFailed`]
//! for how each failure maps onto a status code.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use sharekey::{Provisioner, ProvisioningConfig, RecipientCatalog};
//!
//! async fn serve<C: RecipientCatalog + 'static>(catalog: C) -> std::io::Result<()> {
//!     let config = ProvisioningConfig::new(aliri::jwt::Issuer::from_static(
//!         "https://cognito-idp.us-east-1.amazonaws.com/us-east-1_example",
//!     ));
//!     let app = sharekey_axum::router(Arc::new(Provisioner::new(catalog, config)));
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//!     axum::serve(listener, app).await
//! }
//! ```

#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

use std::sync::Arc;

use aliri::Jwt;
use aliri_clock::Clock;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sharekey::{Provisioner, ProvisioningOutcome, RecipientCatalog};
use tower_http::trace::TraceLayer;

mod error;

pub use error::{ErrorBody, VerifyFailed};

/// The body of a verification request
#[derive(Debug, Deserialize)]
pub struct VerifyTokenRequest {
    /// The caller's identity token
    pub token: Jwt,
}

/// The body of a successful verification response
#[derive(Debug, Serialize)]
pub struct Provisioned {
    /// A description of what was done for the caller
    pub message: String,

    /// The activation link of the caller's current token
    pub activation_link: String,
}

/// The body of a health check response
#[derive(Debug, Serialize)]
pub struct Health {
    /// Always `healthy`
    pub status: &'static str,
}

/// Builds the service's routes around `provisioner`
///
/// Only `/verify-token` is traced; health checks are too chatty.
pub fn router<C, K>(provisioner: Arc<Provisioner<C, K>>) -> Router
where
    C: RecipientCatalog + 'static,
    K: Clock + Send + Sync + 'static,
{
    let health_routes = Router::new()
        .route("/", get(health))
        .route("/health", get(health));

    let verify_routes = Router::new()
        .route("/verify-token", post(verify_token::<C, K>))
        .layer(TraceLayer::new_for_http())
        .with_state(provisioner);

    verify_routes.merge(health_routes)
}

async fn health() -> Json<Health> {
    Json(Health { status: "healthy" })
}

async fn verify_token<C, K>(
    State(provisioner): State<Arc<Provisioner<C, K>>>,
    body: Result<Json<VerifyTokenRequest>, JsonRejection>,
) -> Result<Json<Provisioned>, VerifyFailed>
where
    C: RecipientCatalog,
    K: Clock + Send + Sync,
{
    let Json(request) = body?;
    let identity = provisioner.verify_identity(&request.token)?;
    let outcome = provisioner.provision(&identity).await?;

    tracing::info!(
        recipient = %outcome.recipient(),
        changed = outcome.is_mutation(),
        "recipient provisioned"
    );

    let email = identity.email();
    let message = match &outcome {
        ProvisioningOutcome::Created { .. } => format!("New recipient created for {email}"),
        ProvisioningOutcome::Rotated { .. } => format!("Token for {email} rotated"),
        ProvisioningOutcome::StillValid { .. } => format!("Token for {email} is still valid"),
    };

    Ok(Json(Provisioned {
        message,
        activation_link: outcome.activation_link().to_owned(),
    }))
}
