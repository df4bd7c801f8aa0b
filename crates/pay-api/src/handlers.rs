//! # Request Handlers
//!
//! Axum request handlers for the redirect relay.
//!
//! A bank or wallet page finishing a redirect lands on `/redirect/return`
//! (Stripe appends `source` and `client_secret` to the return URL). The relay
//! turns that hit into a [`RedirectMessage`] for the checkout waiting on the
//! source; the overlay's buttons post close and back-to-cart signals the
//! same way.

use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    Json,
};
use pay_checkout::{RedirectMessage, RedirectSignal};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, instrument, warn};

// =============================================================================
// Response Types
// =============================================================================

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Acknowledgment of a relayed signal
#[derive(Debug, Serialize)]
pub struct RelayResponse {
    pub source_id: String,
    pub delivered: bool,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn no_session(source_id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(
            ErrorResponse::new("No checkout is waiting on this source", 404)
                .with_details(source_id.to_string()),
        ),
    )
}

fn relay(state: &AppState, source_id: &str, signal: RedirectSignal) -> Result<impl IntoResponse, ApiError> {
    if !state.hub.deliver(source_id, signal) {
        warn!("No redirect session for source {}", source_id);
        return Err(no_session(source_id));
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(RelayResponse {
            source_id: source_id.to_string(),
            delivered: true,
        }),
    ))
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "lightning-checkout",
        "version": env!("CARGO_PKG_VERSION"),
        "redirect_sessions": state.hub.active_sessions(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Return URL of a redirect flow
#[instrument(skip(state, params))]
pub async fn redirect_return(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let Some(source_id) = params.get("source").cloned() else {
        return (
            StatusCode::BAD_REQUEST,
            Html(return_page("Missing source", "This page was opened without a payment source.")),
        );
    };

    let message = RedirectMessage {
        source_id: Some(source_id.clone()),
        url_params: params,
    };

    if state.hub.post_message(message) {
        info!("Relayed redirect return for source {}", source_id);
        (
            StatusCode::OK,
            Html(return_page(
                "Payment authorized",
                "You can close this window and return to checkout.",
            )),
        )
    } else {
        warn!("Redirect return for source {} found no waiting checkout", source_id);
        (
            StatusCode::NOT_FOUND,
            Html(return_page(
                "Checkout expired",
                "This checkout is no longer waiting. Please return to your cart.",
            )),
        )
    }
}

/// Cross-window message posted by the redirect target
#[instrument(skip(state, message))]
pub async fn redirect_message(
    State(state): State<AppState>,
    Json(message): Json<RedirectMessage>,
) -> Result<impl IntoResponse, ApiError> {
    let source_id = message.source_id.clone().ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("sourceId is required", 400)),
        )
    })?;

    relay(&state, &source_id, RedirectSignal::Message(message))
}

/// The overlay's close button
#[instrument(skip(state))]
pub async fn redirect_close(
    State(state): State<AppState>,
    Path(source_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    relay(&state, &source_id, RedirectSignal::CloseRequested)
}

/// The overlay's "back to cart" link
#[instrument(skip(state))]
pub async fn redirect_back_to_cart(
    State(state): State<AppState>,
    Path(source_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    relay(&state, &source_id, RedirectSignal::BackToCart)
}

fn return_page(title: &str, message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>{title}</title></head>
<body style="font-family: system-ui; display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0;">
    <div style="padding: 60px; text-align: center;">
        <h1>{title}</h1>
        <p style="color: #666;">{message}</p>
    </div>
</body>
</html>
"#
    )
}
