//! # Payment Error Types
//!
//! Typed error handling for the lightning-checkout orchestrator.
//! All fallible operations return `Result<T, PaymentError>`.
//!
//! Validation rejections are *not* errors: they travel as
//! [`Rejection`](crate::check::Rejection) values so callers can route the
//! shopper back to the capture UI without showing a message.

use crate::source::SourceState;
use thiserror::Error;

/// Message shown for any failure that is not an authorization failure
pub const GENERIC_ERROR_MESSAGE: &str =
    "Something went wrong while processing your payment. Please try again.";

/// Message shown when the payment provider refused the credential
pub const AUTHORIZATION_FAILED_MESSAGE: &str =
    "Your payment could not be authorized. Please use a different payment method.";

/// Core error type for all checkout operations
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No payment method unit registered under this name
    #[error("Unknown payment method: {name}")]
    UnknownMethod { name: String },

    /// Platform lacks what the method needs (no wallet API, widget missing).
    /// The method is deselected, never reported to the shopper.
    #[error("Payment method {method} is not supported here: {reason}")]
    Unsupported { method: String, reason: String },

    /// Shopper closed a payment sheet without approving it
    #[error("Payment sheet for {method} was dismissed")]
    Dismissed { method: String },

    /// The tokenization call returned an error object
    #[error("Source creation failed: {message}")]
    Tokenization {
        message: String,
        code: Option<String>,
        state: Option<SourceState>,
    },

    /// The provider refused the credential (tokenization sub-state "failed")
    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    /// The cart did not acknowledge the applied source
    #[error("Failed to apply source to cart")]
    ApplySourceFailed,

    /// Commerce/cart backend error
    #[error("Commerce API error: {0}")]
    Commerce(String),

    /// Payment provider API error
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Network/HTTP error communicating with a collaborator
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Redirect window/iframe could not be driven
    #[error("Redirect error: {0}")]
    Redirect(String),

    /// Persisted state could not be read or written
    #[error("State store error: {0}")]
    Store(String),

    /// Rate limited by provider
    #[error("Rate limited by {provider}, retry after {retry_after_secs} seconds")]
    RateLimited {
        provider: String,
        retry_after_secs: u64,
    },

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PaymentError {
    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentError::NetworkError(_)
                | PaymentError::RateLimited { .. }
                | PaymentError::ProviderError { .. }
        )
    }

    /// Errors that never reach the shopper
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            PaymentError::Unsupported { .. } | PaymentError::Dismissed { .. }
        )
    }

    /// Converts a tokenization error whose sub-state is `failed` into an
    /// authorization failure; every other error passes through untouched.
    pub fn into_authorization(self) -> Self {
        match self {
            PaymentError::Tokenization {
                message,
                state: Some(SourceState::Failed),
                ..
            } => PaymentError::AuthorizationFailed(message),
            other => other,
        }
    }

    /// Text handed to the error presenter
    pub fn user_message(&self) -> &'static str {
        match self {
            PaymentError::AuthorizationFailed(_) => AUTHORIZATION_FAILED_MESSAGE,
            _ => GENERIC_ERROR_MESSAGE,
        }
    }
}

impl From<serde_json::Error> for PaymentError {
    fn from(err: serde_json::Error) -> Self {
        PaymentError::Serialization(err.to_string())
    }
}

/// Result type alias for checkout operations
pub type PaymentResult<T> = Result<T, PaymentError>;
