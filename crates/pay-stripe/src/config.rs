//! # Stripe Configuration
//!
//! Configuration for the browser-side Sources API.
//! Only the publishable key is needed; it is loaded from the environment.

use pay_core::PaymentError;
use std::env;
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://api.stripe.com";
const DEFAULT_API_VERSION: &str = "2019-05-16";

/// Stripe API configuration
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Publishable key (pk_test_... or pk_live_...)
    pub publishable_key: String,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,

    /// API version pinned for source payloads
    pub api_version: String,

    /// Per-request timeout
    pub timeout: Duration,
}

impl StripeConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `STRIPE_PUBLISHABLE_KEY`
    ///
    /// Optional:
    /// - `STRIPE_API_BASE` (defaults to `https://api.stripe.com`)
    pub fn from_env() -> Result<Self, PaymentError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let publishable_key = env::var("STRIPE_PUBLISHABLE_KEY").map_err(|_| {
            PaymentError::Configuration("STRIPE_PUBLISHABLE_KEY not set".to_string())
        })?;

        let mut config = Self::new(publishable_key);
        config.validate()?;

        if let Ok(base) = env::var("STRIPE_API_BASE") {
            config.api_base_url = base;
        }

        Ok(config)
    }

    /// Create config with an explicit key (for testing)
    pub fn new(publishable_key: impl Into<String>) -> Self {
        Self {
            publishable_key: publishable_key.into(),
            api_base_url: DEFAULT_API_BASE.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Reject keys that are not publishable keys
    pub fn validate(&self) -> Result<(), PaymentError> {
        if self.publishable_key.starts_with("sk_") {
            return Err(PaymentError::Configuration(
                "a secret key must never be shipped to the checkout; use a publishable key"
                    .to_string(),
            ));
        }

        if !self.publishable_key.starts_with("pk_test_")
            && !self.publishable_key.starts_with("pk_live_")
        {
            return Err(PaymentError::Configuration(
                "STRIPE_PUBLISHABLE_KEY must start with pk_test_ or pk_live_".to_string(),
            ));
        }

        Ok(())
    }

    /// Check if using test keys
    pub fn is_test_mode(&self) -> bool {
        self.publishable_key.starts_with("pk_test_")
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.publishable_key)
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Builder: set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
