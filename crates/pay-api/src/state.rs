//! # Application State
//!
//! Shared state for the Axum application: server configuration and the
//! redirect hub the relay posts into.

use pay_checkout::RedirectHub;
use pay_core::{PaymentError, PaymentResult};
use std::net::SocketAddr;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Base URL of the storefront cart API
    pub commerce_api_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
    /// JSON file persisting the shopper's selection across restarts
    pub state_file: Option<String>,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            commerce_api_url: std::env::var("COMMERCE_API_URL")
                .unwrap_or_else(|_| "http://localhost:3000/api".to_string()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            state_file: std::env::var("STATE_FILE").ok().filter(|p| !p.is_empty()),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> PaymentResult<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| {
                PaymentError::Configuration(format!(
                    "invalid bind address {}:{}: {}",
                    self.host, self.port, e
                ))
            })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Live redirect sessions
    pub hub: RedirectHub,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig, hub: RedirectHub) -> Self {
        Self { hub, config }
    }
}
