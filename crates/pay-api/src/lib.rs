//! # pay-api
//!
//! HTTP adapters for lightning-checkout.
//!
//! This crate provides:
//! - `HttpCommerceClient`, the `CommerceApi` over the storefront cart API
//! - An Axum redirect relay that forwards redirect returns and overlay
//!   buttons to the checkout waiting on a source
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/redirect/return` | Return URL of redirect flows |
//! | POST | `/redirect/message` | Cross-window message |
//! | POST | `/redirect/{source_id}/close` | Close the redirect overlay |
//! | POST | `/redirect/{source_id}/back-to-cart` | Leave the redirect for the cart |

pub mod commerce;
pub mod handlers;
pub mod routes;
pub mod state;

pub use commerce::HttpCommerceClient;
pub use routes::create_router;
pub use state::{AppConfig, AppState};
