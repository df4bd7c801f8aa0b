//! # pay-stripe
//!
//! Stripe tokenizer for lightning-checkout.
//!
//! [`StripeSourcesClient`] implements `pay_core::Tokenizer` over the Sources
//! API: it creates sources with the publishable key and refreshes them with
//! their client secret while a redirect is pending.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pay_stripe::StripeSourcesClient;
//! use pay_checkout::CheckoutContext;
//! use std::sync::Arc;
//!
//! let tokenizer = Arc::new(StripeSourcesClient::from_env()?);
//! let ctx = CheckoutContext::builder(config, commerce, tokenizer).build();
//! ```
//!
//! Card errors come back as `PaymentError::Tokenization` with a `failed`
//! sub-state, which the checkout turns into an authorization failure.

pub mod config;
pub mod sources;

// Re-exports
pub use config::StripeConfig;
pub use sources::{source_form, StripeSourcesClient};
