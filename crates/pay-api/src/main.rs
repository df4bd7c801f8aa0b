//! # Lightning-Checkout
//!
//! Redirect relay plus a startup check of the configured methods.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export STRIPE_PUBLISHABLE_KEY=pk_test_...
//! export COMMERCE_API_URL=http://localhost:3000/api
//!
//! # Run the server
//! lightning-checkout
//! ```

use anyhow::Context;
use pay_api::{routes, AppConfig, AppState, HttpCommerceClient};
use pay_checkout::{load_config, CheckoutContext, CheckoutSession};
use pay_core::{FileStateStore, SelectionStore};
use pay_stripe::StripeSourcesClient;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    // Print banner
    print_banner();

    let config = AppConfig::from_env();
    let checkout_config = load_config().context("loading config/checkout.toml")?;

    let commerce = Arc::new(
        HttpCommerceClient::new(&config.commerce_api_url)
            .context("creating commerce client")?,
    );
    let tokenizer = Arc::new(
        StripeSourcesClient::from_env().context("initializing Stripe")?,
    );

    let mut builder = CheckoutContext::builder(checkout_config, commerce, tokenizer);
    if let Some(ref path) = config.state_file {
        info!("Persisting selection state to {}", path);
        builder = builder.with_selection(SelectionStore::new(Arc::new(FileStateStore::new(path))));
    }
    let ctx = Arc::new(builder.build());

    info!("Environment: {}", config.environment);
    info!("Payment methods configured: {}", ctx.config.methods.len());

    // Which methods would this cart offer right now
    let session = CheckoutSession::new(Arc::clone(&ctx));
    match session.load().await {
        Ok(report) => {
            info!("Enabled methods: {:?}", report.enabled);
            if !report.hidden.is_empty() {
                info!("Hidden methods: {:?}", report.hidden);
            }
            for (method, reason) in &report.failed {
                warn!("Method {} failed to initialize: {}", method, reason);
            }
        }
        Err(e) => warn!("Startup method check skipped: {}", e),
    }

    let addr = config.socket_addr()?;
    let is_prod = config.is_production();

    // Create router
    let state = AppState::new(config, ctx.redirects.hub().clone());
    let app = routes::create_router(state);

    // Start server
    info!("⚡ Lightning-Checkout starting on http://{}", addr);

    if !is_prod {
        info!("📝 Health: http://{}/health", addr);
        info!("↩️  Redirect return: GET http://{}/redirect/return", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// fmt layer by default, json when `LOG_FORMAT=json`
fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let json = std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

fn print_banner() {
    println!(
        r#"
  ⚡ Lightning-Checkout RS ⚡
  ━━━━━━━━━━━━━━━━━━━━━━━━━━
  Payment method orchestrator
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
