//! # Checkout Session
//!
//! Entry points the page calls: load, select, submit, resume, complete.
//! Every entry point runs guarded: a failure is logged, shown to the
//! shopper unless it is silent, and the loading indicator is released.
//! Nothing escapes to the page as an error.

use crate::context::CheckoutContext;
use crate::redirect::CancelReason;
use crate::registry::{InitReport, PaymentRegistry};
use crate::routing::{Navigation, RoutingEngine};
use crate::unit::SourceOutcome;
use crate::validator::SourceValidator;
use pay_core::{
    CheckoutConfig, CheckoutEvent, EventKind, PaymentError, PaymentResult, Rejection, Validation,
};
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

const CONFIG_PATHS: [&str; 3] = [
    "config/checkout.toml",
    "../config/checkout.toml",
    "../../config/checkout.toml",
];

/// Load the checkout configuration from the first `config/checkout.toml`
/// found walking up from the working directory
pub fn load_config() -> PaymentResult<CheckoutConfig> {
    for path in CONFIG_PATHS {
        if let Ok(content) = std::fs::read_to_string(path) {
            let config = CheckoutConfig::from_toml(&content).map_err(|e| {
                PaymentError::Configuration(format!("failed to parse {}: {}", path, e))
            })?;
            info!("Loaded {} payment methods from {}", config.methods.len(), path);
            return Ok(config);
        }
    }

    warn!("No checkout config found, no payment methods available");
    Ok(CheckoutConfig::new())
}

/// What a guarded entry point ended with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The page was handed on (URL or form submission)
    Navigated(Navigation),
    /// Stay on the page; the shopper can correct and retry
    Retry(Rejection),
    /// A redirect or wallet sheet was closed without completing
    Cancelled(CancelReason),
    /// Nothing persisted to resume
    Idle,
    /// Failed; the message is what the shopper was shown (if anything)
    Failed(String),
}

pub struct CheckoutSession {
    ctx: Arc<CheckoutContext>,
    registry: PaymentRegistry,
}

impl CheckoutSession {
    /// Session with one unit per configured method
    pub fn new(ctx: Arc<CheckoutContext>) -> Self {
        let registry = PaymentRegistry::from_config(Arc::clone(&ctx));
        Self { ctx, registry }
    }

    pub fn with_registry(ctx: Arc<CheckoutContext>, registry: PaymentRegistry) -> Self {
        Self { ctx, registry }
    }

    pub fn context(&self) -> &CheckoutContext {
        &self.ctx
    }

    pub fn registry(&self) -> &PaymentRegistry {
        &self.registry
    }

    /// Fetch the cart and bring up the payment methods
    #[instrument(skip(self))]
    pub async fn load(&self) -> PaymentResult<InitReport> {
        let cart = self.ctx.commerce.get_cart().await?;
        self.ctx.selection.save_cart_snapshot(&cart)?;
        Ok(self.registry.initialize(&cart).await)
    }

    /// Shopper picked a method
    pub async fn select(&self, method: &str) -> SubmitOutcome {
        self.run_guarded(method, async {
            self.registry.get_required(method)?.select()?;
            Ok(SubmitOutcome::Idle)
        })
        .await
    }

    /// Shopper pressed "pay" with a method
    #[instrument(skip(self))]
    pub async fn submit(&self, method: &str) -> SubmitOutcome {
        self.run_guarded(method, async {
            let unit = self.registry.get_required(method)?;
            unit.select()?;

            match unit.apply_source_id(false).await? {
                SourceOutcome::Ready {
                    source,
                    pending_funds,
                } => {
                    if pending_funds {
                        info!(source_id = %source.id, "Submitting with pending funds");
                    }
                    let navigation = RoutingEngine::new(&self.ctx)
                        .route(unit.config(), &source)
                        .await?;
                    Ok(SubmitOutcome::Navigated(navigation))
                }
                SourceOutcome::Rejected(reason) => Ok(SubmitOutcome::Retry(reason)),
                SourceOutcome::Cancelled(CancelReason::BackToCart) => {
                    let navigation = RoutingEngine::new(&self.ctx).back_to_cart().await?;
                    Ok(SubmitOutcome::Navigated(navigation))
                }
                SourceOutcome::Cancelled(reason) => Ok(SubmitOutcome::Cancelled(reason)),
            }
        })
        .await
    }

    /// Continue a flow interrupted by a reload, from the persisted source
    #[instrument(skip(self))]
    pub async fn resume(&self) -> SubmitOutcome {
        let record = match self.ctx.selection.payment() {
            Ok(Some(record)) if record.result.is_some() => record,
            Ok(_) => return SubmitOutcome::Idle,
            Err(e) => {
                warn!("Reading the persisted selection failed: {}", e);
                return SubmitOutcome::Idle;
            }
        };

        let name = record.name.clone();
        self.run_guarded(&name, async {
            let unit = self.registry.get_required(&record.name)?;
            let cart = self.ctx.commerce.get_cart().await?;

            match SourceValidator::new(&self.ctx)
                .validate_source(None, &cart)
                .await?
            {
                Validation::Accepted(source) => {
                    info!(source_id = %source.id, method = %record.name, "Resuming checkout");
                    let navigation = RoutingEngine::new(&self.ctx)
                        .route(unit.config(), &source)
                        .await?;
                    Ok(SubmitOutcome::Navigated(navigation))
                }
                Validation::Rejected(reason) => Ok(SubmitOutcome::Retry(reason)),
            }
        })
        .await
    }

    /// The flow reached its final page; forget the selection
    pub async fn complete(&self) -> PaymentResult<()> {
        self.ctx.selection.clear()?;
        self.registry.destroy_all().await;
        Ok(())
    }

    async fn run_guarded<F>(&self, method: &str, work: F) -> SubmitOutcome
    where
        F: Future<Output = PaymentResult<SubmitOutcome>>,
    {
        let presenter = &self.ctx.presenter;
        presenter.clear_error();
        presenter.set_loading(true);

        match work.await {
            Ok(SubmitOutcome::Navigated(Navigation::Redirected(url))) => {
                SubmitOutcome::Navigated(Navigation::Redirected(url))
            }
            Ok(outcome) => {
                presenter.set_loading(false);
                outcome
            }
            Err(e) => {
                error!(method, "Checkout step failed: {}", e);
                self.ctx.emit(
                    CheckoutEvent::new(method, "checkout", "error")
                        .kind(EventKind::Error)
                        .payment(method)
                        .response(serde_json::json!({ "error": e.to_string() })),
                );

                let message = if e.is_silent() {
                    String::new()
                } else {
                    let message = e.user_message();
                    presenter.show_error(message);
                    message.to_string()
                };
                presenter.set_loading(false);
                SubmitOutcome::Failed(message)
            }
        }
    }
}
