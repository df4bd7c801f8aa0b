//! # Payment Method Units
//!
//! A [`PaymentMethodUnit`] owns one configured payment method: its display
//! state, capability probes, lifecycle and the creation of sources.
//!
//! The unit holds the shared flow; what differs per method lives behind
//! [`MethodBehavior`], a strategy with default no-op hooks:
//!
//! ```text
//! MethodBehavior
//!   ├── CardBehavior          per-field capture widgets
//!   ├── WalletBehavior        Apple Pay / Google Pay sheets
//!   ├── PayPalBehavior        redirect with return URL
//!   ├── RedirectBankBehavior  bank redirects with type fields
//!   ├── DropinBehavior        multi-method widget
//!   └── GenericBehavior       tokenizer only
//! ```
//!
//! Lifecycle: `Uninitialized → Shown | Hidden`, then `ElementsReady →
//! SourcePending → SourceReady | SourceFailed`, then `AppliedToCart`.
//! `destroy` returns to `Hidden` from anywhere.

mod card;
mod dropin;
mod generic;
mod paypal;
mod redirect_bank;
mod wallet;

pub use card::CardBehavior;
pub use dropin::DropinBehavior;
pub use generic::GenericBehavior;
pub use paypal::PayPalBehavior;
pub use redirect_bank::RedirectBankBehavior;
pub use wallet::WalletBehavior;

use crate::context::CheckoutContext;
use crate::redirect::{CancelReason, RedirectContext, RedirectHooks, RedirectOutcome};
use crate::routing::apply_and_confirm;
use crate::validator::SourceValidator;
use async_trait::async_trait;
use pay_core::{
    CartData, CheckoutEvent, EventKind, MethodCapability, MethodConfig, MethodKind,
    PaymentError, PaymentOption, PaymentRecord, PaymentResult, PaymentSource, Rejection,
    SourceRequest, SourceState, Validation,
};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};

/// Where a unit is in its lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnitPhase {
    #[default]
    Uninitialized,
    Shown,
    Hidden,
    ElementsReady,
    SourcePending,
    SourceReady,
    SourceFailed,
    AppliedToCart,
}

/// The three initialization phases, run across all units in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitPhase {
    Before,
    Init,
    After,
}

/// Result of asking a unit for a source
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome {
    /// Source may be submitted
    Ready {
        source: PaymentSource,
        /// Accepted while funds are still pending (e.g. bank debits)
        pending_funds: bool,
    },
    /// Stay on the page; the shopper fixes input or picks another method
    Rejected(Rejection),
    /// Redirect closed without completion; prompt again
    Cancelled(CancelReason),
}

impl SourceOutcome {
    pub fn source(&self) -> Option<&PaymentSource> {
        match self {
            SourceOutcome::Ready { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SourceOutcome::Ready { .. })
    }
}

/// Interaction events forwarded from the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitEvent {
    Focus(String),
    Blur(String),
    Change(String),
    Click,
    Cancel,
}

/// What a behavior sees of its unit
pub struct UnitContext<'a> {
    pub config: &'a MethodConfig,
    pub ctx: &'a CheckoutContext,
}

impl UnitContext<'_> {
    /// Return URL for redirect sources; the method's own setting wins
    pub fn return_url(&self) -> Option<String> {
        self.config
            .setting("return_url")
            .map(str::to_string)
            .or_else(|| self.ctx.config.redirect.return_url.clone())
    }

    /// Cart for building widget and wallet requests
    pub async fn cart(&self) -> PaymentResult<CartData> {
        match self.ctx.selection.cart_snapshot()? {
            Some(cart) => Ok(cart),
            None => self.ctx.commerce.get_cart().await,
        }
    }
}

/// Per-method strategy. Every hook has a default, so a variant only
/// overrides what differs.
#[async_trait]
pub trait MethodBehavior: Send + Sync {
    /// Settings this variant cannot run without, besides the configured ones
    fn required_settings(&self) -> &[&'static str] {
        &[]
    }

    async fn init_payment_before(&self, _unit: &UnitContext<'_>) -> PaymentResult<()> {
        Ok(())
    }

    /// Mount widgets. `PaymentError::Unsupported` hides the method quietly.
    async fn init_payment(&self, _unit: &UnitContext<'_>) -> PaymentResult<()> {
        Ok(())
    }

    async fn init_payment_after(&self, _unit: &UnitContext<'_>) -> PaymentResult<()> {
        Ok(())
    }

    /// Whether the capture widgets hold complete input
    fn validate_elements(&self) -> bool {
        true
    }

    /// Adjust the request before tokenization
    fn decorate_request(&self, _unit: &UnitContext<'_>, _request: &mut SourceRequest) {}

    async fn create_source(
        &self,
        unit: &UnitContext<'_>,
        request: &SourceRequest,
    ) -> PaymentResult<PaymentSource> {
        unit.ctx.tokenizer.create_source(None, request).await
    }

    /// Release widgets
    async fn destroy(&self) {}

    fn on_focus(&self, _unit: &UnitContext<'_>, _field: &str) {}

    fn on_blur(&self, _unit: &UnitContext<'_>, _field: &str) {}

    fn on_change(&self, _unit: &UnitContext<'_>, _field: &str) {}

    fn on_click(&self, _unit: &UnitContext<'_>) {}

    fn on_cancel(&self, _unit: &UnitContext<'_>) {}

    async fn after_overlay(&self, _ctx: &RedirectContext<'_>) {}

    async fn live_instrument(&self, _ctx: &RedirectContext<'_>) {}
}

/// Default behavior for a method kind
pub fn behavior_for(kind: MethodKind) -> Box<dyn MethodBehavior> {
    match kind {
        MethodKind::Card => Box::new(CardBehavior::new()),
        MethodKind::ApplePay | MethodKind::GooglePay => Box::new(WalletBehavior::new(kind)),
        MethodKind::PayPal => Box::new(PayPalBehavior),
        MethodKind::RedirectBank => Box::new(RedirectBankBehavior),
        MethodKind::Dropin => Box::new(DropinBehavior::new()),
        MethodKind::Generic => Box::new(GenericBehavior),
    }
}

struct BehaviorHooks<'a>(&'a dyn MethodBehavior);

#[async_trait]
impl<'a> RedirectHooks for BehaviorHooks<'a> {
    async fn after_overlay(&self, ctx: &RedirectContext<'_>) {
        self.0.after_overlay(ctx).await;
    }

    async fn live_instrument(&self, ctx: &RedirectContext<'_>) {
        self.0.live_instrument(ctx).await;
    }
}

#[derive(Debug, Default)]
struct UnitState {
    phase: UnitPhase,
    show: bool,
    supported: bool,
    capability: Option<MethodCapability>,
}

/// One configured payment method
pub struct PaymentMethodUnit {
    config: MethodConfig,
    ctx: Arc<CheckoutContext>,
    behavior: Box<dyn MethodBehavior>,
    state: Mutex<UnitState>,
}

impl PaymentMethodUnit {
    /// Unit with the default behavior for the configured kind
    pub fn new(config: MethodConfig, ctx: Arc<CheckoutContext>) -> Self {
        let behavior = behavior_for(config.kind);
        Self::with_behavior(config, ctx, behavior)
    }

    pub fn with_behavior(
        config: MethodConfig,
        ctx: Arc<CheckoutContext>,
        behavior: Box<dyn MethodBehavior>,
    ) -> Self {
        Self {
            config,
            ctx,
            behavior,
            state: Mutex::new(UnitState {
                supported: true,
                ..Default::default()
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &MethodConfig {
        &self.config
    }

    pub fn phase(&self) -> UnitPhase {
        self.state().phase
    }

    pub fn is_shown(&self) -> bool {
        self.state().show
    }

    pub fn is_supported(&self) -> bool {
        self.state().supported
    }

    pub fn capability(&self) -> Option<MethodCapability> {
        self.state().capability
    }

    fn state(&self) -> std::sync::MutexGuard<'_, UnitState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_phase(&self, phase: UnitPhase) {
        let mut state = self.state();
        debug!(method = %self.config.name, from = ?state.phase, to = ?phase, "Unit phase");
        state.phase = phase;
    }

    fn unit_context(&self) -> UnitContext<'_> {
        UnitContext {
            config: &self.config,
            ctx: &self.ctx,
        }
    }

    /// Make the method visible
    pub fn show(&self) {
        {
            let mut state = self.state();
            state.show = true;
            if state.phase == UnitPhase::Uninitialized || state.phase == UnitPhase::Hidden {
                state.phase = UnitPhase::Shown;
            }
        }
        self.ctx.presenter.set_method_visible(&self.config.name, true);
    }

    /// Keep the method in the DOM but hide it
    pub fn hide(&self) {
        {
            let mut state = self.state();
            state.show = false;
            state.phase = UnitPhase::Hidden;
        }
        self.ctx.presenter.set_method_visible(&self.config.name, false);
    }

    // ---- capability probes ----

    /// Run the five capability probes concurrently
    pub async fn probe(&self, cart: &CartData, options: &[PaymentOption]) -> MethodCapability {
        let (currency, geography, recurring, settings, threshold) = futures::join!(
            self.probe_currency(cart),
            self.probe_geography(cart),
            self.probe_recurring(cart),
            self.probe_settings(options),
            self.probe_threshold(cart),
        );

        let capability = MethodCapability {
            supported_currency: currency,
            supported_geography: geography,
            supported_recurring_payments: recurring,
            supported_settings: settings,
            supported_threshold_amount: threshold,
        };
        self.state().capability = Some(capability);
        capability
    }

    async fn probe_currency(&self, cart: &CartData) -> bool {
        let currency = cart.currency();
        self.config.supported_currencies.is_empty()
            || self
                .config
                .supported_currencies
                .iter()
                .any(|c| c.eq_ignore_ascii_case(currency.as_str()))
    }

    async fn probe_geography(&self, cart: &CartData) -> bool {
        if self.config.supported_countries.is_empty() {
            return true;
        }
        // without a billing address there is nothing to exclude yet
        match cart.billing_country() {
            Some(country) => self
                .config
                .supported_countries
                .iter()
                .any(|c| c.eq_ignore_ascii_case(&country)),
            None => true,
        }
    }

    async fn probe_recurring(&self, cart: &CartData) -> bool {
        !cart.requires_recurring || self.config.recurring_payments
    }

    async fn probe_settings(&self, options: &[PaymentOption]) -> bool {
        let mut required: Vec<&str> =
            self.config.required_settings.iter().map(String::as_str).collect();
        for key in self.behavior.required_settings() {
            required.push(key);
        }
        let missing = required
            .into_iter()
            .find(|key| self.config.setting(key).map_or(true, |v| v.trim().is_empty()));
        if let Some(key) = missing {
            debug!(method = %self.config.name, setting = key, "Required setting missing");
            return false;
        }

        options.is_empty()
            || options
                .iter()
                .any(|option| option.name == self.config.name && option.enabled)
    }

    async fn probe_threshold(&self, cart: &CartData) -> bool {
        let total = cart.order_total().value;
        self.config.min_amount.map_or(true, |min| total >= min)
            && self.config.max_amount.map_or(true, |max| total <= max)
    }

    // ---- lifecycle ----

    /// Run one initialization phase
    #[instrument(skip(self), fields(method = %self.config.name))]
    pub async fn run_phase(&self, phase: InitPhase) -> PaymentResult<()> {
        let unit = self.unit_context();
        match phase {
            InitPhase::Before => self.behavior.init_payment_before(&unit).await,
            InitPhase::Init => match self.behavior.init_payment(&unit).await {
                Ok(()) => {
                    self.set_phase(UnitPhase::ElementsReady);
                    Ok(())
                }
                Err(e) if e.is_silent() => {
                    info!("Method not available on this device: {}", e);
                    self.state().supported = false;
                    self.hide();
                    Ok(())
                }
                Err(e) => Err(e),
            },
            InitPhase::After => self.behavior.init_payment_after(&unit).await,
        }
    }

    pub fn validate_elements(&self) -> bool {
        self.behavior.validate_elements()
    }

    /// Record this method as the shopper's choice
    pub fn select(&self) -> PaymentResult<()> {
        let selection = &self.ctx.selection;
        match selection.payment()? {
            Some(record) if record.name == self.config.name => Ok(()),
            _ => selection.save_payment(&PaymentRecord::selected(&self.config.name)),
        }
    }

    /// Forward a page event to the behavior
    pub fn handle_event(&self, event: UnitEvent) {
        let unit = self.unit_context();
        match &event {
            UnitEvent::Focus(field) => self.behavior.on_focus(&unit, field),
            UnitEvent::Blur(field) => self.behavior.on_blur(&unit, field),
            UnitEvent::Change(field) => self.behavior.on_change(&unit, field),
            UnitEvent::Click => self.behavior.on_click(&unit),
            UnitEvent::Cancel => {
                self.behavior.on_cancel(&unit);
                if self.phase() == UnitPhase::SourcePending {
                    self.set_phase(UnitPhase::ElementsReady);
                }
                self.ctx.presenter.set_loading(false);
            }
        }
    }

    /// Tear down widgets; the method is hidden afterwards
    pub async fn destroy(&self) {
        self.behavior.destroy().await;
        let mut state = self.state();
        state.show = false;
        state.phase = UnitPhase::Hidden;
    }

    /// Produce a validated source, optionally applying it to the cart.
    ///
    /// A ready source persisted for this method is reused when it still
    /// validates; otherwise a new one is created, completed through the
    /// redirect coordinator if it needs one, and validated.
    #[instrument(skip(self), fields(method = %self.config.name))]
    pub async fn apply_source_id(&self, apply_to_cart: bool) -> PaymentResult<SourceOutcome> {
        let ctx = self.ctx.as_ref();
        let validator = SourceValidator::new(ctx);

        if let Some(existing) = ctx.selection.source_for(&self.config.name)? {
            if self.config.is_ready(existing.state) {
                let cart = ctx.commerce.get_cart().await?;
                match validator.validate_source(Some(existing), &cart).await? {
                    Validation::Accepted(source) => {
                        debug!(source_id = %source.id, "Reusing ready source");
                        return self.finish(source, apply_to_cart).await;
                    }
                    Validation::Rejected(reason) => {
                        debug!(%reason, "Stored source no longer valid, creating a new one");
                    }
                }
            }
        }

        if !self.behavior.validate_elements() {
            return Ok(SourceOutcome::Rejected(Rejection::IncompleteElements));
        }

        let cart = ctx.commerce.get_cart().await?;
        ctx.selection.save_cart_snapshot(&cart)?;

        let unit = self.unit_context();
        let mut request = SourceRequest::from_cart(&self.config.source_type, &cart);
        request.statement_descriptor = self.config.statement_descriptor.clone();
        self.behavior.decorate_request(&unit, &mut request);

        self.set_phase(UnitPhase::SourcePending);
        ctx.emit(
            CheckoutEvent::new(&self.config.name, "tokenizer", "createSource")
                .kind(EventKind::Request)
                .payment(&self.config.name)
                .options(serde_json::to_value(&request)?),
        );

        let source = match self.behavior.create_source(&unit, &request).await {
            Ok(source) => source,
            Err(PaymentError::Dismissed { .. }) => {
                info!("Payment sheet dismissed");
                self.set_phase(UnitPhase::ElementsReady);
                return Ok(SourceOutcome::Cancelled(CancelReason::Closed));
            }
            Err(e) => {
                self.set_phase(UnitPhase::SourceFailed);
                ctx.emit(
                    CheckoutEvent::new(&self.config.name, "tokenizer", "createSource")
                        .kind(EventKind::Error)
                        .payment(&self.config.name)
                        .response(serde_json::json!({ "error": e.to_string() })),
                );
                return Err(e.into_authorization());
            }
        };
        ctx.emit(
            CheckoutEvent::new(&source.id, "tokenizer", "createSource")
                .kind(EventKind::Response)
                .payment(&self.config.name)
                .response(serde_json::json!({ "status": source.state, "type": source.source_type })),
        );

        ctx.selection
            .save_payment(&PaymentRecord::with_source(&self.config.name, source.clone()))?;
        ctx.selection.set_created_type(&self.config.name)?;

        let source = if !self.config.is_ready(source.state) && source.needs_redirect() {
            let hooks = BehaviorHooks(self.behavior.as_ref());
            match ctx.redirects.run(&self.config, &source, &hooks).await? {
                RedirectOutcome::Completed(done) => {
                    ctx.selection
                        .save_payment(&PaymentRecord::with_source(&self.config.name, done.clone()))?;
                    done
                }
                RedirectOutcome::Cancelled(reason) => {
                    self.set_phase(UnitPhase::ElementsReady);
                    return Ok(SourceOutcome::Cancelled(reason));
                }
            }
        } else {
            source
        };

        if source.state == SourceState::Failed {
            self.set_phase(UnitPhase::SourceFailed);
            warn!(source_id = %source.id, "Source authorization failed");
            return Err(PaymentError::AuthorizationFailed(format!(
                "source {} failed",
                source.id
            )));
        }

        match validator.validate_source(Some(source), &cart).await? {
            Validation::Accepted(source) => self.finish(source, apply_to_cart).await,
            Validation::Rejected(reason) => {
                info!(%reason, "Source rejected");
                self.set_phase(UnitPhase::ElementsReady);
                Ok(SourceOutcome::Rejected(reason))
            }
        }
    }

    async fn finish(&self, source: PaymentSource, apply_to_cart: bool) -> PaymentResult<SourceOutcome> {
        self.set_phase(UnitPhase::SourceReady);

        if apply_to_cart {
            apply_and_confirm(&self.ctx, &source.id).await?;
            self.set_phase(UnitPhase::AppliedToCart);
        }

        let pending_funds =
            source.state == SourceState::Pending && self.config.accepts_pending_funds();
        Ok(SourceOutcome::Ready {
            source,
            pending_funds,
        })
    }
}

impl std::fmt::Debug for PaymentMethodUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("PaymentMethodUnit")
            .field("name", &self.config.name)
            .field("kind", &self.config.kind)
            .field("phase", &state.phase)
            .field("show", &state.show)
            .field("supported", &state.supported)
            .finish()
    }
}
