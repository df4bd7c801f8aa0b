//! # Payment Method Registry
//!
//! Holds every configured unit and brings them up for a cart:
//!
//! 1. fetch the backend's payment options once
//! 2. probe every unit's capabilities concurrently
//! 3. show qualifying, enabled units; hide the rest (they stay registered)
//! 4. run `init_payment_before`, `init_payment`, `init_payment_after` as
//!    three ordered passes across the shown units
//!
//! A unit failing any phase is logged and hidden; the others carry on.

use crate::context::CheckoutContext;
use crate::unit::{InitPhase, PaymentMethodUnit, UnitPhase};
use futures::future::join_all;
use pay_core::{
    CartData, CheckoutEvent, EventKind, MethodCapability, PaymentError, PaymentOption,
    PaymentResult,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Outcome of [`PaymentRegistry::initialize`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    /// Shown and initialized, in registration order
    pub enabled: Vec<String>,
    /// Present but hidden
    pub hidden: Vec<String>,
    /// Hidden after an initialization phase failed: (method, error)
    pub failed: Vec<(String, String)>,
}

pub struct PaymentRegistry {
    ctx: Arc<CheckoutContext>,
    units: Vec<Arc<PaymentMethodUnit>>,
}

impl PaymentRegistry {
    /// Empty registry
    pub fn new(ctx: Arc<CheckoutContext>) -> Self {
        Self {
            ctx,
            units: Vec::new(),
        }
    }

    /// One unit per configured method, with the default behavior for its kind
    pub fn from_config(ctx: Arc<CheckoutContext>) -> Self {
        let units = ctx
            .config
            .methods
            .iter()
            .map(|method| Arc::new(PaymentMethodUnit::new(method.clone(), Arc::clone(&ctx))))
            .collect();
        Self { ctx, units }
    }

    /// Add a unit, replacing one with the same name
    pub fn register(&mut self, unit: PaymentMethodUnit) {
        let unit = Arc::new(unit);
        match self.units.iter().position(|u| u.name() == unit.name()) {
            Some(index) => self.units[index] = unit,
            None => self.units.push(unit),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<PaymentMethodUnit>> {
        self.units.iter().find(|u| u.name() == name).cloned()
    }

    pub fn get_required(&self, name: &str) -> PaymentResult<Arc<PaymentMethodUnit>> {
        self.get(name).ok_or_else(|| PaymentError::UnknownMethod {
            name: name.to_string(),
        })
    }

    pub fn units(&self) -> &[Arc<PaymentMethodUnit>] {
        &self.units
    }

    /// Names of the units currently shown
    pub fn visible(&self) -> Vec<String> {
        self.units
            .iter()
            .filter(|u| u.is_shown())
            .map(|u| u.name().to_string())
            .collect()
    }

    async fn payment_options(&self) -> Option<Vec<PaymentOption>> {
        match self.ctx.commerce.get_payment_options().await {
            Ok(options) => Some(options),
            Err(e) => {
                warn!("Fetching payment options failed, hiding all methods: {}", e);
                self.ctx.emit(
                    CheckoutEvent::new("registry", "commerce", "getPaymentOptions")
                        .kind(EventKind::Error)
                        .response(serde_json::json!({ "error": e.to_string() })),
                );
                None
            }
        }
    }

    /// Probe every unit's capabilities for a cart
    #[instrument(skip_all)]
    pub async fn probe(&self, cart: &CartData) -> HashMap<String, MethodCapability> {
        let options = self.payment_options().await;

        let probes = self.units.iter().map(|unit| {
            let options = options.as_deref();
            async move {
                let capability = match options {
                    Some(options) => unit.probe(cart, options).await,
                    None => MethodCapability::default(),
                };
                (unit.name().to_string(), capability)
            }
        });

        join_all(probes).await.into_iter().collect()
    }

    /// Probe, show or hide, then run the three initialization passes
    #[instrument(skip_all, fields(units = self.units.len()))]
    pub async fn initialize(&self, cart: &CartData) -> InitReport {
        let capabilities = self.probe(cart).await;
        let mut report = InitReport::default();
        let mut pending = Vec::new();

        for unit in &self.units {
            let qualifies = capabilities
                .get(unit.name())
                .map_or(false, MethodCapability::qualifies);

            if qualifies && unit.config().enabled && unit.is_supported() {
                unit.show();
                if matches!(unit.phase(), UnitPhase::Shown) {
                    pending.push(Arc::clone(unit));
                }
            } else {
                unit.hide();
            }
        }

        for phase in [InitPhase::Before, InitPhase::Init, InitPhase::After] {
            let results = join_all(pending.iter().map(|unit| unit.run_phase(phase))).await;

            let mut survivors = Vec::with_capacity(pending.len());
            for (unit, result) in pending.into_iter().zip(results) {
                match result {
                    Ok(()) if unit.is_supported() => survivors.push(unit),
                    Ok(()) => {}
                    Err(e) => {
                        error!(method = %unit.name(), ?phase, "Initialization failed: {}", e);
                        self.ctx.emit(
                            CheckoutEvent::new(unit.name(), "registry", format!("{:?}", phase))
                                .kind(EventKind::Error)
                                .payment(unit.name())
                                .response(serde_json::json!({ "error": e.to_string() })),
                        );
                        unit.hide();
                        report.failed.push((unit.name().to_string(), e.to_string()));
                    }
                }
            }
            pending = survivors;
        }

        for unit in &self.units {
            if unit.is_shown() {
                report.enabled.push(unit.name().to_string());
            } else {
                report.hidden.push(unit.name().to_string());
            }
        }

        info!(
            enabled = report.enabled.len(),
            hidden = report.hidden.len(),
            failed = report.failed.len(),
            "Payment methods initialized"
        );
        report
    }

    /// Destroy every unit
    pub async fn destroy_all(&self) {
        join_all(self.units.iter().map(|unit| unit.destroy())).await;
    }
}

impl std::fmt::Debug for PaymentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentRegistry")
            .field("units", &self.units)
            .finish()
    }
}
