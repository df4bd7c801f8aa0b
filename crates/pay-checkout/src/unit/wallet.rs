//! Wallet sheets (Apple Pay, Google Pay).
//!
//! The sheet is prepared during `init_payment`; a device that cannot present
//! it reports `Unsupported`, which hides the method without an error. A
//! dismissed sheet ends the attempt as a cancellation. The addresses the
//! shopper approves in the sheet are synced to the cart before tokenizing.

use super::{MethodBehavior, UnitContext};
use async_trait::async_trait;
use pay_core::{
    MethodKind, PaymentError, PaymentRequestData, PaymentResult, PaymentSource, SourceRequest,
    WalletRequest,
};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

pub struct WalletBehavior {
    kind: MethodKind,
    request: Mutex<Option<Arc<dyn WalletRequest>>>,
}

impl WalletBehavior {
    pub fn new(kind: MethodKind) -> Self {
        Self {
            kind,
            request: Mutex::new(None),
        }
    }

    fn current(&self) -> Option<Arc<dyn WalletRequest>> {
        self.request.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl MethodBehavior for WalletBehavior {
    async fn init_payment(&self, unit: &UnitContext<'_>) -> PaymentResult<()> {
        let cart = unit.cart().await?;
        let country = cart
            .billing_country()
            .or_else(|| unit.config.setting("country").map(str::to_uppercase))
            .unwrap_or_else(|| "US".to_string());

        let data = PaymentRequestData {
            country,
            total: cart.order_total(),
            label: unit
                .config
                .setting("label")
                .unwrap_or(unit.config.name.as_str())
                .to_string(),
            request_shipping: unit.config.setting("request_shipping") == Some("true"),
        };

        let request: Arc<dyn WalletRequest> =
            Arc::from(unit.ctx.elements.payment_request(data).await?);
        if !request.can_make_payment().await {
            return Err(PaymentError::Unsupported {
                method: unit.config.name.clone(),
                reason: format!("{:?} is not available on this device", self.kind),
            });
        }

        *self.request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request);
        Ok(())
    }

    fn validate_elements(&self) -> bool {
        self.current().is_some()
    }

    async fn create_source(
        &self,
        unit: &UnitContext<'_>,
        request: &SourceRequest,
    ) -> PaymentResult<PaymentSource> {
        let sheet = self.current().ok_or_else(|| PaymentError::Unsupported {
            method: unit.config.name.clone(),
            reason: "payment sheet not prepared".to_string(),
        })?;

        let approved = sheet.show().await?.ok_or_else(|| PaymentError::Dismissed {
            method: unit.config.name.clone(),
        })?;
        debug!(method = %unit.config.name, "Wallet sheet approved");

        if approved.billing.is_some() || approved.shipping.is_some() {
            unit.ctx
                .commerce
                .apply_address_to_cart(approved.billing.as_ref(), approved.shipping.as_ref())
                .await?;
            info!(method = %unit.config.name, "Wallet addresses applied to cart");
        }

        let mut request = request.clone();
        if let Some(billing) = approved.billing.as_ref() {
            let owner = request.owner.get_or_insert_with(Default::default);
            owner.name = billing.full_name().or(owner.name.take());
            owner.email = billing.email.clone().or(owner.email.take());
            owner.phone = billing.phone.clone().or(owner.phone.take());
            owner.address = Some(billing.clone());
        }

        unit.ctx
            .tokenizer
            .create_source(Some(&approved.element), &request)
            .await
    }

    async fn destroy(&self) {
        if let Some(sheet) = self.request.lock().unwrap_or_else(|e| e.into_inner()).take() {
            sheet.abort();
        }
    }

    fn on_cancel(&self, _unit: &UnitContext<'_>) {
        if let Some(sheet) = self.current() {
            sheet.abort();
        }
    }
}
