//! Drop-in widget offering several methods at once.
//!
//! The widget reports the chosen source type through its handle kind, so
//! the created source may carry any type; the persisted created type ties
//! it back to this method.

use super::{MethodBehavior, UnitContext};
use async_trait::async_trait;
use pay_core::{
    CaptureElement, FieldStatus, PaymentError, PaymentResult, PaymentSource, SourceRequest,
};
use serde_json::json;
use std::sync::Mutex;

pub struct DropinBehavior {
    element: Mutex<Option<Box<dyn CaptureElement>>>,
}

impl DropinBehavior {
    pub fn new() -> Self {
        Self {
            element: Mutex::new(None),
        }
    }
}

impl Default for DropinBehavior {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MethodBehavior for DropinBehavior {
    async fn init_payment(&self, unit: &UnitContext<'_>) -> PaymentResult<()> {
        let cart = unit.cart().await?;
        let methods: Vec<&str> = unit
            .config
            .setting("methods")
            .map(|list| list.split(',').map(str::trim).filter(|m| !m.is_empty()).collect())
            .unwrap_or_default();

        let element = unit
            .ctx
            .elements
            .create_dropin(json!({
                "methods": methods,
                "amount": cart.order_total().value,
                "currency": cart.currency(),
            }))
            .await?;
        element.mount(&format!("#{}-dropin", unit.config.name))?;

        if let Some(old) = self.element.lock().unwrap_or_else(|e| e.into_inner()).replace(element) {
            old.unmount();
        }
        Ok(())
    }

    fn validate_elements(&self) -> bool {
        self.element
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map_or(false, |element| element.status() == FieldStatus::Complete)
    }

    async fn create_source(
        &self,
        unit: &UnitContext<'_>,
        request: &SourceRequest,
    ) -> PaymentResult<PaymentSource> {
        let handle = self
            .element
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|element| element.handle())
            .ok_or_else(|| PaymentError::InvalidRequest("drop-in not mounted".to_string()))?;

        let mut request = request.clone();
        if !handle.kind.is_empty() {
            request.source_type = handle.kind.clone();
        }
        unit.ctx.tokenizer.create_source(Some(&handle), &request).await
    }

    async fn destroy(&self) {
        if let Some(element) = self.element.lock().unwrap_or_else(|e| e.into_inner()).take() {
            element.unmount();
        }
    }
}
