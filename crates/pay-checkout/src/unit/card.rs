//! Card capture: one widget per field, tokenized through the number field.

use super::{MethodBehavior, UnitContext};
use async_trait::async_trait;
use pay_core::{
    CaptureElement, FieldStatus, PaymentError, PaymentResult, PaymentSource, SourceRequest,
};
use serde_json::json;
use std::sync::Mutex;
use tracing::debug;

const DEFAULT_FIELDS: [&str; 3] = ["cardNumber", "cardExpiry", "cardCvc"];

pub struct CardBehavior {
    fields: Mutex<Vec<(String, Box<dyn CaptureElement>)>>,
}

impl CardBehavior {
    pub fn new() -> Self {
        Self {
            fields: Mutex::new(Vec::new()),
        }
    }

    /// Field kinds from the `fields` setting, comma separated
    fn field_kinds(unit: &UnitContext<'_>) -> Vec<String> {
        match unit.config.setting("fields") {
            Some(list) => list
                .split(',')
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect(),
            None => DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }

    fn field_status(&self, field: &str) -> Option<FieldStatus> {
        let fields = self.fields.lock().unwrap_or_else(|e| e.into_inner());
        fields
            .iter()
            .find(|(kind, _)| kind == field)
            .map(|(_, element)| element.status())
    }
}

impl Default for CardBehavior {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MethodBehavior for CardBehavior {
    async fn init_payment(&self, unit: &UnitContext<'_>) -> PaymentResult<()> {
        let style = unit.config.setting("style").unwrap_or("default");
        let mut mounted = Vec::new();

        for kind in Self::field_kinds(unit) {
            let element = unit
                .ctx
                .elements
                .create_element(&kind, json!({ "style": style }))
                .await?;
            element.mount(&format!("#{}-{}", unit.config.name, kind))?;
            mounted.push((kind, element));
        }

        let mut fields = self.fields.lock().unwrap_or_else(|e| e.into_inner());
        for (_, old) in fields.drain(..) {
            old.unmount();
        }
        *fields = mounted;
        Ok(())
    }

    fn validate_elements(&self) -> bool {
        let fields = self.fields.lock().unwrap_or_else(|e| e.into_inner());
        !fields.is_empty()
            && fields
                .iter()
                .all(|(_, element)| element.status() == FieldStatus::Complete)
    }

    async fn create_source(
        &self,
        unit: &UnitContext<'_>,
        request: &SourceRequest,
    ) -> PaymentResult<PaymentSource> {
        let handle = {
            let fields = self.fields.lock().unwrap_or_else(|e| e.into_inner());
            fields
                .first()
                .map(|(_, element)| element.handle())
                .ok_or_else(|| PaymentError::InvalidRequest("card fields not mounted".to_string()))?
        };
        unit.ctx.tokenizer.create_source(Some(&handle), request).await
    }

    async fn destroy(&self) {
        let mut fields = self.fields.lock().unwrap_or_else(|e| e.into_inner());
        for (_, element) in fields.drain(..) {
            element.unmount();
        }
    }

    fn on_change(&self, unit: &UnitContext<'_>, field: &str) {
        if let Some(status) = self.field_status(field) {
            debug!(method = %unit.config.name, field, ?status, "Card field changed");
            if status != FieldStatus::Invalid {
                unit.ctx.presenter.clear_error();
            }
        }
    }

    fn on_blur(&self, unit: &UnitContext<'_>, field: &str) {
        if self.field_status(field) == Some(FieldStatus::Invalid) {
            unit.ctx
                .presenter
                .show_error(&format!("Please check the {} field.", field_label(field)));
        }
    }
}

fn field_label(field: &str) -> &str {
    match field {
        "cardNumber" => "card number",
        "cardExpiry" => "expiration date",
        "cardCvc" => "security code",
        other => other,
    }
}
