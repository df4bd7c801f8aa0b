//! Bank redirects (Sofort, iDEAL, Bancontact, giropay, Multibanco, ...).
//!
//! Settings prefixed with `type.` become fields nested under the source
//! type: `type.country = "DE"` on a sofort method is sent as
//! `sofort[country]=DE`.

use super::{MethodBehavior, UnitContext};
use async_trait::async_trait;
use pay_core::SourceRequest;

const TYPE_FIELD_PREFIX: &str = "type.";

pub struct RedirectBankBehavior;

#[async_trait]
impl MethodBehavior for RedirectBankBehavior {
    fn decorate_request(&self, unit: &UnitContext<'_>, request: &mut SourceRequest) {
        if let Some(url) = unit.return_url() {
            request.return_url = Some(url);
        }

        for (key, value) in &unit.config.settings {
            if let Some(field) = key.strip_prefix(TYPE_FIELD_PREFIX) {
                request.type_fields.insert(field.to_string(), value.clone());
            }
        }

        if let Some(descriptor) = request.statement_descriptor.clone() {
            request
                .type_fields
                .entry("statement_descriptor".to_string())
                .or_insert(descriptor);
        }
    }
}
