//! PayPal: a redirect source that returns to the storefront.

use super::{MethodBehavior, UnitContext};
use crate::redirect::RedirectContext;
use async_trait::async_trait;
use pay_core::SourceRequest;
use tracing::debug;

pub struct PayPalBehavior;

#[async_trait]
impl MethodBehavior for PayPalBehavior {
    fn decorate_request(&self, unit: &UnitContext<'_>, request: &mut SourceRequest) {
        if let Some(url) = unit.return_url() {
            request.return_url = Some(url);
        }
        if let Some(intent) = unit.config.setting("intent") {
            request.metadata.insert("intent".to_string(), intent.to_string());
        }
    }

    async fn live_instrument(&self, ctx: &RedirectContext<'_>) {
        // a session that is already gone has nothing to instrument
        if !ctx.hub.is_active(ctx.session_id) {
            debug!(session = ctx.session_id, "PayPal session ended before instrumenting");
            return;
        }
        debug!(
            session = ctx.session_id,
            overlay = ctx.overlay.0,
            "PayPal overlay offers back to cart"
        );
    }
}
