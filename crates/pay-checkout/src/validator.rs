//! # Source Validator
//!
//! Decides whether a source may be submitted for the current cart. The
//! decision itself is [`pay_core::check_source`]; this layer fills in the
//! source (from the persisted selection when none is passed), refreshes it
//! when a client secret allows, and resolves the owning method.
//!
//! Validation never mutates the selection or the cart, so calling it twice
//! with the same inputs gives the same answer.

use crate::context::CheckoutContext;
use pay_core::{
    check_source, resolve_method, CartData, PaymentResult, PaymentSource, Rejection, Validation,
};
use tracing::{debug, instrument};

pub struct SourceValidator<'a> {
    ctx: &'a CheckoutContext,
}

impl<'a> SourceValidator<'a> {
    pub fn new(ctx: &'a CheckoutContext) -> Self {
        Self { ctx }
    }

    /// Validate `source`, or the persisted one when `None`
    #[instrument(skip_all, fields(source_id = source.as_ref().map(|s| s.id.as_str()).unwrap_or("<stored>")))]
    pub async fn validate_source(
        &self,
        source: Option<PaymentSource>,
        cart: &CartData,
    ) -> PaymentResult<Validation> {
        let source = match source {
            Some(source) => source,
            None => match self.stored_source()? {
                Some(source) => source,
                None => return Ok(Validation::Rejected(Rejection::MissingSource)),
            },
        };

        let source = self.refresh(source).await?;
        let created_type = self.ctx.selection.created_type()?;

        let method = match resolve_method(&self.ctx.config, &source, created_type.as_deref()) {
            Some(method) => method,
            None => {
                return Ok(Validation::Rejected(Rejection::UnknownMethod {
                    source_type: source.source_type.clone(),
                }))
            }
        };

        let validation = check_source(&source, cart, method);
        debug!(method = %method.name, accepted = validation.is_accepted(), "Source checked");
        Ok(validation)
    }

    fn stored_source(&self) -> PaymentResult<Option<PaymentSource>> {
        Ok(self
            .ctx
            .selection
            .payment()?
            .and_then(|record| record.result.map(|r| r.source)))
    }

    async fn refresh(&self, source: PaymentSource) -> PaymentResult<PaymentSource> {
        if source.client_secret.is_none() {
            return Ok(source);
        }
        self.ctx.redirects.refresh(&source).await
    }
}
