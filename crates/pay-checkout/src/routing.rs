//! # Routing Engine
//!
//! Decides what happens once a method holds a ready source.
//!
//! | route      | page       | action                                         |
//! |------------|------------|------------------------------------------------|
//! | `thankyou` | any        | apply source, submit order, go to thank-you    |
//! | `confirm`  | any        | apply source, go to confirm page (no submit)   |
//! | none       | quick-buy  | select the method radio, submit the page form  |
//! | none       | multi-page | apply source, go to the info page              |
//! | none       | checkout   | submit the page form                           |
//!
//! Every "apply source" step checks the cart's acknowledgment before moving on.

use crate::context::CheckoutContext;
use pay_core::{CartData, MethodConfig, PaymentError, PaymentResult, PaymentSource, Route};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Page the checkout runs on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    /// Single-step purchase from a product page
    QuickBuy,
    /// Checkout spread over several pages
    MultiPage,
    /// Single checkout page with its own form
    #[default]
    Checkout,
}

impl std::str::FromStr for PageKind {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "quick_buy" | "quickbuy" => Ok(PageKind::QuickBuy),
            "multi_page" | "multipage" => Ok(PageKind::MultiPage),
            "checkout" => Ok(PageKind::Checkout),
            other => Err(PaymentError::Configuration(format!("unknown page kind: {}", other))),
        }
    }
}

/// What the router did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Left the page for this URL
    Redirected(String),
    /// Handed over to the page's own form submission
    FormSubmitted,
}

pub struct RoutingEngine<'a> {
    ctx: &'a CheckoutContext,
}

impl<'a> RoutingEngine<'a> {
    pub fn new(ctx: &'a CheckoutContext) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self, method, source), fields(method = %method.name, source_id = %source.id, page = ?self.ctx.page))]
    pub async fn route(
        &self,
        method: &MethodConfig,
        source: &PaymentSource,
    ) -> PaymentResult<Navigation> {
        let commerce = &self.ctx.commerce;

        match (method.route, self.ctx.page) {
            (Some(Route::Thankyou), _) => {
                apply_and_confirm(self.ctx, &source.id).await?;
                let order = commerce.submit_cart().await?;
                info!(order_id = %order.id, "Order submitted");
                let link = commerce.get_thank_you_page_link(&order.id).await?;
                Ok(self.go(link))
            }
            (Some(Route::Confirm), _) => {
                apply_and_confirm(self.ctx, &source.id).await?;
                let link = commerce.get_confirm_order_page_link().await?;
                Ok(self.go(link))
            }
            (None, PageKind::QuickBuy) => {
                self.ctx.presenter.select_method_radio(&method.name);
                self.ctx.presenter.submit_form();
                Ok(Navigation::FormSubmitted)
            }
            (None, PageKind::MultiPage) => {
                apply_and_confirm(self.ctx, &source.id).await?;
                let link = commerce.get_info_page_link().await?;
                Ok(self.go(link))
            }
            (None, PageKind::Checkout) => {
                self.ctx.presenter.submit_form();
                Ok(Navigation::FormSubmitted)
            }
        }
    }

    /// Leave the checkout for the cart page
    pub async fn back_to_cart(&self) -> PaymentResult<Navigation> {
        let link = self.ctx.commerce.get_cart_page_link().await?;
        info!("Returning to the cart");
        Ok(self.go(link))
    }

    fn go(&self, url: String) -> Navigation {
        self.ctx.navigator.navigate(&url);
        Navigation::Redirected(url)
    }
}

/// Apply a source to the cart and require the acknowledgment. A pending
/// shopper nickname saves the source on the account afterwards.
pub(crate) async fn apply_and_confirm(
    ctx: &CheckoutContext,
    source_id: &str,
) -> PaymentResult<CartData> {
    let cart = ctx.commerce.apply_source_to_cart(source_id).await?;
    if cart.payment_method.is_none() {
        warn!(source_id, "Cart did not acknowledge the applied source");
        return Err(PaymentError::ApplySourceFailed);
    }

    if let Some(nickname) = ctx.selection.nickname()? {
        ctx.commerce.apply_source_to_shopper(source_id, &nickname).await?;
        ctx.selection.clear_nickname()?;
        info!(source_id, "Source saved to the shopper's account");
    }

    Ok(cart)
}
