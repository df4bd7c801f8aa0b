//! # Cart Types
//!
//! Read-mostly snapshots fetched from the commerce backend. The orchestrator
//! never changes cart pricing, only the address and payment-method
//! associations.

use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// A postal address as the commerce backend reports it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// ISO 3166-1 alpha-2 country code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Address {
    /// Create an address in a country
    pub fn in_country(country: impl Into<String>) -> Self {
        Self {
            country: Some(country.into()),
            ..Self::default()
        }
    }

    /// "First Last", if either part is known
    pub fn full_name(&self) -> Option<String> {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
            (Some(first), None) => Some(first.clone()),
            (None, Some(last)) => Some(last.clone()),
            (None, None) => None,
        }
    }
}

/// Cart pricing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    pub order_total: Money,
}

impl Pricing {
    pub fn total(order_total: Money) -> Self {
        Self { order_total }
    }
}

/// Partial-funding model (gift cards, store credit, split tenders)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_remaining_to_be_contributed: Option<Money>,
}

/// The payment method the cart currently holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartPaymentMethod {
    pub source_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// Snapshot of the shopper's cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<Address>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<Address>,

    pub pricing: Pricing,

    /// Present only when the backend exposes partial funding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_session: Option<PaymentSession>,

    #[serde(default)]
    pub total_items_in_cart: u32,

    /// Cart holds a subscription product
    #[serde(default)]
    pub requires_recurring: bool,

    /// Acknowledgment of an applied source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<CartPaymentMethod>,
}

impl CartData {
    /// Create a cart snapshot with pricing only
    pub fn new(pricing: Pricing) -> Self {
        Self {
            id: None,
            billing_address: None,
            shipping_address: None,
            pricing,
            payment_session: None,
            total_items_in_cart: 1,
            requires_recurring: false,
            payment_method: None,
        }
    }

    /// Builder: set billing address
    pub fn with_billing(mut self, address: Address) -> Self {
        self.billing_address = Some(address);
        self
    }

    /// Builder: set item count
    pub fn with_items(mut self, count: u32) -> Self {
        self.total_items_in_cart = count;
        self
    }

    /// Builder: mark as a subscription cart
    pub fn recurring(mut self) -> Self {
        self.requires_recurring = true;
        self
    }

    /// Builder: expose the partial-funding model
    pub fn with_remaining_contribution(mut self, remaining: Money) -> Self {
        self.payment_session = Some(PaymentSession {
            amount_remaining_to_be_contributed: Some(remaining),
        });
        self
    }

    pub fn order_total(&self) -> Money {
        self.pricing.order_total
    }

    pub fn currency(&self) -> Currency {
        self.pricing.order_total.currency
    }

    /// Billing country, upper-cased
    pub fn billing_country(&self) -> Option<String> {
        self.billing_address
            .as_ref()
            .and_then(|a| a.country.as_ref())
            .map(|c| c.to_ascii_uppercase())
    }

    /// True when the backend models partial funding
    pub fn has_partial_funding(&self) -> bool {
        self.payment_session.is_some()
    }

    /// Source ID the cart acknowledged, if any
    pub fn applied_source_id(&self) -> Option<&str> {
        self.payment_method.as_ref().map(|p| p.source_id.as_str())
    }
}

/// A payment option the backend has enabled for this storefront
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOption {
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// A submitted order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_cart_snapshot() {
        let cart: CartData = serde_json::from_value(json!({
            "billingAddress": { "firstName": "Ada", "lastName": "Lovelace", "country": "de" },
            "pricing": { "orderTotal": { "value": 1999, "currency": "EUR" } },
            "paymentSession": { "amountRemainingToBeContributed": { "value": 0, "currency": "EUR" } },
            "totalItemsInCart": 2
        }))
        .unwrap();

        assert_eq!(cart.order_total(), Money::new(1999, Currency::EUR));
        assert_eq!(cart.billing_country().as_deref(), Some("DE"));
        assert!(cart.has_partial_funding());
        assert_eq!(cart.total_items_in_cart, 2);
        assert!(!cart.requires_recurring);
        assert_eq!(
            cart.billing_address.unwrap().full_name().as_deref(),
            Some("Ada Lovelace")
        );
    }

    #[test]
    fn test_applied_source_ack() {
        let mut cart = CartData::new(Pricing::total(Money::new(100, Currency::USD)));
        assert_eq!(cart.applied_source_id(), None);

        cart.payment_method = Some(CartPaymentMethod {
            source_id: "src_1".into(),
            method: None,
        });
        assert_eq!(cart.applied_source_id(), Some("src_1"));
    }
}
