//! # Source Checks
//!
//! Pure consistency checks of a payment source against the cart. Given the
//! same source, cart and method config they always give the same answer.
//!
//! A failed check is a [`Rejection`], not an error: the caller sends the
//! shopper back to the capture UI without a message.

use crate::cart::CartData;
use crate::method::{CheckoutConfig, MethodConfig, MethodKind};
use crate::money::Currency;
use crate::source::{PaymentSource, SourceState};
use serde::{Deserialize, Serialize};

/// Source types that are created as a placeholder and resolve to another type
pub const SOURCE_TYPE_OVERRIDES: &[(&str, &str)] = &[
    ("three_d_secure", "card"),
    ("card_present", "card"),
];

/// Why a source may not be submitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    /// No source supplied and none persisted
    MissingSource,
    /// Capture fields are not complete
    IncompleteElements,
    /// No configured method creates this source type
    UnknownMethod { source_type: String },
    /// Cart needs recurring billing, the method cannot do it
    RecurringUnsupported { method: String },
    AmountMismatch { expected: i64, actual: Option<i64> },
    CurrencyMismatch { expected: Currency, actual: Currency },
    /// Partial funding still expects a contribution
    ContributionOutstanding { remaining: i64 },
    /// Method allows one subscription item, cart has more
    TooManyItemsForRecurring { items: u32 },
    NotReady { state: SourceState },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::MissingSource => write!(f, "no payment source"),
            Rejection::IncompleteElements => write!(f, "payment fields incomplete"),
            Rejection::UnknownMethod { source_type } => {
                write!(f, "no method for source type {}", source_type)
            }
            Rejection::RecurringUnsupported { method } => {
                write!(f, "{} does not support recurring payments", method)
            }
            Rejection::AmountMismatch { expected, actual } => {
                write!(f, "amount {:?} does not match order total {}", actual, expected)
            }
            Rejection::CurrencyMismatch { expected, actual } => {
                write!(f, "currency {} does not match cart currency {}", actual, expected)
            }
            Rejection::ContributionOutstanding { remaining } => {
                write!(f, "{} still to be contributed", remaining)
            }
            Rejection::TooManyItemsForRecurring { items } => {
                write!(f, "{} items in a single-subscription cart", items)
            }
            Rejection::NotReady { state } => write!(f, "source is {}", state),
        }
    }
}

/// Result of checking a source
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    Accepted(PaymentSource),
    Rejected(Rejection),
}

impl Validation {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Validation::Accepted(_))
    }

    /// The accepted source, if any
    pub fn source(self) -> Option<PaymentSource> {
        match self {
            Validation::Accepted(source) => Some(source),
            Validation::Rejected(_) => None,
        }
    }
}

/// Normalize placeholder source types to the concrete type
pub fn concrete_source_type(source_type: &str) -> &str {
    SOURCE_TYPE_OVERRIDES
        .iter()
        .find(|(placeholder, _)| *placeholder == source_type)
        .map(|(_, concrete)| *concrete)
        .unwrap_or(source_type)
}

/// Find the method that owns a source.
///
/// `created_type` is the method name recorded when the source was created;
/// it wins whenever several methods share a source type (cards and wallets)
/// or the creating method is a drop-in that can emit any type.
pub fn resolve_method<'a>(
    config: &'a CheckoutConfig,
    source: &PaymentSource,
    created_type: Option<&str>,
) -> Option<&'a MethodConfig> {
    let source_type = concrete_source_type(&source.source_type);

    if let Some(created) = created_type.and_then(|name| config.method(name)) {
        if created.source_type == source_type || created.kind == MethodKind::Dropin {
            return Some(created);
        }
    }

    config.methods.iter().find(|m| m.source_type == source_type)
}

/// Check a source against the cart for the method that owns it
pub fn check_source(source: &PaymentSource, cart: &CartData, method: &MethodConfig) -> Validation {
    if cart.requires_recurring && !method.recurring_payments {
        return Validation::Rejected(Rejection::RecurringUnsupported {
            method: method.name.clone(),
        });
    }

    let total = cart.order_total();

    match cart.payment_session.as_ref() {
        Some(session) => {
            if !method.amounts_estimated {
                let remaining = session
                    .amount_remaining_to_be_contributed
                    .map(|m| m.value)
                    .unwrap_or(0);
                if remaining != 0 {
                    return Validation::Rejected(Rejection::ContributionOutstanding { remaining });
                }
            }
        }
        None => {
            if !method.amounts_estimated && source.amount != Some(total.value) {
                return Validation::Rejected(Rejection::AmountMismatch {
                    expected: total.value,
                    actual: source.amount,
                });
            }
        }
    }

    if source.currency != total.currency {
        return Validation::Rejected(Rejection::CurrencyMismatch {
            expected: total.currency,
            actual: source.currency,
        });
    }

    if method.single_subscription_for_recurring
        && cart.requires_recurring
        && cart.total_items_in_cart > 1
    {
        return Validation::Rejected(Rejection::TooManyItemsForRecurring {
            items: cart.total_items_in_cart,
        });
    }

    if !method.is_ready(source.state) {
        return Validation::Rejected(Rejection::NotReady {
            state: source.state,
        });
    }

    Validation::Accepted(source.clone())
}
