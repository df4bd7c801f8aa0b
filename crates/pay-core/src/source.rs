//! # Payment Source Types
//!
//! A payment source is the tokenized, possibly-pending representation of a
//! shopper's credential. It is created by the tokenizer, never mutated
//! afterwards except for `state`, which is refreshed by retrieving it again.

use crate::cart::{Address, CartData};
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle state reported by the tokenizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceState {
    /// Funds can be captured immediately
    Chargeable,
    /// Waiting on the shopper or the bank (pending funds)
    Pending,
    /// Waiting for the shopper to finish an out-of-band redirect
    PendingRedirect,
    /// Already used for a charge
    Consumed,
    /// Cancelled by the shopper or expired
    Canceled,
    /// Refused by the provider
    Failed,
    /// Any state this build does not know about
    #[serde(other)]
    Unknown,
}

impl SourceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceState::Chargeable => "chargeable",
            SourceState::Pending => "pending",
            SourceState::PendingRedirect => "pending_redirect",
            SourceState::Consumed => "consumed",
            SourceState::Canceled => "canceled",
            SourceState::Failed => "failed",
            SourceState::Unknown => "unknown",
        }
    }

    /// States after which polling can stop
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SourceState::Chargeable
                | SourceState::Consumed
                | SourceState::Canceled
                | SourceState::Failed
        )
    }
}

impl Default for SourceState {
    fn default() -> Self {
        SourceState::Pending
    }
}

impl std::fmt::Display for SourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the shopper completes authentication for a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFlow {
    /// Ready as created (cards, wallets)
    None,
    /// Shopper must visit `redirect.url`
    Redirect,
    /// Shopper pushes funds to a receiver account
    Receiver,
    /// Shopper enters a verification code
    CodeVerification,
}

impl Default for SourceFlow {
    fn default() -> Self {
        SourceFlow::None
    }
}

/// Redirect details of a source with `flow = redirect`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectInfo {
    /// Where the shopper authenticates
    #[serde(rename = "url", alias = "redirect_url")]
    pub redirect_url: String,

    /// Where the provider sends the shopper back
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,

    /// Provider-side redirect status (pending, succeeded, failed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Shopper details attached to a source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceOwner {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

/// A tokenized payment source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSource {
    /// Provider source ID (src_...)
    pub id: String,

    /// Declared source type (card, sofort, ideal, ...)
    #[serde(rename = "type")]
    pub source_type: String,

    /// Lifecycle state
    #[serde(rename = "status", alias = "state", default)]
    pub state: SourceState,

    /// Amount in smallest currency unit (absent for reusable sources)
    #[serde(default)]
    pub amount: Option<i64>,

    /// Currency
    pub currency: Currency,

    /// Authentication flow
    #[serde(default)]
    pub flow: SourceFlow,

    /// Redirect details (flow = redirect)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<RedirectInfo>,

    /// Secret allowing the client to retrieve the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Shopper details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<SourceOwner>,

    /// Custom metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl PaymentSource {
    /// Create a source with the fields every source carries
    pub fn new(
        id: impl Into<String>,
        source_type: impl Into<String>,
        state: SourceState,
        amount: Option<i64>,
        currency: Currency,
    ) -> Self {
        Self {
            id: id.into(),
            source_type: source_type.into(),
            state,
            amount,
            currency,
            flow: SourceFlow::None,
            redirect: None,
            client_secret: None,
            owner: None,
            metadata: HashMap::new(),
        }
    }

    /// Builder: mark as a redirect-flow source
    pub fn with_redirect(mut self, url: impl Into<String>) -> Self {
        self.flow = SourceFlow::Redirect;
        self.redirect = Some(RedirectInfo {
            redirect_url: url.into(),
            return_url: None,
            status: None,
        });
        self
    }

    /// Builder: set client secret
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Amount as money, if the source carries one
    pub fn money(&self) -> Option<Money> {
        self.amount.map(|value| Money::new(value, self.currency))
    }

    /// True when the shopper still has to visit the redirect URL
    pub fn needs_redirect(&self) -> bool {
        self.flow == SourceFlow::Redirect && self.redirect.is_some()
    }

    /// The URL the shopper is sent to, for redirect flows
    pub fn redirect_url(&self) -> Option<&str> {
        self.redirect.as_ref().map(|r| r.redirect_url.as_str())
    }

    /// Copy of this source with a refreshed state
    pub fn with_state(&self, state: SourceState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }
}

/// Single-use vs reusable sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceUsage {
    SingleUse,
    Reusable,
}

/// Payload handed to the tokenizer to create a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRequest {
    /// Source type to create
    #[serde(rename = "type")]
    pub source_type: String,

    /// Amount in smallest currency unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,

    pub currency: Currency,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<SourceOwner>,

    /// Return URL for redirect flows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<SourceUsage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement_descriptor: Option<String>,

    /// Method-specific fields nested under the source type (e.g. `sofort[country]`)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub type_fields: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl SourceRequest {
    /// Create an empty request for a source type
    pub fn new(source_type: impl Into<String>, currency: Currency) -> Self {
        Self {
            source_type: source_type.into(),
            amount: None,
            currency,
            owner: None,
            return_url: None,
            usage: None,
            statement_descriptor: None,
            type_fields: HashMap::new(),
            metadata: HashMap::new(),
        }
    }

    /// Build a request priced and addressed from the current cart
    pub fn from_cart(source_type: impl Into<String>, cart: &CartData) -> Self {
        let total = cart.order_total();
        let billing = cart.billing_address.clone();
        let owner = SourceOwner {
            name: billing.as_ref().and_then(|a| a.full_name()),
            email: billing.as_ref().and_then(|a| a.email.clone()),
            phone: billing.as_ref().and_then(|a| a.phone.clone()),
            address: billing,
        };

        let mut request = Self::new(source_type, total.currency);
        request.amount = Some(total.value);
        request.owner = Some(owner);
        if cart.requires_recurring {
            request.usage = Some(SourceUsage::Reusable);
        }
        request
    }

    /// Builder: set return URL
    pub fn with_return_url(mut self, url: impl Into<String>) -> Self {
        self.return_url = Some(url.into());
        self
    }

    /// Builder: add a method-specific field
    pub fn with_type_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.type_fields.insert(key.into(), value.into());
        self
    }

    /// Builder: add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
