//! # Collaborator Ports
//!
//! Traits for everything the orchestrator drives but does not implement:
//! the commerce backend, the tokenization SDK, capture widgets, the page,
//! navigation, redirect surfaces and the logging sink.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     pay-checkout (core)                      │
//! └──────────────────────────────────────────────────────────────┘
//!     │           │            │           │            │
//!  CommerceApi  Tokenizer  ElementFactory  Presenter  RedirectSurface
//!     │           │            │           │            │
//!  ┌──┴─────┐ ┌───┴────┐   ┌───┴───┐   ┌───┴───┐   ┌────┴─────┐
//!  │ HTTP   │ │ Stripe │   │widgets│   │ page  │   │popup/    │
//!  │ cart   │ │Sources │   │       │   │       │   │iframe    │
//!  └────────┘ └────────┘   └───────┘   └───────┘   └──────────┘
//! ```

use crate::cart::{Address, CartData, OrderSummary, PaymentOption};
use crate::error::PaymentResult;
use crate::money::Money;
use crate::source::{PaymentSource, SourceRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Commerce/cart backend
#[async_trait]
pub trait CommerceApi: Send + Sync {
    async fn get_cart(&self) -> PaymentResult<CartData>;

    /// Associate a source with the cart; the returned cart acknowledges it
    /// through `payment_method`.
    async fn apply_source_to_cart(&self, source_id: &str) -> PaymentResult<CartData>;

    async fn apply_address_to_cart(
        &self,
        billing: Option<&Address>,
        shipping: Option<&Address>,
    ) -> PaymentResult<CartData>;

    async fn update_cart(&self, patch: Value) -> PaymentResult<CartData>;

    async fn get_order(&self, order_id: &str) -> PaymentResult<OrderSummary>;

    async fn submit_cart(&self) -> PaymentResult<OrderSummary>;

    async fn get_confirm_order_page_link(&self) -> PaymentResult<String>;

    async fn get_thank_you_page_link(&self, order_id: &str) -> PaymentResult<String>;

    async fn get_info_page_link(&self) -> PaymentResult<String>;

    async fn get_cart_page_link(&self) -> PaymentResult<String>;

    async fn get_payment_options(&self) -> PaymentResult<Vec<PaymentOption>>;

    /// Save the source on the shopper's account under a label
    async fn apply_source_to_shopper(&self, source_id: &str, nickname: &str) -> PaymentResult<()>;
}

/// Opaque reference to a mounted capture widget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    pub id: String,
    pub kind: String,
    /// Token the widget produced, when it tokenizes on its own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl ElementHandle {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            token: None,
        }
    }
}

/// Tokenization SDK
#[async_trait]
pub trait Tokenizer: Send + Sync {
    /// Create a source, optionally from a capture widget
    async fn create_source(
        &self,
        element: Option<&ElementHandle>,
        request: &SourceRequest,
    ) -> PaymentResult<PaymentSource>;

    /// Fetch the current state of a source
    async fn retrieve_source(&self, id: &str, client_secret: &str) -> PaymentResult<PaymentSource>;
}

/// Completeness of a capture field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldStatus {
    Empty,
    Incomplete,
    Complete,
    Invalid,
}

/// A mounted capture widget
pub trait CaptureElement: Send + Sync {
    fn handle(&self) -> ElementHandle;

    fn status(&self) -> FieldStatus;

    fn mount(&self, target: &str) -> PaymentResult<()>;

    fn unmount(&self);
}

/// Data for a wallet payment sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequestData {
    pub country: String,
    pub total: Money,
    pub label: String,
    #[serde(default)]
    pub request_shipping: bool,
}

/// What the shopper approved in a wallet sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletResponse {
    pub element: ElementHandle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping: Option<Address>,
}

/// A wallet payment sheet (Apple Pay, Google Pay)
#[async_trait]
pub trait WalletRequest: Send + Sync {
    /// Whether the platform can present this wallet
    async fn can_make_payment(&self) -> bool;

    /// Present the sheet and wait for approval; `None` when the shopper
    /// dismisses it
    async fn show(&self) -> PaymentResult<Option<WalletResponse>>;

    fn abort(&self);
}

/// Factory for capture widgets
#[async_trait]
pub trait ElementFactory: Send + Sync {
    async fn create_element(&self, kind: &str, options: Value)
        -> PaymentResult<Box<dyn CaptureElement>>;

    async fn create_dropin(&self, config: Value) -> PaymentResult<Box<dyn CaptureElement>>;

    async fn payment_request(&self, data: PaymentRequestData)
        -> PaymentResult<Box<dyn WalletRequest>>;
}

/// Page presentation (loading state, errors, method visibility, form)
pub trait Presenter: Send + Sync {
    fn set_loading(&self, loading: bool);

    fn show_error(&self, message: &str);

    fn clear_error(&self);

    fn set_method_visible(&self, method: &str, visible: bool);

    fn select_method_radio(&self, method: &str);

    fn submit_form(&self);
}

/// Page transitions; nothing runs after a navigation in that document
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str);
}

/// Identifier of a mounted overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayId(pub u64);

/// Overlay options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverlaySpec {
    /// Render an explicit close affordance
    pub closable: bool,
    /// Render a "back to cart" affordance
    pub back_to_cart: bool,
}

/// A popup window opened for a redirect
pub trait PopupWindow: Send + Sync {
    fn is_closed(&self) -> bool;

    fn focus(&self);

    fn close(&self);
}

/// Surfaces a redirect can be shown on
pub trait RedirectSurface: Send + Sync {
    fn show_overlay(&self, method: &str, spec: OverlaySpec) -> PaymentResult<OverlayId>;

    fn open_window(&self, url: &str) -> PaymentResult<Box<dyn PopupWindow>>;

    fn mount_iframe(&self, overlay: OverlayId, url: &str) -> PaymentResult<()>;

    fn remove_overlay(&self, overlay: OverlayId);
}

/// Kind of externally observable operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Request,
    Response,
    Redirect,
    Error,
}

/// Structured log event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutEvent {
    /// Correlation id (source id, session id or method name)
    pub id: String,
    /// Collaborator called (e.g. "tokenizer", "commerce")
    pub api: String,
    /// Operation or payment method
    pub method: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EventKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_body: Option<Value>,
}

impl CheckoutEvent {
    pub fn new(id: impl Into<String>, api: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            api: api.into(),
            method: method.into(),
            kind: None,
            payment: None,
            options: None,
            response_body: None,
        }
    }

    pub fn kind(mut self, kind: EventKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn payment(mut self, payment: impl Into<String>) -> Self {
        self.payment = Some(payment.into());
        self
    }

    pub fn options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }

    pub fn response(mut self, body: Value) -> Self {
        self.response_body = Some(body);
        self
    }
}

/// Fire-and-forget logging sink
pub trait EventSink: Send + Sync {
    fn emit(&self, event: CheckoutEvent);
}

/// Type aliases for shared collaborators (dynamic dispatch)
pub type SharedCommerce = Arc<dyn CommerceApi>;
pub type SharedTokenizer = Arc<dyn Tokenizer>;
pub type SharedElements = Arc<dyn ElementFactory>;
pub type SharedPresenter = Arc<dyn Presenter>;
pub type SharedNavigator = Arc<dyn Navigator>;
pub type SharedSurface = Arc<dyn RedirectSurface>;
pub type SharedSink = Arc<dyn EventSink>;
