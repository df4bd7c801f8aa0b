//! # pay-core
//!
//! Core types and traits for the lightning-checkout orchestrator.
//!
//! This crate provides:
//! - `PaymentSource`, `SourceRequest` and `CartData` snapshots
//! - `MethodConfig`, `MethodCapability` and `CheckoutConfig`
//! - Collaborator ports (`CommerceApi`, `Tokenizer`, `Presenter`, ...)
//! - Pure source checks (`check_source`, `resolve_method`)
//! - Persisted selection state (`SelectionStore` over a `StateStore`)
//! - `PaymentError` for typed error handling
//!
//! It has no async runtime dependency, so it also builds for wasm.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pay_core::{check_source, CartData, Currency, Money, Pricing, Validation};
//!
//! let cart = CartData::new(Pricing::total(Money::new(100, Currency::USD)));
//! let method = config.method_required("creditCard")?;
//!
//! match check_source(&source, &cart, method) {
//!     Validation::Accepted(source) => submit(source),
//!     Validation::Rejected(reason) => back_to_capture(reason),
//! }
//! ```

pub mod cart;
pub mod check;
pub mod error;
pub mod method;
pub mod money;
pub mod ports;
pub mod selection;
pub mod source;

// Re-exports for convenience
pub use cart::{Address, CartData, CartPaymentMethod, OrderSummary, PaymentOption, PaymentSession, Pricing};
pub use check::{check_source, concrete_source_type, resolve_method, Rejection, Validation};
pub use error::{PaymentError, PaymentResult};
pub use method::{
    CheckoutConfig, MethodCapability, MethodConfig, MethodKind, RedirectConfig, RedirectMode,
    Route,
};
pub use money::{Currency, Money};
pub use ports::{
    CaptureElement, CheckoutEvent, CommerceApi, ElementFactory, ElementHandle, EventKind,
    EventSink, FieldStatus, Navigator, OverlayId, OverlaySpec, PaymentRequestData, PopupWindow,
    Presenter, RedirectSurface, SharedCommerce, SharedElements, SharedNavigator, SharedPresenter,
    SharedSink, SharedSurface, SharedTokenizer, Tokenizer, WalletRequest, WalletResponse,
};
pub use selection::{
    FileStateStore, MemoryStateStore, PaymentRecord, SelectionStore, SourceResult, StateStore,
};
pub use source::{
    PaymentSource, RedirectInfo, SourceFlow, SourceOwner, SourceRequest, SourceState, SourceUsage,
};
