//! # pay-checkout
//!
//! Client-side payment orchestration for a storefront checkout.
//!
//! This crate provides:
//! - `PaymentMethodUnit` with per-method `MethodBehavior` strategies
//! - `PaymentRegistry` for capability probing and phased initialization
//! - `SourceValidator` for deciding whether a source may be submitted
//! - `RedirectCoordinator` for popup and iframe redirect completion
//! - `RoutingEngine` for what happens after a source is ready
//! - `CheckoutSession` as the guarded entry point for the page
//!
//! ## Flow
//!
//! ```text
//! load ──▶ registry probes + init ──▶ shopper picks a method
//!                                           │
//!                          submit ──▶ apply_source_id
//!                                           │
//!                 create source ──▶ redirect? ──▶ validate
//!                                           │
//!                                   RoutingEngine::route
//!                                           │
//!                     thank-you / confirm / info page / form submit
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use pay_checkout::{load_config, CheckoutContext, CheckoutSession, PageKind};
//!
//! let ctx = CheckoutContext::builder(load_config()?, commerce, tokenizer)
//!     .with_page(PageKind::MultiPage)
//!     .with_presenter(page)
//!     .build();
//! let session = CheckoutSession::new(Arc::new(ctx));
//!
//! session.load().await?;
//! let outcome = session.submit("creditCard").await;
//! ```

pub mod context;
pub mod redirect;
pub mod registry;
pub mod routing;
pub mod session;
pub mod unit;
pub mod validator;

// Re-exports for convenience
pub use context::{
    CheckoutContext, CheckoutContextBuilder, HeadlessElements, HeadlessNavigator,
    HeadlessPresenter, HeadlessSurface, TracingEventSink,
};
pub use redirect::{
    CancelReason, CompletionLatch, NoHooks, RedirectContext, RedirectCoordinator, RedirectHooks,
    RedirectHub, RedirectMessage, RedirectOutcome, RedirectSignal,
};
pub use registry::{InitReport, PaymentRegistry};
pub use routing::{Navigation, PageKind, RoutingEngine};
pub use session::{load_config, CheckoutSession, SubmitOutcome};
pub use unit::{
    behavior_for, InitPhase, MethodBehavior, PaymentMethodUnit, SourceOutcome, UnitContext,
    UnitEvent, UnitPhase,
};
pub use validator::SourceValidator;
