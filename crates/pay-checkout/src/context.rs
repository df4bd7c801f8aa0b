//! # Checkout Context
//!
//! One [`CheckoutContext`] exists per checkout session. It bundles the
//! collaborators, the configuration, the persisted selection and the
//! redirect coordinator, and is handed to every payment method unit,
//! the registry, the router and the validator.
//!
//! Collaborators that a headless host (a CLI, a server-side probe) cannot
//! provide default to the `Headless*` implementations below, which log and
//! refuse interactive work.

use crate::redirect::RedirectCoordinator;
use crate::routing::PageKind;
use async_trait::async_trait;
use pay_core::{
    CaptureElement, CheckoutConfig, CheckoutEvent, ElementFactory, EventKind, EventSink,
    Navigator, OverlayId, OverlaySpec, PaymentError, PaymentRequestData, PaymentResult,
    PopupWindow, Presenter, RedirectSurface, SelectionStore, SharedCommerce, SharedElements,
    SharedNavigator, SharedPresenter, SharedSink, SharedSurface, SharedTokenizer, WalletRequest,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Everything a checkout session needs
pub struct CheckoutContext {
    pub config: CheckoutConfig,
    pub page: PageKind,
    pub commerce: SharedCommerce,
    pub tokenizer: SharedTokenizer,
    pub elements: SharedElements,
    pub presenter: SharedPresenter,
    pub navigator: SharedNavigator,
    pub sink: SharedSink,
    pub selection: SelectionStore,
    pub redirects: RedirectCoordinator,
}

impl CheckoutContext {
    pub fn builder(
        config: CheckoutConfig,
        commerce: SharedCommerce,
        tokenizer: SharedTokenizer,
    ) -> CheckoutContextBuilder {
        CheckoutContextBuilder::new(config, commerce, tokenizer)
    }

    /// Log an event through the sink
    pub fn emit(&self, event: CheckoutEvent) {
        self.sink.emit(event);
    }
}

impl std::fmt::Debug for CheckoutContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutContext")
            .field("page", &self.page)
            .field("methods", &self.config.methods.len())
            .field("selection", &self.selection)
            .finish_non_exhaustive()
    }
}

/// Builder for [`CheckoutContext`]
pub struct CheckoutContextBuilder {
    config: CheckoutConfig,
    page: PageKind,
    commerce: SharedCommerce,
    tokenizer: SharedTokenizer,
    elements: Option<SharedElements>,
    presenter: Option<SharedPresenter>,
    navigator: Option<SharedNavigator>,
    surface: Option<SharedSurface>,
    sink: Option<SharedSink>,
    selection: Option<SelectionStore>,
}

impl CheckoutContextBuilder {
    pub fn new(config: CheckoutConfig, commerce: SharedCommerce, tokenizer: SharedTokenizer) -> Self {
        Self {
            config,
            page: PageKind::default(),
            commerce,
            tokenizer,
            elements: None,
            presenter: None,
            navigator: None,
            surface: None,
            sink: None,
            selection: None,
        }
    }

    pub fn with_page(mut self, page: PageKind) -> Self {
        self.page = page;
        self
    }

    pub fn with_elements(mut self, elements: SharedElements) -> Self {
        self.elements = Some(elements);
        self
    }

    pub fn with_presenter(mut self, presenter: SharedPresenter) -> Self {
        self.presenter = Some(presenter);
        self
    }

    pub fn with_navigator(mut self, navigator: SharedNavigator) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn with_surface(mut self, surface: SharedSurface) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_selection(mut self, selection: SelectionStore) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn build(self) -> CheckoutContext {
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingEventSink));
        let surface = self.surface.unwrap_or_else(|| Arc::new(HeadlessSurface));
        let redirects = RedirectCoordinator::new(
            self.config.redirect.clone(),
            Arc::clone(&self.tokenizer),
            surface,
            Arc::clone(&sink),
        );

        CheckoutContext {
            config: self.config,
            page: self.page,
            commerce: self.commerce,
            tokenizer: self.tokenizer,
            elements: self.elements.unwrap_or_else(|| Arc::new(HeadlessElements)),
            presenter: self.presenter.unwrap_or_else(|| Arc::new(HeadlessPresenter)),
            navigator: self.navigator.unwrap_or_else(|| Arc::new(HeadlessNavigator)),
            sink,
            selection: self.selection.unwrap_or_else(SelectionStore::in_memory),
            redirects,
        }
    }
}

/// Event sink that forwards to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: CheckoutEvent) {
        let payload = serde_json::to_string(&event).unwrap_or_default();
        match event.kind {
            Some(EventKind::Error) => error!(
                target: "checkout::events",
                id = %event.id,
                api = %event.api,
                method = %event.method,
                "{}",
                payload
            ),
            Some(EventKind::Redirect) => info!(
                target: "checkout::events",
                id = %event.id,
                api = %event.api,
                method = %event.method,
                "{}",
                payload
            ),
            _ => debug!(
                target: "checkout::events",
                id = %event.id,
                api = %event.api,
                method = %event.method,
                "{}",
                payload
            ),
        }
    }
}

/// Presenter without a page
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessPresenter;

impl Presenter for HeadlessPresenter {
    fn set_loading(&self, loading: bool) {
        debug!(loading, "loading indicator");
    }

    fn show_error(&self, message: &str) {
        info!("checkout error shown: {}", message);
    }

    fn clear_error(&self) {}

    fn set_method_visible(&self, method: &str, visible: bool) {
        debug!(method, visible, "method visibility");
    }

    fn select_method_radio(&self, method: &str) {
        debug!(method, "method radio selected");
    }

    fn submit_form(&self) {
        info!("checkout form submitted");
    }
}

/// Navigator that only records the target
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessNavigator;

impl Navigator for HeadlessNavigator {
    fn navigate(&self, url: &str) {
        info!("navigate to {}", url);
    }
}

/// No capture widgets: every interactive method reports itself unsupported
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessElements;

#[async_trait]
impl ElementFactory for HeadlessElements {
    async fn create_element(
        &self,
        kind: &str,
        _options: Value,
    ) -> PaymentResult<Box<dyn CaptureElement>> {
        Err(PaymentError::Unsupported {
            method: kind.to_string(),
            reason: "no capture widgets in a headless session".to_string(),
        })
    }

    async fn create_dropin(&self, _config: Value) -> PaymentResult<Box<dyn CaptureElement>> {
        Err(PaymentError::Unsupported {
            method: "dropin".to_string(),
            reason: "no capture widgets in a headless session".to_string(),
        })
    }

    async fn payment_request(
        &self,
        _data: PaymentRequestData,
    ) -> PaymentResult<Box<dyn WalletRequest>> {
        Err(PaymentError::Unsupported {
            method: "payment_request".to_string(),
            reason: "no wallet sheet in a headless session".to_string(),
        })
    }
}

/// No windows or overlays: redirects cannot run
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessSurface;

impl RedirectSurface for HeadlessSurface {
    fn show_overlay(&self, method: &str, _spec: OverlaySpec) -> PaymentResult<OverlayId> {
        Err(PaymentError::Redirect(format!(
            "cannot show an overlay for {} in a headless session",
            method
        )))
    }

    fn open_window(&self, url: &str) -> PaymentResult<Box<dyn PopupWindow>> {
        Err(PaymentError::Redirect(format!(
            "cannot open {} in a headless session",
            url
        )))
    }

    fn mount_iframe(&self, _overlay: OverlayId, url: &str) -> PaymentResult<()> {
        Err(PaymentError::Redirect(format!(
            "cannot mount {} in a headless session",
            url
        )))
    }

    fn remove_overlay(&self, _overlay: OverlayId) {}
}
