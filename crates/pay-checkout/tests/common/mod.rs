//! Recording fakes for the checkout collaborators.

#![allow(dead_code)]

use async_trait::async_trait;
use pay_checkout::{CheckoutContext, PageKind};
use pay_core::{
    Address, CaptureElement, CartData, CartPaymentMethod, CheckoutConfig, CheckoutEvent,
    Currency, ElementFactory, ElementHandle, EventKind, EventSink, FieldStatus, Money,
    Navigator, OrderSummary, OverlayId, OverlaySpec, PaymentError, PaymentOption,
    PaymentRequestData, PaymentResult, PaymentSource, PopupWindow, Presenter, Pricing,
    RedirectSurface, SelectionStore, SourceRequest, SourceState, Tokenizer, WalletRequest,
    WalletResponse,
};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn usd(value: i64) -> Money {
    Money::new(value, Currency::USD)
}

pub fn cart(total: i64) -> CartData {
    CartData::new(Pricing::total(usd(total))).with_billing(Address::in_country("US"))
}

// ---- commerce ----

pub struct FakeCommerce {
    cart: Mutex<CartData>,
    calls: Mutex<Vec<String>>,
    acknowledge: AtomicBool,
    options: Mutex<Option<Vec<PaymentOption>>>,
}

impl FakeCommerce {
    pub fn new(cart: CartData) -> Self {
        Self {
            cart: Mutex::new(cart),
            calls: Mutex::new(Vec::new()),
            acknowledge: AtomicBool::new(true),
            options: Mutex::new(Some(Vec::new())),
        }
    }

    /// Cart answers apply requests without a payment method
    pub fn refuse_acknowledgment(&self) {
        self.acknowledge.store(false, Ordering::SeqCst);
    }

    pub fn set_options(&self, options: Vec<PaymentOption>) {
        *self.options.lock().unwrap() = Some(options);
    }

    pub fn fail_options(&self) {
        *self.options.lock().unwrap() = None;
    }

    pub fn set_cart(&self, cart: CartData) {
        *self.cart.lock().unwrap() = cart;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl pay_core::CommerceApi for FakeCommerce {
    async fn get_cart(&self) -> PaymentResult<CartData> {
        self.record("get_cart");
        Ok(self.cart.lock().unwrap().clone())
    }

    async fn apply_source_to_cart(&self, source_id: &str) -> PaymentResult<CartData> {
        self.record(format!("apply_source_to_cart:{}", source_id));
        let mut cart = self.cart.lock().unwrap();
        if self.acknowledge.load(Ordering::SeqCst) {
            cart.payment_method = Some(CartPaymentMethod {
                source_id: source_id.to_string(),
                method: None,
            });
        }
        Ok(cart.clone())
    }

    async fn apply_address_to_cart(
        &self,
        billing: Option<&Address>,
        shipping: Option<&Address>,
    ) -> PaymentResult<CartData> {
        self.record("apply_address_to_cart");
        let mut cart = self.cart.lock().unwrap();
        if let Some(billing) = billing {
            cart.billing_address = Some(billing.clone());
        }
        if let Some(shipping) = shipping {
            cart.shipping_address = Some(shipping.clone());
        }
        Ok(cart.clone())
    }

    async fn update_cart(&self, _patch: Value) -> PaymentResult<CartData> {
        self.record("update_cart");
        Ok(self.cart.lock().unwrap().clone())
    }

    async fn get_order(&self, order_id: &str) -> PaymentResult<OrderSummary> {
        self.record(format!("get_order:{}", order_id));
        Ok(OrderSummary {
            id: order_id.to_string(),
            status: None,
        })
    }

    async fn submit_cart(&self) -> PaymentResult<OrderSummary> {
        self.record("submit_cart");
        Ok(OrderSummary {
            id: "order_1".to_string(),
            status: Some("submitted".to_string()),
        })
    }

    async fn get_confirm_order_page_link(&self) -> PaymentResult<String> {
        self.record("get_confirm_order_page_link");
        Ok("/checkout/confirm".to_string())
    }

    async fn get_thank_you_page_link(&self, order_id: &str) -> PaymentResult<String> {
        self.record(format!("get_thank_you_page_link:{}", order_id));
        Ok(format!("/checkout/thank-you?order={}", order_id))
    }

    async fn get_info_page_link(&self) -> PaymentResult<String> {
        self.record("get_info_page_link");
        Ok("/checkout/info".to_string())
    }

    async fn get_cart_page_link(&self) -> PaymentResult<String> {
        self.record("get_cart_page_link");
        Ok("/cart".to_string())
    }

    async fn get_payment_options(&self) -> PaymentResult<Vec<PaymentOption>> {
        self.record("get_payment_options");
        self.options
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| PaymentError::Commerce("payment options unavailable".to_string()))
    }

    async fn apply_source_to_shopper(&self, source_id: &str, nickname: &str) -> PaymentResult<()> {
        self.record(format!("apply_source_to_shopper:{}:{}", source_id, nickname));
        Ok(())
    }
}

// ---- tokenizer ----

pub struct FakeTokenizer {
    requests: Mutex<Vec<SourceRequest>>,
    handles: Mutex<Vec<Option<ElementHandle>>>,
    next: Mutex<Option<PaymentSource>>,
    failure: Mutex<Option<PaymentError>>,
    retrievals: Mutex<VecDeque<PaymentSource>>,
    retrieve_calls: AtomicUsize,
    counter: AtomicUsize,
}

impl FakeTokenizer {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            handles: Mutex::new(Vec::new()),
            next: Mutex::new(None),
            failure: Mutex::new(None),
            retrievals: Mutex::new(VecDeque::new()),
            retrieve_calls: AtomicUsize::new(0),
            counter: AtomicUsize::new(0),
        }
    }

    /// Every following create returns this source
    pub fn create_returns(&self, source: PaymentSource) {
        *self.next.lock().unwrap() = Some(source);
    }

    /// The next create fails
    pub fn fail_next(&self, error: PaymentError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    /// Retrieve answers in order; the last one repeats
    pub fn retrieve_returns(&self, sources: Vec<PaymentSource>) {
        *self.retrievals.lock().unwrap() = sources.into();
    }

    pub fn requests(&self) -> Vec<SourceRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn handles(&self) -> Vec<Option<ElementHandle>> {
        self.handles.lock().unwrap().clone()
    }

    pub fn create_calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn retrieve_calls(&self) -> usize {
        self.retrieve_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tokenizer for FakeTokenizer {
    async fn create_source(
        &self,
        element: Option<&ElementHandle>,
        request: &SourceRequest,
    ) -> PaymentResult<PaymentSource> {
        self.requests.lock().unwrap().push(request.clone());
        self.handles.lock().unwrap().push(element.cloned());

        if let Some(error) = self.failure.lock().unwrap().take() {
            return Err(error);
        }
        if let Some(source) = self.next.lock().unwrap().clone() {
            return Ok(source);
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PaymentSource::new(
            format!("src_{}", n),
            request.source_type.clone(),
            SourceState::Chargeable,
            request.amount,
            request.currency,
        ))
    }

    async fn retrieve_source(&self, id: &str, _client_secret: &str) -> PaymentResult<PaymentSource> {
        self.retrieve_calls.fetch_add(1, Ordering::SeqCst);
        let mut retrievals = self.retrievals.lock().unwrap();
        let source = if retrievals.len() > 1 {
            retrievals.pop_front()
        } else {
            retrievals.front().cloned()
        };
        source.ok_or_else(|| PaymentError::ProviderError {
            provider: "fake".to_string(),
            message: format!("no such source: {}", id),
        })
    }
}

// ---- widgets ----

pub struct FakeElement {
    kind: String,
    status: Arc<Mutex<FieldStatus>>,
    mounted: Arc<AtomicUsize>,
}

impl CaptureElement for FakeElement {
    fn handle(&self) -> ElementHandle {
        ElementHandle::new(format!("el_{}", self.kind), self.kind.clone())
    }

    fn status(&self) -> FieldStatus {
        *self.status.lock().unwrap()
    }

    fn mount(&self, _target: &str) -> PaymentResult<()> {
        self.mounted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn unmount(&self) {
        self.mounted.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct FakeWallet {
    available: bool,
    dismissed: bool,
    response: WalletResponse,
    aborted: Arc<AtomicBool>,
}

#[async_trait]
impl WalletRequest for FakeWallet {
    async fn can_make_payment(&self) -> bool {
        self.available
    }

    async fn show(&self) -> PaymentResult<Option<WalletResponse>> {
        if self.dismissed {
            return Ok(None);
        }
        Ok(Some(self.response.clone()))
    }

    fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }
}

pub struct FakeElements {
    status: Arc<Mutex<FieldStatus>>,
    mounted: Arc<AtomicUsize>,
    wallet_available: AtomicBool,
    wallet_dismissed: AtomicBool,
    wallet_billing: Mutex<Option<Address>>,
    wallet_aborted: Arc<AtomicBool>,
    dropin_kind: Mutex<String>,
    fail_create: AtomicBool,
}

impl FakeElements {
    pub fn new() -> Self {
        Self {
            status: Arc::new(Mutex::new(FieldStatus::Complete)),
            mounted: Arc::new(AtomicUsize::new(0)),
            wallet_available: AtomicBool::new(true),
            wallet_dismissed: AtomicBool::new(false),
            wallet_billing: Mutex::new(None),
            wallet_aborted: Arc::new(AtomicBool::new(false)),
            dropin_kind: Mutex::new("card".to_string()),
            fail_create: AtomicBool::new(false),
        }
    }

    /// Status every created field reports
    pub fn set_status(&self, status: FieldStatus) {
        *self.status.lock().unwrap() = status;
    }

    pub fn mounted(&self) -> usize {
        self.mounted.load(Ordering::SeqCst)
    }

    pub fn wallet_unavailable(&self) {
        self.wallet_available.store(false, Ordering::SeqCst);
    }

    /// The shopper closes every sheet without approving it
    pub fn dismiss_wallet(&self) {
        self.wallet_dismissed.store(true, Ordering::SeqCst);
    }

    pub fn wallet_billing(&self, address: Address) {
        *self.wallet_billing.lock().unwrap() = Some(address);
    }

    pub fn wallet_aborted(&self) -> bool {
        self.wallet_aborted.load(Ordering::SeqCst)
    }

    pub fn dropin_kind(&self, kind: &str) {
        *self.dropin_kind.lock().unwrap() = kind.to_string();
    }

    /// Creating widgets fails with a non-silent error
    pub fn break_widgets(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }

    fn element(&self, kind: &str) -> PaymentResult<Box<dyn CaptureElement>> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(PaymentError::Internal(format!("widget {} crashed", kind)));
        }
        Ok(Box::new(FakeElement {
            kind: kind.to_string(),
            status: Arc::clone(&self.status),
            mounted: Arc::clone(&self.mounted),
        }))
    }
}

#[async_trait]
impl ElementFactory for FakeElements {
    async fn create_element(
        &self,
        kind: &str,
        _options: Value,
    ) -> PaymentResult<Box<dyn CaptureElement>> {
        self.element(kind)
    }

    async fn create_dropin(&self, _config: Value) -> PaymentResult<Box<dyn CaptureElement>> {
        let kind = self.dropin_kind.lock().unwrap().clone();
        self.element(&kind)
    }

    async fn payment_request(
        &self,
        _data: PaymentRequestData,
    ) -> PaymentResult<Box<dyn WalletRequest>> {
        Ok(Box::new(FakeWallet {
            available: self.wallet_available.load(Ordering::SeqCst),
            dismissed: self.wallet_dismissed.load(Ordering::SeqCst),
            response: WalletResponse {
                element: ElementHandle::new("el_wallet", "card"),
                billing: self.wallet_billing.lock().unwrap().clone(),
                shipping: None,
            },
            aborted: Arc::clone(&self.wallet_aborted),
        }))
    }
}

// ---- page ----

#[derive(Default)]
pub struct RecordingPresenter {
    events: Mutex<Vec<String>>,
}

impl RecordingPresenter {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| e.strip_prefix("error:").map(str::to_string))
            .collect()
    }

    pub fn last_loading(&self) -> Option<bool> {
        self.events().iter().rev().find_map(|e| match e.as_str() {
            "loading:true" => Some(true),
            "loading:false" => Some(false),
            _ => None,
        })
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl Presenter for RecordingPresenter {
    fn set_loading(&self, loading: bool) {
        self.record(format!("loading:{}", loading));
    }

    fn show_error(&self, message: &str) {
        self.record(format!("error:{}", message));
    }

    fn clear_error(&self) {
        self.record("clear_error".to_string());
    }

    fn set_method_visible(&self, method: &str, visible: bool) {
        self.record(format!("visible:{}:{}", method, visible));
    }

    fn select_method_radio(&self, method: &str) {
        self.record(format!("radio:{}", method));
    }

    fn submit_form(&self) {
        self.record("submit_form".to_string());
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    urls: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &str) {
        self.urls.lock().unwrap().push(url.to_string());
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<CheckoutEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<CheckoutEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Events for one collaborator call, in emission order
    pub fn calls(&self, api: &str, method: &str) -> Vec<CheckoutEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.api == api && e.method == method)
            .collect()
    }

    pub fn errors(&self) -> Vec<CheckoutEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind == Some(EventKind::Error))
            .cloned()
            .collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind == Some(kind))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: CheckoutEvent) {
        self.events.lock().unwrap().push(event);
    }
}

// ---- redirect surface ----

pub struct FakeWindow {
    closed: Arc<AtomicBool>,
    closes: Arc<AtomicUsize>,
}

impl PopupWindow for FakeWindow {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn focus(&self) {}

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakeSurface {
    next_overlay: AtomicU64,
    overlays_shown: AtomicUsize,
    overlays_removed: AtomicUsize,
    windows_opened: AtomicUsize,
    iframes: Mutex<Vec<String>>,
    window_closed: Arc<AtomicBool>,
    window_closes: Arc<AtomicUsize>,
    last_spec: Mutex<Option<OverlaySpec>>,
}

impl FakeSurface {
    /// Simulate the shopper closing the popup
    pub fn close_window(&self) {
        self.window_closed.store(true, Ordering::SeqCst);
    }

    pub fn overlays_shown(&self) -> usize {
        self.overlays_shown.load(Ordering::SeqCst)
    }

    pub fn overlays_removed(&self) -> usize {
        self.overlays_removed.load(Ordering::SeqCst)
    }

    pub fn windows_opened(&self) -> usize {
        self.windows_opened.load(Ordering::SeqCst)
    }

    /// Programmatic closes of the popup
    pub fn window_closes(&self) -> usize {
        self.window_closes.load(Ordering::SeqCst)
    }

    pub fn iframes(&self) -> Vec<String> {
        self.iframes.lock().unwrap().clone()
    }

    pub fn last_spec(&self) -> Option<OverlaySpec> {
        *self.last_spec.lock().unwrap()
    }
}

impl RedirectSurface for FakeSurface {
    fn show_overlay(&self, _method: &str, spec: OverlaySpec) -> PaymentResult<OverlayId> {
        self.overlays_shown.fetch_add(1, Ordering::SeqCst);
        *self.last_spec.lock().unwrap() = Some(spec);
        Ok(OverlayId(self.next_overlay.fetch_add(1, Ordering::SeqCst) + 1))
    }

    fn open_window(&self, _url: &str) -> PaymentResult<Box<dyn PopupWindow>> {
        self.windows_opened.fetch_add(1, Ordering::SeqCst);
        self.window_closed.store(false, Ordering::SeqCst);
        Ok(Box::new(FakeWindow {
            closed: Arc::clone(&self.window_closed),
            closes: Arc::clone(&self.window_closes),
        }))
    }

    fn mount_iframe(&self, _overlay: OverlayId, url: &str) -> PaymentResult<()> {
        self.iframes.lock().unwrap().push(url.to_string());
        Ok(())
    }

    fn remove_overlay(&self, _overlay: OverlayId) {
        self.overlays_removed.fetch_add(1, Ordering::SeqCst);
    }
}

// ---- harness ----

pub struct Harness {
    pub ctx: Arc<CheckoutContext>,
    pub commerce: Arc<FakeCommerce>,
    pub tokenizer: Arc<FakeTokenizer>,
    pub elements: Arc<FakeElements>,
    pub presenter: Arc<RecordingPresenter>,
    pub navigator: Arc<RecordingNavigator>,
    pub surface: Arc<FakeSurface>,
    pub sink: Arc<RecordingSink>,
    pub selection: SelectionStore,
}

impl Harness {
    pub fn new(config: CheckoutConfig, cart: CartData) -> Self {
        Self::on_page(config, cart, PageKind::Checkout)
    }

    pub fn on_page(config: CheckoutConfig, cart: CartData, page: PageKind) -> Self {
        Self::with_selection(config, cart, page, SelectionStore::in_memory())
    }

    /// Share a selection store, as a reloaded page would
    pub fn with_selection(
        config: CheckoutConfig,
        cart: CartData,
        page: PageKind,
        selection: SelectionStore,
    ) -> Self {
        let commerce = Arc::new(FakeCommerce::new(cart));
        let tokenizer = Arc::new(FakeTokenizer::new());
        let elements = Arc::new(FakeElements::new());
        let presenter = Arc::new(RecordingPresenter::default());
        let navigator = Arc::new(RecordingNavigator::default());
        let surface = Arc::new(FakeSurface::default());
        let sink = Arc::new(RecordingSink::default());

        let ctx = CheckoutContext::builder(config, commerce.clone(), tokenizer.clone())
            .with_page(page)
            .with_elements(elements.clone())
            .with_presenter(presenter.clone())
            .with_navigator(navigator.clone())
            .with_surface(surface.clone())
            .with_sink(sink.clone())
            .with_selection(selection.clone())
            .build();

        Self {
            ctx: Arc::new(ctx),
            commerce,
            tokenizer,
            elements,
            presenter,
            navigator,
            surface,
            sink,
            selection,
        }
    }
}
