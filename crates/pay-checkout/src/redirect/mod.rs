//! # Redirect Coordinator
//!
//! Drives the out-of-band completion of redirect-flow sources. Two
//! strategies share one contract:
//!
//! - [`RedirectMode::Popup`]: a new window at the redirect URL, polled by
//!   retrieving the source, plus the cross-window message channel.
//! - [`RedirectMode::Iframe`]: an iframe inside an overlay, message channel only.
//!
//! Completion fires at most once. Messages, poll ticks and close requests
//! can race; the first one to settle the session wins, tears down the
//! overlay, window and hub registration exactly once, and every later
//! trigger is dropped with the session's channel.
//!
//! Cross-window messages arrive through the [`RedirectHub`], keyed by source
//! id. The hub is cloneable so an HTTP relay or a UI close button can post
//! into a session without holding the coordinator.

mod iframe;
mod popup;

use async_trait::async_trait;
use pay_core::{
    CheckoutEvent, EventKind, MethodConfig, OverlayId, PaymentError, PaymentResult,
    PaymentSource, PopupWindow, RedirectConfig, RedirectMode, SharedSink, SharedSurface,
    SharedTokenizer,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Message posted back by the redirect target (`{sourceId, urlParams}`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectMessage {
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub url_params: HashMap<String, String>,
}

impl RedirectMessage {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: Some(source_id.into()),
            url_params: HashMap::new(),
        }
    }

    /// Builder: add a URL parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.url_params.insert(key.into(), value.into());
        self
    }

    /// The `return` parameter, if any
    pub fn return_value(&self) -> Option<&str> {
        self.url_params.get("return").map(|s| s.as_str())
    }

    pub fn is_success(&self) -> bool {
        self.return_value() == Some("success")
    }

    pub fn is_cancel(&self) -> bool {
        matches!(self.return_value(), Some("cancel") | Some("canceled") | Some("cancelled"))
    }

    /// Messages without a source id are accepted by any session
    fn concerns(&self, source_id: &str) -> bool {
        self.source_id.as_deref().map_or(true, |id| id == source_id)
    }
}

/// Anything that can settle a redirect session from outside
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectSignal {
    /// Cross-window message from the redirect target
    Message(RedirectMessage),
    /// Shopper used the overlay's close affordance
    CloseRequested,
    /// Shopper used the "back to cart" affordance
    BackToCart,
}

/// Why a session ended without a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Shopper closed the overlay, the popup or a wallet sheet
    Closed,
    /// Popup closed although the method forbids it
    Abandoned,
    /// Redirect target reported a cancellation
    Declined,
    BackToCart,
    TimedOut,
}

/// How a redirect session ended
#[derive(Debug, Clone, PartialEq)]
pub enum RedirectOutcome {
    /// Completion fired; the source as last retrieved
    Completed(PaymentSource),
    /// Resolved without a source; the caller re-prompts
    Cancelled(CancelReason),
}

/// Routes signals to live sessions, keyed by source id
#[derive(Clone, Default)]
pub struct RedirectHub {
    sessions: Arc<Mutex<HashMap<String, mpsc::UnboundedSender<RedirectSignal>>>>,
}

impl RedirectHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn open(&self, session_id: &str) -> mpsc::UnboundedReceiver<RedirectSignal> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.insert(session_id.to_string(), tx);
        rx
    }

    fn close(&self, session_id: &str) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.remove(session_id);
    }

    /// Post a signal; false when no session is listening
    pub fn deliver(&self, session_id: &str, signal: RedirectSignal) -> bool {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        match sessions.get(session_id) {
            Some(tx) => tx.send(signal).is_ok(),
            None => false,
        }
    }

    /// Post a message to the session named by its `source_id`
    pub fn post_message(&self, message: RedirectMessage) -> bool {
        match message.source_id.clone() {
            Some(id) => self.deliver(&id, RedirectSignal::Message(message)),
            None => false,
        }
    }

    pub fn is_active(&self, session_id: &str) -> bool {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.contains_key(session_id)
    }

    pub fn active_sessions(&self) -> usize {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.len()
    }
}

impl std::fmt::Debug for RedirectHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedirectHub")
            .field("active_sessions", &self.active_sessions())
            .finish()
    }
}

/// What the hooks see once the overlay exists
pub struct RedirectContext<'a> {
    pub session_id: &'a str,
    pub method: &'a MethodConfig,
    pub overlay: OverlayId,
    pub hub: &'a RedirectHub,
}

/// Per-method extension points, run once the overlay is built and before
/// the session starts waiting
#[async_trait]
pub trait RedirectHooks: Send + Sync {
    async fn after_overlay(&self, _ctx: &RedirectContext<'_>) {}

    /// Only called for methods with a "back to cart" affordance
    async fn live_instrument(&self, _ctx: &RedirectContext<'_>) {}
}

/// Hooks that do nothing
pub struct NoHooks;

impl RedirectHooks for NoHooks {}

/// Latches the first completion; every later attempt is refused
#[derive(Debug, Default)]
pub struct CompletionLatch {
    fired: AtomicBool,
}

impl CompletionLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// True for the first caller only
    pub fn try_fire(&self) -> bool {
        !self.fired.swap(true, Ordering::SeqCst)
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

/// Transient state of one coordinator invocation. Dropping it (completion,
/// cancellation or a dropped future) tears everything down exactly once.
pub(crate) struct RedirectSession {
    pub(crate) id: String,
    pub(crate) overlay: Option<OverlayId>,
    pub(crate) window: Option<Box<dyn PopupWindow>>,
    pub(crate) signals: mpsc::UnboundedReceiver<RedirectSignal>,
    latch: CompletionLatch,
    surface: SharedSurface,
    hub: RedirectHub,
    active: Arc<Mutex<Option<String>>>,
}

impl RedirectSession {
    fn teardown(&mut self) {
        if !self.latch.try_fire() {
            return;
        }
        debug!(session = %self.id, "Tearing down redirect session");
        self.hub.close(&self.id);
        self.signals.close();
        if let Some(window) = self.window.take() {
            window.close();
        }
        if let Some(overlay) = self.overlay.take() {
            self.surface.remove_overlay(overlay);
        }
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        *active = None;
    }
}

impl Drop for RedirectSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Runs redirect sessions; at most one at a time
pub struct RedirectCoordinator {
    hub: RedirectHub,
    config: RedirectConfig,
    tokenizer: SharedTokenizer,
    surface: SharedSurface,
    sink: SharedSink,
    active: Arc<Mutex<Option<String>>>,
}

impl RedirectCoordinator {
    pub fn new(
        config: RedirectConfig,
        tokenizer: SharedTokenizer,
        surface: SharedSurface,
        sink: SharedSink,
    ) -> Self {
        Self {
            hub: RedirectHub::new(),
            config,
            tokenizer,
            surface,
            sink,
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Handle for posting signals into sessions
    pub fn hub(&self) -> &RedirectHub {
        &self.hub
    }

    /// Source id of the session in progress
    pub fn active_session(&self) -> Option<String> {
        self.active.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.config.poll_interval_ms.max(1))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.config.timeout_secs.map(Duration::from_secs)
    }

    /// Run the method's redirect strategy until completion or cancellation
    #[instrument(skip(self, method, source, hooks), fields(method = %method.name, source_id = %source.id))]
    pub async fn run(
        &self,
        method: &MethodConfig,
        source: &PaymentSource,
        hooks: &dyn RedirectHooks,
    ) -> PaymentResult<RedirectOutcome> {
        let url = source.redirect_url().ok_or_else(|| {
            PaymentError::Redirect(format!("source {} has no redirect URL", source.id))
        })?;

        let mut session = self.begin(&source.id)?;

        self.sink.emit(
            CheckoutEvent::new(&source.id, "redirect", "open")
                .kind(EventKind::Redirect)
                .payment(&method.name)
                .options(serde_json::json!({ "url": url, "mode": method.redirect })),
        );
        info!("Starting {:?} redirect", method.redirect);

        let outcome = match method.redirect {
            RedirectMode::Popup => popup::run(self, &mut session, method, source, url, hooks).await,
            RedirectMode::Iframe => {
                iframe::run(self, &mut session, method, source, url, hooks).await
            }
        };
        session.teardown();

        match &outcome {
            Ok(RedirectOutcome::Completed(done)) => {
                self.sink.emit(
                    CheckoutEvent::new(&done.id, "redirect", "complete")
                        .kind(EventKind::Response)
                        .payment(&method.name)
                        .response(serde_json::json!({ "status": done.state })),
                );
            }
            Ok(RedirectOutcome::Cancelled(reason)) => {
                info!(?reason, "Redirect cancelled");
            }
            Err(e) => {
                self.sink.emit(
                    CheckoutEvent::new(&source.id, "redirect", "error")
                        .kind(EventKind::Error)
                        .payment(&method.name)
                        .response(serde_json::json!({ "error": e.to_string() })),
                );
            }
        }
        outcome
    }

    fn begin(&self, session_id: &str) -> PaymentResult<RedirectSession> {
        {
            let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(current) = active.as_ref() {
                return Err(PaymentError::Redirect(format!(
                    "redirect session {} already active",
                    current
                )));
            }
            *active = Some(session_id.to_string());
        }

        Ok(RedirectSession {
            id: session_id.to_string(),
            overlay: None,
            window: None,
            signals: self.hub.open(session_id),
            latch: CompletionLatch::new(),
            surface: Arc::clone(&self.surface),
            hub: self.hub.clone(),
            active: Arc::clone(&self.active),
        })
    }

    /// Current state of the source; the source itself when it cannot be retrieved
    pub(crate) async fn refresh(&self, source: &PaymentSource) -> PaymentResult<PaymentSource> {
        let secret = match source.client_secret.as_deref() {
            Some(secret) => secret,
            None => return Ok(source.clone()),
        };

        self.sink.emit(
            CheckoutEvent::new(&source.id, "tokenizer", "retrieveSource")
                .kind(EventKind::Request)
                .options(serde_json::json!({ "type": source.source_type })),
        );
        match self.tokenizer.retrieve_source(&source.id, secret).await {
            Ok(current) => {
                self.sink.emit(
                    CheckoutEvent::new(&current.id, "tokenizer", "retrieveSource")
                        .kind(EventKind::Response)
                        .response(serde_json::json!({ "status": current.state, "type": current.source_type })),
                );
                Ok(current)
            }
            Err(e) => {
                self.sink.emit(
                    CheckoutEvent::new(&source.id, "tokenizer", "retrieveSource")
                        .kind(EventKind::Error)
                        .response(serde_json::json!({ "error": e.to_string() })),
                );
                Err(e)
            }
        }
    }

    /// Refresh for a poll tick; failures only skip the tick
    pub(crate) async fn poll(&self, source: &PaymentSource) -> Option<PaymentSource> {
        match self.refresh(source).await {
            Ok(current) => Some(current),
            Err(e) => {
                warn!("Polling source {} failed: {}", source.id, e);
                None
            }
        }
    }

    pub(crate) fn surface(&self) -> &SharedSurface {
        &self.surface
    }
}

/// Run the hooks once the overlay exists
pub(crate) async fn run_hooks(
    coordinator: &RedirectCoordinator,
    session: &RedirectSession,
    method: &MethodConfig,
    overlay: OverlayId,
    hooks: &dyn RedirectHooks,
) {
    let ctx = RedirectContext {
        session_id: &session.id,
        method,
        overlay,
        hub: &coordinator.hub,
    };
    hooks.after_overlay(&ctx).await;
    if method.back_to_cart {
        hooks.live_instrument(&ctx).await;
    }
}

/// Resolves at the deadline, never when there is none
pub(crate) async fn deadline(timeout: Option<Duration>) {
    match timeout {
        Some(limit) => tokio::time::sleep(limit).await,
        None => std::future::pending::<()>().await,
    }
}

/// Shared handling of a message signal
pub(crate) async fn settle_message(
    coordinator: &RedirectCoordinator,
    source: &PaymentSource,
    message: &RedirectMessage,
) -> Option<PaymentResult<RedirectOutcome>> {
    if !message.concerns(&source.id) {
        debug!("Ignoring message for another source: {:?}", message.source_id);
        return None;
    }
    if message.is_cancel() {
        return Some(Ok(RedirectOutcome::Cancelled(CancelReason::Declined)));
    }
    Some(
        coordinator
            .refresh(source)
            .await
            .map(RedirectOutcome::Completed),
    )
}
