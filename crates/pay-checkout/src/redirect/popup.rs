//! Popup strategy: new window, poll the source, listen for messages.

use super::{
    deadline, run_hooks, settle_message, CancelReason, RedirectCoordinator, RedirectHooks,
    RedirectOutcome, RedirectSession, RedirectSignal,
};
use pay_core::{MethodConfig, OverlaySpec, PaymentResult, PaymentSource};
use tokio::time::MissedTickBehavior;
use tracing::debug;

pub(super) async fn run(
    coordinator: &RedirectCoordinator,
    session: &mut RedirectSession,
    method: &MethodConfig,
    source: &PaymentSource,
    url: &str,
    hooks: &dyn RedirectHooks,
) -> PaymentResult<RedirectOutcome> {
    let surface = coordinator.surface();

    let window = surface.open_window(url)?;
    session.window = Some(window);

    let overlay = surface.show_overlay(
        &method.name,
        OverlaySpec {
            closable: !method.disable_popup_close,
            back_to_cart: method.back_to_cart,
        },
    )?;
    session.overlay = Some(overlay);

    run_hooks(coordinator, session, method, overlay, hooks).await;

    let mut ticker = tokio::time::interval(coordinator.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let timeout = deadline(coordinator.timeout());
    tokio::pin!(timeout);

    loop {
        tokio::select! {
            signal = session.signals.recv() => match signal {
                Some(RedirectSignal::Message(message)) => {
                    if let Some(outcome) = settle_message(coordinator, source, &message).await {
                        return outcome;
                    }
                }
                Some(RedirectSignal::CloseRequested) => {
                    if !method.disable_popup_close {
                        return Ok(RedirectOutcome::Cancelled(CancelReason::Closed));
                    }
                    if let Some(window) = session.window.as_ref() {
                        window.focus();
                    }
                }
                Some(RedirectSignal::BackToCart) => {
                    return Ok(RedirectOutcome::Cancelled(CancelReason::BackToCart));
                }
                None => return Ok(RedirectOutcome::Cancelled(CancelReason::Closed)),
            },
            _ = ticker.tick() => {
                let closed = session.window.as_ref().map_or(true, |w| w.is_closed());
                if closed {
                    if method.disable_popup_close {
                        return Ok(RedirectOutcome::Cancelled(CancelReason::Abandoned));
                    }
                    if method.popup_close_terminates {
                        debug!("Popup closed, completing with current source state");
                        return coordinator.refresh(source).await.map(RedirectOutcome::Completed);
                    }
                }

                if let Some(current) = coordinator.poll(source).await {
                    if current.state.is_terminal() || method.is_ready(current.state) {
                        debug!("Source reached {} while polling", current.state.as_str());
                        return Ok(RedirectOutcome::Completed(current));
                    }
                }
            },
            _ = &mut timeout => {
                return Ok(RedirectOutcome::Cancelled(CancelReason::TimedOut));
            }
        }
    }
}
