//! Iframe strategy: the redirect target lives in an overlay, messages only.

use super::{
    deadline, run_hooks, settle_message, CancelReason, RedirectCoordinator, RedirectHooks,
    RedirectOutcome, RedirectSession, RedirectSignal,
};
use pay_core::{MethodConfig, OverlaySpec, PaymentResult, PaymentSource};
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

    let overlay = surface.show_overlay(
        &method.name,
        OverlaySpec {
            closable: !method.disable_popup_close,
            back_to_cart: method.back_to_cart,
        },
    )?;
    session.overlay = Some(overlay);
    surface.mount_iframe(overlay, url)?;

    run_hooks(coordinator, session, method, overlay, hooks).await;

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
                    if method.disable_popup_close {
                        debug!("Ignoring close request, method keeps the iframe open");
                        continue;
                    }
                    return Ok(RedirectOutcome::Cancelled(CancelReason::Closed));
                }
                Some(RedirectSignal::BackToCart) => {
                    return Ok(RedirectOutcome::Cancelled(CancelReason::BackToCart));
                }
                None => return Ok(RedirectOutcome::Cancelled(CancelReason::Closed)),
            },
            _ = &mut timeout => {
                return Ok(RedirectOutcome::Cancelled(CancelReason::TimedOut));
            }
        }
    }
}
