mod common;

use common::{cart, Harness};
use pay_checkout::{
    CancelReason, CheckoutSession, InitPhase, Navigation, PageKind, PaymentMethodUnit, SourceOutcome,
    SourceValidator, SubmitOutcome, UnitEvent, UnitPhase,
};
use pay_core::error::{AUTHORIZATION_FAILED_MESSAGE, GENERIC_ERROR_MESSAGE};
use pay_core::{
    Address, CheckoutConfig, Currency, EventKind, FieldStatus, MethodConfig, MethodKind, PaymentError,
    PaymentRecord, PaymentSource, Rejection, Route, SourceState, Validation,
};
use std::sync::Arc;

fn credit_card() -> MethodConfig {
    MethodConfig::new("creditCard", MethodKind::Card, "card")
}

fn config_with(method: MethodConfig) -> CheckoutConfig {
    CheckoutConfig::new().with_method(method)
}

async fn ready_card_unit(h: &Harness) -> PaymentMethodUnit {
    let unit = PaymentMethodUnit::new(h.ctx.config.methods[0].clone(), Arc::clone(&h.ctx));
    unit.run_phase(InitPhase::Init).await.unwrap();
    unit
}

#[tokio::test]
async fn test_card_source_applied_to_cart_exactly_once() {
    let h = Harness::new(config_with(credit_card()), cart(100));
    let unit = ready_card_unit(&h).await;
    assert_eq!(h.elements.mounted(), 3);

    let outcome = unit.apply_source_id(true).await.unwrap();

    let source = outcome.source().cloned().unwrap();
    assert_eq!(source.amount, Some(100));
    assert_eq!(source.currency, Currency::USD);
    assert!(matches!(outcome, SourceOutcome::Ready { pending_funds: false, .. }));
    assert_eq!(h.commerce.count("apply_source_to_cart"), 1);
    assert_eq!(unit.phase(), UnitPhase::AppliedToCart);

    // tokenized through the card number field
    let handle = h.tokenizer.handles()[0].clone().unwrap();
    assert_eq!(handle.kind, "cardNumber");

    let record = h.selection.payment().unwrap().unwrap();
    assert_eq!(record.name, "creditCard");
    assert_eq!(record.source(), Some(&source));
    assert_eq!(h.selection.created_type().unwrap().as_deref(), Some("creditCard"));
    assert!(h.selection.cart_snapshot().unwrap().is_some());
}

#[tokio::test]
async fn test_amount_mismatch_is_rejected_without_applying() {
    let h = Harness::new(config_with(credit_card()), cart(100));
    h.tokenizer.create_returns(PaymentSource::new(
        "src_90",
        "card",
        SourceState::Chargeable,
        Some(90),
        Currency::USD,
    ));
    let unit = ready_card_unit(&h).await;

    let outcome = unit.apply_source_id(true).await.unwrap();

    assert_eq!(
        outcome,
        SourceOutcome::Rejected(Rejection::AmountMismatch {
            expected: 100,
            actual: Some(90),
        })
    );
    assert_eq!(h.commerce.count("apply_source_to_cart"), 0);
    assert_eq!(unit.phase(), UnitPhase::ElementsReady);
}

#[tokio::test]
async fn test_incomplete_fields_never_reach_the_tokenizer() {
    let h = Harness::new(config_with(credit_card()), cart(100));
    let unit = ready_card_unit(&h).await;
    h.elements.set_status(FieldStatus::Incomplete);

    let outcome = unit.apply_source_id(false).await.unwrap();

    assert_eq!(outcome, SourceOutcome::Rejected(Rejection::IncompleteElements));
    assert_eq!(h.tokenizer.create_calls(), 0);
}

#[tokio::test]
async fn test_ready_source_is_reused() {
    let h = Harness::new(config_with(credit_card()), cart(100));
    let unit = ready_card_unit(&h).await;

    let first = unit.apply_source_id(false).await.unwrap();
    let second = unit.apply_source_id(false).await.unwrap();

    assert_eq!(first.source(), second.source());
    assert_eq!(h.tokenizer.create_calls(), 1);
}

#[tokio::test]
async fn test_stale_source_is_recreated_when_cart_changes() {
    let h = Harness::new(config_with(credit_card()), cart(100));
    let unit = ready_card_unit(&h).await;

    unit.apply_source_id(false).await.unwrap();
    h.commerce.set_cart(cart(120));
    let outcome = unit.apply_source_id(false).await.unwrap();

    assert_eq!(h.tokenizer.create_calls(), 2);
    assert_eq!(outcome.source().unwrap().amount, Some(120));
}

#[tokio::test]
async fn test_failed_tokenization_is_an_authorization_failure() {
    let h = Harness::new(config_with(credit_card()), cart(100));
    h.tokenizer.fail_next(PaymentError::Tokenization {
        message: "card declined".to_string(),
        code: Some("card_declined".to_string()),
        state: Some(SourceState::Failed),
    });
    let unit = ready_card_unit(&h).await;

    let err = unit.apply_source_id(false).await.unwrap_err();

    assert!(matches!(err, PaymentError::AuthorizationFailed(_)));
    assert_eq!(unit.phase(), UnitPhase::SourceFailed);
    assert_eq!(h.sink.errors().len(), 1);
}

#[tokio::test]
async fn test_cancel_event_releases_loading() {
    let h = Harness::new(config_with(credit_card()), cart(100));
    let unit = ready_card_unit(&h).await;

    unit.handle_event(UnitEvent::Cancel);

    assert_eq!(h.presenter.last_loading(), Some(false));
}

#[tokio::test]
async fn test_invalid_field_blur_shows_hint() {
    let h = Harness::new(config_with(credit_card()), cart(100));
    let unit = ready_card_unit(&h).await;
    h.elements.set_status(FieldStatus::Invalid);

    unit.handle_event(UnitEvent::Blur("cardCvc".to_string()));

    assert_eq!(h.presenter.errors(), vec!["Please check the security code field."]);
}

#[tokio::test]
async fn test_destroy_unmounts_and_hides() {
    let h = Harness::new(config_with(credit_card()), cart(100));
    let unit = ready_card_unit(&h).await;
    unit.show();

    unit.destroy().await;

    assert!(!unit.is_shown());
    assert_eq!(unit.phase(), UnitPhase::Hidden);
    assert_eq!(h.elements.mounted(), 0);
}

// ---- routing through the session ----

async fn submit(config: CheckoutConfig, page: PageKind) -> (Harness, SubmitOutcome) {
    let h = Harness::on_page(config, cart(100), page);
    let session = CheckoutSession::new(Arc::clone(&h.ctx));
    session.load().await.unwrap();
    let outcome = session.submit("creditCard").await;
    (h, outcome)
}

#[tokio::test]
async fn test_thankyou_route_submits_order() {
    let (h, outcome) = submit(
        config_with(credit_card().with_route(Route::Thankyou)),
        PageKind::Checkout,
    )
    .await;

    let url = "/checkout/thank-you?order=order_1".to_string();
    assert_eq!(outcome, SubmitOutcome::Navigated(Navigation::Redirected(url.clone())));
    assert_eq!(h.navigator.urls(), vec![url]);
    assert_eq!(h.commerce.count("apply_source_to_cart"), 1);
    assert_eq!(h.commerce.count("submit_cart"), 1);
}

#[tokio::test]
async fn test_confirm_route_does_not_submit() {
    let (h, outcome) = submit(
        config_with(credit_card().with_route(Route::Confirm)),
        PageKind::Checkout,
    )
    .await;

    assert_eq!(
        outcome,
        SubmitOutcome::Navigated(Navigation::Redirected("/checkout/confirm".to_string()))
    );
    assert_eq!(h.commerce.count("apply_source_to_cart"), 1);
    assert_eq!(h.commerce.count("submit_cart"), 0);
}

#[tokio::test]
async fn test_quick_buy_hands_over_to_the_form() {
    let (h, outcome) = submit(config_with(credit_card()), PageKind::QuickBuy).await;

    assert_eq!(outcome, SubmitOutcome::Navigated(Navigation::FormSubmitted));
    let events = h.presenter.events();
    assert!(events.contains(&"radio:creditCard".to_string()));
    assert!(events.contains(&"submit_form".to_string()));
    assert_eq!(h.commerce.count("apply_source_to_cart"), 0);
}

#[tokio::test]
async fn test_multi_page_goes_to_info_page() {
    let (h, outcome) = submit(config_with(credit_card()), PageKind::MultiPage).await;

    assert_eq!(
        outcome,
        SubmitOutcome::Navigated(Navigation::Redirected("/checkout/info".to_string()))
    );
    assert_eq!(h.commerce.count("apply_source_to_cart"), 1);
    assert_eq!(h.commerce.count("submit_cart"), 0);
}

#[tokio::test]
async fn test_checkout_page_submits_form() {
    let (h, outcome) = submit(config_with(credit_card()), PageKind::Checkout).await;

    assert_eq!(outcome, SubmitOutcome::Navigated(Navigation::FormSubmitted));
    assert!(h.navigator.urls().is_empty());
    assert_eq!(h.presenter.last_loading(), Some(false));
}

#[tokio::test]
async fn test_missing_acknowledgment_stops_before_submission() {
    let h = Harness::new(
        config_with(credit_card().with_route(Route::Thankyou)),
        cart(100),
    );
    h.commerce.refuse_acknowledgment();
    let session = CheckoutSession::new(Arc::clone(&h.ctx));
    session.load().await.unwrap();

    let outcome = session.submit("creditCard").await;

    assert_eq!(outcome, SubmitOutcome::Failed(GENERIC_ERROR_MESSAGE.to_string()));
    assert_eq!(h.presenter.errors(), vec![GENERIC_ERROR_MESSAGE]);
    assert_eq!(h.presenter.last_loading(), Some(false));
    assert_eq!(h.commerce.count("submit_cart"), 0);
    assert!(h.navigator.urls().is_empty());
}

#[tokio::test]
async fn test_declined_card_shows_authorization_message() {
    let h = Harness::new(config_with(credit_card()), cart(100));
    h.tokenizer.fail_next(PaymentError::Tokenization {
        message: "declined".to_string(),
        code: None,
        state: Some(SourceState::Failed),
    });
    let session = CheckoutSession::new(Arc::clone(&h.ctx));
    session.load().await.unwrap();

    let outcome = session.submit("creditCard").await;

    assert_eq!(outcome, SubmitOutcome::Failed(AUTHORIZATION_FAILED_MESSAGE.to_string()));
    assert_eq!(h.presenter.errors(), vec![AUTHORIZATION_FAILED_MESSAGE]);
}

#[tokio::test]
async fn test_unsupported_failure_stays_silent() {
    let h = Harness::new(config_with(credit_card()), cart(100));
    h.tokenizer.fail_next(PaymentError::Unsupported {
        method: "creditCard".to_string(),
        reason: "widget gone".to_string(),
    });
    let session = CheckoutSession::new(Arc::clone(&h.ctx));
    session.load().await.unwrap();

    let outcome = session.submit("creditCard").await;

    assert_eq!(outcome, SubmitOutcome::Failed(String::new()));
    assert!(h.presenter.errors().is_empty());
    assert_eq!(h.presenter.last_loading(), Some(false));
}

#[tokio::test]
async fn test_nickname_saves_source_to_shopper() {
    let h = Harness::new(
        config_with(credit_card().with_route(Route::Confirm)),
        cart(100),
    );
    h.selection.set_nickname("work card").unwrap();
    let session = CheckoutSession::new(Arc::clone(&h.ctx));
    session.load().await.unwrap();

    session.submit("creditCard").await;

    assert_eq!(h.commerce.count("apply_source_to_shopper:src_1:work card"), 1);
    assert_eq!(h.selection.nickname().unwrap(), None);
}

#[tokio::test]
async fn test_resume_after_reload_routes_persisted_source() {
    let config = config_with(credit_card().with_route(Route::Thankyou));
    let first = Harness::new(config.clone(), cart(100));
    first
        .selection
        .save_payment(&PaymentRecord::with_source(
            "creditCard",
            PaymentSource::new("src_saved", "card", SourceState::Chargeable, Some(100), Currency::USD),
        ))
        .unwrap();

    let reloaded =
        Harness::with_selection(config, cart(100), PageKind::Checkout, first.selection.clone());
    let session = CheckoutSession::new(Arc::clone(&reloaded.ctx));

    let outcome = session.resume().await;

    assert!(matches!(outcome, SubmitOutcome::Navigated(Navigation::Redirected(_))));
    assert_eq!(reloaded.commerce.count("apply_source_to_cart:src_saved"), 1);
    assert_eq!(reloaded.tokenizer.create_calls(), 0);

    session.complete().await.unwrap();
    assert_eq!(reloaded.selection.payment().unwrap(), None);
}

#[tokio::test]
async fn test_resume_without_selection_is_idle() {
    let h = Harness::new(config_with(credit_card()), cart(100));
    let session = CheckoutSession::new(Arc::clone(&h.ctx));

    assert_eq!(session.resume().await, SubmitOutcome::Idle);
    assert!(h.presenter.events().is_empty());
}

#[tokio::test]
async fn test_submit_unknown_method_shows_generic_error() {
    let h = Harness::new(config_with(credit_card()), cart(100));
    let session = CheckoutSession::new(Arc::clone(&h.ctx));

    let outcome = session.submit("bitcoin").await;

    assert_eq!(outcome, SubmitOutcome::Failed(GENERIC_ERROR_MESSAGE.to_string()));
}

// ---- validation ----

#[tokio::test]
async fn test_validate_without_any_source() {
    let h = Harness::new(config_with(credit_card()), cart(100));

    let validation = SourceValidator::new(&h.ctx)
        .validate_source(None, &cart(100))
        .await
        .unwrap();

    assert_eq!(validation, Validation::Rejected(Rejection::MissingSource));
}

#[tokio::test]
async fn test_validate_refreshes_with_client_secret() {
    let h = Harness::new(config_with(credit_card()), cart(100));
    let stored = PaymentSource::new("src_1", "card", SourceState::Chargeable, Some(100), Currency::USD)
        .with_client_secret("src_1_secret");
    h.tokenizer
        .retrieve_returns(vec![stored.with_state(SourceState::Consumed)]);
    let validator = SourceValidator::new(&h.ctx);

    let first = validator.validate_source(Some(stored.clone()), &cart(100)).await.unwrap();
    let second = validator.validate_source(Some(stored), &cart(100)).await.unwrap();

    assert_eq!(
        first,
        Validation::Rejected(Rejection::NotReady {
            state: SourceState::Consumed
        })
    );
    assert_eq!(first, second);
    assert_eq!(h.tokenizer.retrieve_calls(), 2);
}

#[tokio::test]
async fn test_validate_logs_source_retrieval() {
    let h = Harness::new(config_with(credit_card()), cart(100));
    let stored = PaymentSource::new("src_1", "card", SourceState::Chargeable, Some(100), Currency::USD)
        .with_client_secret("src_1_secret");
    h.tokenizer.retrieve_returns(vec![stored.clone()]);

    let validation = SourceValidator::new(&h.ctx)
        .validate_source(Some(stored), &cart(100))
        .await
        .unwrap();

    assert!(validation.is_accepted());
    let kinds: Vec<_> = h
        .sink
        .calls("tokenizer", "retrieveSource")
        .iter()
        .map(|e| e.kind)
        .collect();
    assert_eq!(kinds, vec![Some(EventKind::Request), Some(EventKind::Response)]);
    assert_eq!(h.sink.calls("tokenizer", "retrieveSource")[1].id, "src_1");
}

#[tokio::test]
async fn test_failed_retrieval_is_logged_as_error() {
    let h = Harness::new(config_with(credit_card()), cart(100));
    let stored = PaymentSource::new("src_1", "card", SourceState::Chargeable, Some(100), Currency::USD)
        .with_client_secret("src_1_secret");

    let result = SourceValidator::new(&h.ctx)
        .validate_source(Some(stored), &cart(100))
        .await;

    assert!(result.is_err());
    let errors = h.sink.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].api, "tokenizer");
    assert_eq!(errors[0].method, "retrieveSource");
}

#[tokio::test]
async fn test_validate_resolves_placeholder_type() {
    let h = Harness::new(config_with(credit_card()), cart(100));
    let source =
        PaymentSource::new("src_3ds", "three_d_secure", SourceState::Chargeable, Some(100), Currency::USD);

    let validation = SourceValidator::new(&h.ctx)
        .validate_source(Some(source), &cart(100))
        .await
        .unwrap();

    assert!(validation.is_accepted());
}

#[tokio::test]
async fn test_created_type_picks_between_shared_source_types() {
    let config = CheckoutConfig::new()
        .with_method(credit_card().with_recurring())
        .with_method(MethodConfig::new("applePay", MethodKind::ApplePay, "card"));
    let h = Harness::new(config, cart(100).recurring());
    let source = PaymentSource::new("src_ap", "card", SourceState::Chargeable, Some(100), Currency::USD);
    let validator = SourceValidator::new(&h.ctx);

    let as_card = validator
        .validate_source(Some(source.clone()), &cart(100).recurring())
        .await
        .unwrap();
    assert!(as_card.is_accepted());

    h.selection.set_created_type("applePay").unwrap();
    let as_wallet = validator
        .validate_source(Some(source), &cart(100).recurring())
        .await
        .unwrap();
    assert_eq!(
        as_wallet,
        Validation::Rejected(Rejection::RecurringUnsupported {
            method: "applePay".to_string()
        })
    );
}

// ---- variants ----

#[tokio::test]
async fn test_wallet_unavailable_hides_quietly() {
    let h = Harness::new(
        config_with(MethodConfig::new("applePay", MethodKind::ApplePay, "card")),
        cart(100),
    );
    h.elements.wallet_unavailable();
    let unit = PaymentMethodUnit::new(h.ctx.config.methods[0].clone(), Arc::clone(&h.ctx));
    unit.show();

    unit.run_phase(InitPhase::Init).await.unwrap();

    assert!(!unit.is_supported());
    assert!(!unit.is_shown());
    assert!(h.presenter.events().contains(&"visible:applePay:false".to_string()));
    assert!(h.presenter.errors().is_empty());
}

#[tokio::test]
async fn test_wallet_addresses_sync_to_cart() {
    let h = Harness::new(
        config_with(MethodConfig::new("googlePay", MethodKind::GooglePay, "card")),
        cart(100),
    );
    let mut billing = Address::in_country("DE");
    billing.first_name = Some("Ada".to_string());
    billing.last_name = Some("Lovelace".to_string());
    h.elements.wallet_billing(billing);
    let unit = PaymentMethodUnit::new(h.ctx.config.methods[0].clone(), Arc::clone(&h.ctx));
    unit.run_phase(InitPhase::Init).await.unwrap();

    let outcome = unit.apply_source_id(false).await.unwrap();

    assert!(outcome.is_ready());
    assert_eq!(h.commerce.count("apply_address_to_cart"), 1);
    let owner = h.tokenizer.requests()[0].owner.clone().unwrap();
    assert_eq!(owner.name.as_deref(), Some("Ada Lovelace"));
    assert_eq!(owner.address.unwrap().country.as_deref(), Some("DE"));

    unit.handle_event(UnitEvent::Cancel);
    assert!(h.elements.wallet_aborted());
}

#[tokio::test]
async fn test_dismissed_wallet_sheet_cancels_quietly() {
    let h = Harness::new(
        config_with(MethodConfig::new("applePay", MethodKind::ApplePay, "card")),
        cart(100),
    );
    h.elements.dismiss_wallet();
    let session = CheckoutSession::new(Arc::clone(&h.ctx));
    session.load().await.unwrap();

    let outcome = session.submit("applePay").await;

    assert_eq!(outcome, SubmitOutcome::Cancelled(CancelReason::Closed));
    assert!(h.presenter.errors().is_empty());
    assert_eq!(h.presenter.last_loading(), Some(false));
    assert!(h.sink.errors().is_empty());
    assert_eq!(h.tokenizer.create_calls(), 0);
    assert_eq!(
        session.registry().get("applePay").unwrap().phase(),
        UnitPhase::ElementsReady
    );
}

#[tokio::test]
async fn test_bank_redirect_request_carries_type_fields() {
    let mut config = config_with(
        MethodConfig::new("sofort", MethodKind::RedirectBank, "sofort")
            .with_setting("type.country", "DE"),
    );
    config.redirect.return_url = Some("https://shop.example/redirect/return".to_string());
    let h = Harness::new(config, cart(100));
    let unit = PaymentMethodUnit::new(h.ctx.config.methods[0].clone(), Arc::clone(&h.ctx));

    unit.apply_source_id(false).await.unwrap();

    let request = &h.tokenizer.requests()[0];
    assert_eq!(request.source_type, "sofort");
    assert_eq!(request.type_fields.get("country").map(String::as_str), Some("DE"));
    assert_eq!(
        request.return_url.as_deref(),
        Some("https://shop.example/redirect/return")
    );
}

#[tokio::test]
async fn test_dropin_source_resolves_to_dropin_method() {
    let h = Harness::new(
        config_with(MethodConfig::new("dropin", MethodKind::Dropin, "dropin")),
        cart(100),
    );
    h.elements.dropin_kind("ideal");
    let unit = PaymentMethodUnit::new(h.ctx.config.methods[0].clone(), Arc::clone(&h.ctx));
    unit.run_phase(InitPhase::Init).await.unwrap();

    let outcome = unit.apply_source_id(false).await.unwrap();

    assert_eq!(outcome.source().unwrap().source_type, "ideal");
    assert!(outcome.is_ready());
}

#[tokio::test]
async fn test_pending_funds_reported_for_methods_accepting_them() {
    let h = Harness::new(
        config_with(
            MethodConfig::new("sepa", MethodKind::Generic, "sepa_debit")
                .with_ready_states(&[SourceState::Chargeable, SourceState::Pending]),
        ),
        cart(100),
    );
    h.tokenizer.create_returns(PaymentSource::new(
        "src_sepa",
        "sepa_debit",
        SourceState::Pending,
        Some(100),
        Currency::USD,
    ));
    let unit = PaymentMethodUnit::new(h.ctx.config.methods[0].clone(), Arc::clone(&h.ctx));

    let outcome = unit.apply_source_id(false).await.unwrap();

    assert!(matches!(outcome, SourceOutcome::Ready { pending_funds: true, .. }));
}
