//! # pay-wasm
//!
//! WebAssembly bindings for lightning-checkout.
//!
//! Exposes the pure source checks to in-browser callers, so a page can
//! re-check a persisted source before it offers a one-click submit:
//! - `validate_source`: source + cart + method config to accepted/rejected
//! - `is_ready_state`: whether a method submits sources in a given state
//! - `resolve_method_name`: which configured method owns a source
//! - `parse_config`: TOML checkout config to a JS object
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { parse_config, validate_source } from 'lightning-checkout-wasm';
//!
//! await init();
//!
//! const config = parse_config(tomlText);
//! const report = validate_source(source, cart, config.methods[0]);
//! if (!report.accepted) console.log(report.message);
//! ```
//!
//! ## Building
//!
//! ```bash
//! wasm-pack build --target web
//! ```

use pay_core::{
    check_source, concrete_source_type, resolve_method, CartData, CheckoutConfig, MethodConfig,
    PaymentSource, Rejection, SourceState, Validation,
};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

/// Outcome of a source check, shaped for JavaScript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub accepted: bool,
    /// Structured reason when rejected (`{reason: "amount_mismatch", ...}`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
    /// Human-readable reason when rejected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Pending funds: accepted, but the money arrives later
    pub pending_funds: bool,
}

impl ValidationReport {
    fn from_validation(validation: Validation, method: &MethodConfig) -> Self {
        match validation {
            Validation::Accepted(source) => Self {
                accepted: true,
                rejection: None,
                message: None,
                pending_funds: source.state == SourceState::Pending
                    && method.accepts_pending_funds(),
            },
            Validation::Rejected(rejection) => Self {
                accepted: false,
                message: Some(rejection.to_string()),
                rejection: Some(rejection),
                pending_funds: false,
            },
        }
    }
}

/// Check a source against a cart for the given method
pub fn check(source: &PaymentSource, cart: &CartData, method: &MethodConfig) -> ValidationReport {
    ValidationReport::from_validation(check_source(source, cart, method), method)
}

/// Name of the configured method owning a source
pub fn owning_method(
    config: &CheckoutConfig,
    source: &PaymentSource,
    created_type: Option<&str>,
) -> Option<String> {
    resolve_method(config, source, created_type).map(|m| m.name.clone())
}

/// Parse a state name the way tokenizer payloads spell it
pub fn parse_state(state: &str) -> SourceState {
    serde_json::from_value(serde_json::Value::String(state.to_ascii_lowercase()))
        .unwrap_or(SourceState::Unknown)
}

// =============================================================================
// JavaScript exports
// =============================================================================

fn from_js<T: for<'de> Deserialize<'de>>(value: JsValue, what: &str) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsValue::from_str(&format!("Invalid {}: {}", what, e)))
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Check a source (`{id, type, status, amount, currency, ...}`) against a
/// cart snapshot for one method config
#[wasm_bindgen]
pub fn validate_source(source: JsValue, cart: JsValue, method: JsValue) -> Result<JsValue, JsValue> {
    let source: PaymentSource = from_js(source, "source")?;
    let cart: CartData = from_js(cart, "cart")?;
    let method: MethodConfig = from_js(method, "method config")?;

    to_js(&check(&source, &cart, &method))
}

/// Whether `method` submits sources in `state`
#[wasm_bindgen]
pub fn is_ready_state(method: JsValue, state: &str) -> Result<bool, JsValue> {
    let method: MethodConfig = from_js(method, "method config")?;
    Ok(method.is_ready(parse_state(state)))
}

/// Name of the method owning a source, preferring the method that created it
#[wasm_bindgen]
pub fn resolve_method_name(
    config: JsValue,
    source: JsValue,
    created_type: Option<String>,
) -> Result<Option<String>, JsValue> {
    let config: CheckoutConfig = from_js(config, "checkout config")?;
    let source: PaymentSource = from_js(source, "source")?;

    Ok(owning_method(&config, &source, created_type.as_deref()))
}

/// Map placeholder source types (`three_d_secure`) to the concrete type
#[wasm_bindgen]
pub fn source_type_of(source_type: &str) -> String {
    concrete_source_type(source_type).to_string()
}

/// Parse a TOML checkout config
#[wasm_bindgen]
pub fn parse_config(toml: &str) -> Result<JsValue, JsValue> {
    let config =
        CheckoutConfig::from_toml(toml).map_err(|e| JsValue::from_str(&e.to_string()))?;
    to_js(&config)
}

/// Log to browser console
#[wasm_bindgen]
pub fn log(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(message));
}

/// Get library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
