//! # Payment Method Configuration
//!
//! Per-method settings and the capability flags computed from them.
//! Methods are loaded from `config/checkout.toml`.

use crate::error::{PaymentError, PaymentResult};
use crate::source::SourceState;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Variant of payment method unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    /// Field-level card widgets
    Card,
    ApplePay,
    GooglePay,
    PayPal,
    /// Bank redirect (sofort, ideal, bancontact, giropay, ...)
    RedirectBank,
    /// Provider-rendered drop-in widget
    Dropin,
    /// No capture UI, source built from cart data alone
    Generic,
}

impl Default for MethodKind {
    fn default() -> Self {
        MethodKind::Generic
    }
}

/// Where the shopper goes after a validated source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    /// Apply, submit the order, go to the thank-you page
    Thankyou,
    /// Apply, go to the order confirmation page
    Confirm,
}

/// Out-of-band completion protocol for redirect sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectMode {
    /// New browser window, polled until the source settles
    Popup,
    /// Iframe inside an overlay, message channel only
    Iframe,
}

impl Default for RedirectMode {
    fn default() -> Self {
        RedirectMode::Popup
    }
}

/// Configuration for a single payment method
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodConfig {
    /// Unique method name (e.g., "creditCard", "sofort")
    pub name: String,

    #[serde(default)]
    pub kind: MethodKind,

    /// Source type the tokenizer creates for this method
    pub source_type: String,

    /// Administratively enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub route: Option<Route>,

    #[serde(default)]
    pub redirect: RedirectMode,

    /// Empty means every currency
    #[serde(default)]
    pub supported_currencies: Vec<String>,

    /// Empty means every billing country
    #[serde(default)]
    pub supported_countries: Vec<String>,

    #[serde(default)]
    pub recurring_payments: bool,

    /// At most one line item when billing is recurring
    #[serde(default)]
    pub single_subscription_for_recurring: bool,

    /// Source amount is only an estimate (skip amount checks)
    #[serde(default)]
    pub amounts_estimated: bool,

    /// States accepted for submission
    #[serde(default = "default_ready_states")]
    pub ready_states: Vec<SourceState>,

    /// Inclusive bounds in smallest currency unit
    #[serde(default)]
    pub min_amount: Option<i64>,
    #[serde(default)]
    pub max_amount: Option<i64>,

    /// Shopper may not close the popup/iframe
    #[serde(default)]
    pub disable_popup_close: bool,

    /// A closed popup ends the redirect session
    #[serde(default = "default_true")]
    pub popup_close_terminates: bool,

    /// Show a "back to cart" affordance in the overlay
    #[serde(default)]
    pub back_to_cart: bool,

    /// Settings that must be present and non-empty for the method to run
    #[serde(default)]
    pub required_settings: Vec<String>,

    /// Method-specific settings (merchant ids, bank country, ...)
    #[serde(default)]
    pub settings: HashMap<String, String>,

    #[serde(default)]
    pub statement_descriptor: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_ready_states() -> Vec<SourceState> {
    vec![SourceState::Chargeable]
}

impl MethodConfig {
    /// Create a method config with required fields
    pub fn new(name: impl Into<String>, kind: MethodKind, source_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            source_type: source_type.into(),
            enabled: true,
            route: None,
            redirect: RedirectMode::Popup,
            supported_currencies: Vec::new(),
            supported_countries: Vec::new(),
            recurring_payments: false,
            single_subscription_for_recurring: false,
            amounts_estimated: false,
            ready_states: default_ready_states(),
            min_amount: None,
            max_amount: None,
            disable_popup_close: false,
            popup_close_terminates: true,
            back_to_cart: false,
            required_settings: Vec::new(),
            settings: HashMap::new(),
            statement_descriptor: None,
        }
    }

    /// Builder: set route
    pub fn with_route(mut self, route: Route) -> Self {
        self.route = Some(route);
        self
    }

    /// Builder: set redirect mode
    pub fn with_redirect(mut self, mode: RedirectMode) -> Self {
        self.redirect = mode;
        self
    }

    /// Builder: restrict currencies
    pub fn with_currencies(mut self, currencies: &[&str]) -> Self {
        self.supported_currencies = currencies.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Builder: restrict billing countries
    pub fn with_countries(mut self, countries: &[&str]) -> Self {
        self.supported_countries = countries.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Builder: allow recurring billing
    pub fn with_recurring(mut self) -> Self {
        self.recurring_payments = true;
        self
    }

    /// Builder: set accepted states
    pub fn with_ready_states(mut self, states: &[SourceState]) -> Self {
        self.ready_states = states.to_vec();
        self
    }

    /// Builder: add a setting
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Is this state accepted for submission
    pub fn is_ready(&self, state: SourceState) -> bool {
        self.ready_states.contains(&state)
    }

    /// Submission will leave funds pending
    pub fn accepts_pending_funds(&self) -> bool {
        self.is_ready(SourceState::Pending)
    }

    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(|s| s.as_str())
    }
}

/// Capability flags of one method, computed once per page load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodCapability {
    pub supported_currency: bool,
    pub supported_geography: bool,
    pub supported_recurring_payments: bool,
    pub supported_settings: bool,
    pub supported_threshold_amount: bool,
}

impl MethodCapability {
    /// Every probe passed
    pub fn qualifies(&self) -> bool {
        self.supported_currency
            && self.supported_geography
            && self.supported_recurring_payments
            && self.supported_settings
            && self.supported_threshold_amount
    }
}

/// Redirect coordinator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectConfig {
    /// Poll cadence for the popup strategy
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Give up after this long (no limit when absent)
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Return URL handed to the tokenizer for redirect sources
    #[serde(default)]
    pub return_url: Option<String>,
}

fn default_poll_interval_ms() -> u64 {
    // roughly one animation frame
    16
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_secs: None,
            return_url: None,
        }
    }
}

/// Whole checkout configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutConfig {
    #[serde(default)]
    pub methods: Vec<MethodConfig>,

    #[serde(default)]
    pub redirect: RedirectConfig,
}

impl CheckoutConfig {
    /// Create an empty config
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a method
    pub fn with_method(mut self, method: MethodConfig) -> Self {
        self.methods.push(method);
        self
    }

    /// Find a method by name
    pub fn method(&self, name: &str) -> Option<&MethodConfig> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Find a method by name, erroring when absent
    pub fn method_required(&self, name: &str) -> PaymentResult<&MethodConfig> {
        self.method(name).ok_or_else(|| PaymentError::UnknownMethod {
            name: name.to_string(),
        })
    }

    /// Methods that create sources of this type, in declaration order
    pub fn methods_for_source_type<'a>(
        &'a self,
        source_type: &'a str,
    ) -> impl Iterator<Item = &'a MethodConfig> + 'a {
        self.methods
            .iter()
            .filter(move |m| m.source_type == source_type)
    }

    /// Load config from TOML string
    pub fn from_toml(toml_str: &str) -> PaymentResult<Self> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| PaymentError::Configuration(e.to_string()))?;
        config.check_unique_names()?;
        Ok(config)
    }

    fn check_unique_names(&self) -> PaymentResult<()> {
        let mut seen = std::collections::HashSet::new();
        for method in &self.methods {
            if !seen.insert(method.name.as_str()) {
                return Err(PaymentError::Configuration(format!(
                    "duplicate payment method: {}",
                    method.name
                )));
            }
        }
        Ok(())
    }
}
