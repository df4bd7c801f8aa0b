//! # Money Types
//!
//! Currency and amount types shared by carts and payment sources.
//! Amounts are always kept in the smallest currency unit.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Supported currencies (ISO 4217)
///
/// Serialized as the lowercase code (`"usd"`); parsing accepts any case, so
/// both cart snapshots (`"USD"`) and provider payloads (`"usd"`) read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Currency {
    USD,
    EUR,
    GBP,
    JPY,
    CAD,
    AUD,
    CHF,
    MXN,
    PLN,
    SEK,
    DKK,
    NOK,
    CNY,
    NZD,
    SGD,
    HKD,
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::USD => "usd",
            Currency::EUR => "eur",
            Currency::GBP => "gbp",
            Currency::JPY => "jpy",
            Currency::CAD => "cad",
            Currency::AUD => "aud",
            Currency::CHF => "chf",
            Currency::MXN => "mxn",
            Currency::PLN => "pln",
            Currency::SEK => "sek",
            Currency::DKK => "dkk",
            Currency::NOK => "nok",
            Currency::CNY => "cny",
            Currency::NZD => "nzd",
            Currency::SGD => "sgd",
            Currency::HKD => "hkd",
        }
    }

    /// Returns the number of decimal places for this currency
    /// (JPY has 0 decimals, most others have 2)
    pub fn decimal_places(&self) -> u8 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }

    /// Convert a decimal amount to the smallest currency unit (cents, etc.)
    pub fn to_smallest_unit(&self, amount: f64) -> i64 {
        let multiplier = 10_f64.powi(self.decimal_places() as i32);
        (amount * multiplier).round() as i64
    }

    /// Convert from smallest unit back to decimal
    pub fn from_smallest_unit(&self, amount: i64) -> f64 {
        let divisor = 10_f64.powi(self.decimal_places() as i32);
        amount as f64 / divisor
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::USD
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let currency = match s.to_ascii_lowercase().as_str() {
            "usd" => Currency::USD,
            "eur" => Currency::EUR,
            "gbp" => Currency::GBP,
            "jpy" => Currency::JPY,
            "cad" => Currency::CAD,
            "aud" => Currency::AUD,
            "chf" => Currency::CHF,
            "mxn" => Currency::MXN,
            "pln" => Currency::PLN,
            "sek" => Currency::SEK,
            "dkk" => Currency::DKK,
            "nok" => Currency::NOK,
            "cny" => Currency::CNY,
            "nzd" => Currency::NZD,
            "sgd" => Currency::SGD,
            "hkd" => Currency::HKD,
            other => return Err(format!("unsupported currency: {}", other)),
        };
        Ok(currency)
    }
}

impl TryFrom<String> for Currency {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.as_str().to_string()
    }
}

/// An amount in the smallest currency unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in smallest currency unit (cents for USD)
    pub value: i64,
    /// Currency
    pub currency: Currency,
}

impl Money {
    /// Create from smallest unit (cents)
    pub fn new(value: i64, currency: Currency) -> Self {
        Self { value, currency }
    }

    /// Create from a decimal amount
    pub fn from_decimal(amount: f64, currency: Currency) -> Self {
        Self {
            value: currency.to_smallest_unit(amount),
            currency,
        }
    }

    /// Get the decimal amount
    pub fn as_decimal(&self) -> f64 {
        self.currency.from_smallest_unit(self.value)
    }

    /// Format for display (e.g., "$10.00")
    pub fn display(&self) -> String {
        let symbol = match self.currency {
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::JPY => "¥",
            Currency::CAD => "C$",
            Currency::AUD => "A$",
            Currency::MXN => "MX$",
            Currency::NZD => "NZ$",
            Currency::SGD => "S$",
            Currency::HKD => "HK$",
            _ => "",
        };
        let amount = if self.currency.decimal_places() == 0 {
            self.value.to_string()
        } else {
            format!("{:.2}", self.as_decimal())
        };
        if symbol.is_empty() {
            format!("{} {}", amount, self.currency)
        } else {
            format!("{}{}", symbol, amount)
        }
    }
}
