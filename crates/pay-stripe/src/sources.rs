//! # Stripe Sources
//!
//! [`Tokenizer`] over the Stripe Sources API. Sources are created with the
//! publishable key, exactly as the browser SDK does, and refreshed with their
//! client secret while a redirect is pending.

use crate::config::StripeConfig;
use async_trait::async_trait;
use pay_core::{
    Address, ElementHandle, PaymentError, PaymentResult, PaymentSource, SourceRequest,
    SourceState, SourceUsage, Tokenizer,
};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, error, info, instrument, warn};

/// Stripe Sources tokenizer
pub struct StripeSourcesClient {
    config: StripeConfig,
    client: Client,
}

impl StripeSourcesClient {
    /// Create a new client
    pub fn new(config: StripeConfig) -> PaymentResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> PaymentResult<Self> {
        Self::new(StripeConfig::from_env()?)
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    async fn parse(&self, response: Response) -> PaymentResult<PaymentSource> {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(1);
            warn!("Stripe rate limit hit, retry after {}s", retry_after_secs);
            return Err(PaymentError::RateLimited {
                provider: "stripe".to_string(),
                retry_after_secs,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);

            if let Ok(error_response) = serde_json::from_str::<StripeErrorResponse>(&body) {
                return Err(error_response.error.into_payment_error());
            }

            return Err(PaymentError::ProviderError {
                provider: "stripe".to_string(),
                message: format!("HTTP {}: {}", status, body),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            PaymentError::Serialization(format!("Failed to parse Stripe source: {}", e))
        })
    }
}

#[async_trait]
impl Tokenizer for StripeSourcesClient {
    #[instrument(skip(self, element, request), fields(source_type = %request.source_type))]
    async fn create_source(
        &self,
        element: Option<&ElementHandle>,
        request: &SourceRequest,
    ) -> PaymentResult<PaymentSource> {
        let token = element.and_then(|e| e.token.as_deref());
        let form_params = source_form(request, token);

        debug!("Creating Stripe source: {} params", form_params.len());

        let url = format!("{}/v1/sources", self.config.api_base_url);
        let idempotency_key = uuid::Uuid::new_v4().to_string();

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .header("Idempotency-Key", &idempotency_key)
            .form(&form_params)
            .send()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        let source = self.parse(response).await?;

        info!(
            "Created Stripe source: id={}, status={}",
            source.id, source.state
        );

        if source.state == SourceState::Failed {
            return Err(PaymentError::Tokenization {
                message: format!("source {} was refused", source.id),
                code: None,
                state: Some(SourceState::Failed),
            });
        }

        Ok(source)
    }

    #[instrument(skip(self, client_secret))]
    async fn retrieve_source(&self, id: &str, client_secret: &str) -> PaymentResult<PaymentSource> {
        let url = format!("{}/v1/sources/{}", self.config.api_base_url, id);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .query(&[("client_secret", client_secret)])
            .send()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        let source = self.parse(response).await?;
        debug!("Retrieved Stripe source: id={}, status={}", source.id, source.state);
        Ok(source)
    }
}

/// Flatten a source request into Stripe's bracketed form encoding
pub fn source_form(request: &SourceRequest, token: Option<&str>) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = vec![
        ("type".to_string(), request.source_type.clone()),
        ("currency".to_string(), request.currency.as_str().to_string()),
    ];

    if let Some(amount) = request.amount {
        params.push(("amount".to_string(), amount.to_string()));
    }

    if let Some(token) = token {
        params.push(("token".to_string(), token.to_string()));
    }

    if let Some(ref owner) = request.owner {
        let fields = [
            ("name", &owner.name),
            ("email", &owner.email),
            ("phone", &owner.phone),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                params.push((format!("owner[{}]", key), value.clone()));
            }
        }
        if let Some(ref address) = owner.address {
            for (key, value) in address_fields(address) {
                params.push((format!("owner[address][{}]", key), value.to_string()));
            }
        }
    }

    if let Some(ref url) = request.return_url {
        params.push(("redirect[return_url]".to_string(), url.clone()));
    }

    if let Some(usage) = request.usage {
        let usage = match usage {
            SourceUsage::SingleUse => "single_use",
            SourceUsage::Reusable => "reusable",
        };
        params.push(("usage".to_string(), usage.to_string()));
    }

    if let Some(ref descriptor) = request.statement_descriptor {
        params.push(("statement_descriptor".to_string(), descriptor.clone()));
    }

    // sorted so identical requests encode identically
    let type_fields: BTreeMap<_, _> = request.type_fields.iter().collect();
    for (key, value) in type_fields {
        params.push((format!("{}[{}]", request.source_type, key), value.clone()));
    }

    let metadata: BTreeMap<_, _> = request.metadata.iter().collect();
    for (key, value) in metadata {
        params.push((format!("metadata[{}]", key), value.clone()));
    }

    params
}

fn address_fields(address: &Address) -> Vec<(&'static str, &str)> {
    [
        ("line1", &address.line1),
        ("line2", &address.line2),
        ("city", &address.city),
        ("state", &address.state),
        ("postal_code", &address.postal_code),
        ("country", &address.country),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
    .collect()
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    decline_code: Option<String>,
}

impl StripeError {
    /// Card errors mean the provider refused the credential
    fn into_payment_error(self) -> PaymentError {
        let refused = self.error_type.as_deref() == Some("card_error")
            || self.decline_code.is_some();

        PaymentError::Tokenization {
            message: self
                .message
                .unwrap_or_else(|| "Stripe rejected the source".to_string()),
            code: self.decline_code.or(self.code),
            state: refused.then_some(SourceState::Failed),
        }
    }
}
