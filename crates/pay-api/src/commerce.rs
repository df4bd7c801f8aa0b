//! # Commerce API Client
//!
//! [`CommerceApi`] over the storefront's JSON cart API. Every call is a
//! single request against `COMMERCE_API_URL`; the cart is never cached here.
//!
//! | Operation | Request |
//! |-----------|---------|
//! | get_cart | `GET /cart` |
//! | apply_source_to_cart | `POST /cart/payment-source` |
//! | apply_address_to_cart | `POST /cart/addresses` |
//! | update_cart | `PATCH /cart` |
//! | submit_cart | `POST /cart/submit` |
//! | get_order | `GET /orders/{id}` |
//! | get_payment_options | `GET /payment-options` |
//! | apply_source_to_shopper | `POST /shopper/sources` |
//! | page links | `GET /links/{confirm,thank-you,info,cart}` |

use async_trait::async_trait;
use pay_core::{
    Address, CartData, CommerceApi, OrderSummary, PaymentError, PaymentOption, PaymentResult,
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// HTTP client for the storefront cart API
pub struct HttpCommerceClient {
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct PageLink {
    url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddressUpdate<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    billing_address: Option<&'a Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    shipping_address: Option<&'a Address>,
}

impl HttpCommerceClient {
    pub fn new(base_url: impl Into<String>) -> PaymentResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PaymentError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> PaymentResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Commerce API rate limit hit");
            return Err(PaymentError::RateLimited {
                provider: "commerce".to_string(),
                retry_after_secs: 1,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("Commerce API error: status={}, body={}", status, body);
            return Err(PaymentError::Commerce(format!("HTTP {}: {}", status, body)));
        }

        // endpoints without a payload answer 204 or an empty body
        let body = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(body).map_err(|e| {
            PaymentError::Serialization(format!("Failed to parse commerce response: {}", e))
        })
    }

    async fn link(&self, path: &str) -> PaymentResult<String> {
        let link: PageLink = self.send(self.client.get(self.url(path))).await?;
        Ok(link.url)
    }
}

#[async_trait]
impl CommerceApi for HttpCommerceClient {
    #[instrument(skip(self))]
    async fn get_cart(&self) -> PaymentResult<CartData> {
        self.send(self.client.get(self.url("/cart"))).await
    }

    #[instrument(skip(self))]
    async fn apply_source_to_cart(&self, source_id: &str) -> PaymentResult<CartData> {
        debug!("Applying source {} to cart", source_id);
        let body = json!({ "sourceId": source_id });
        self.send(self.client.post(self.url("/cart/payment-source")).json(&body))
            .await
    }

    #[instrument(skip(self, billing, shipping))]
    async fn apply_address_to_cart(
        &self,
        billing: Option<&Address>,
        shipping: Option<&Address>,
    ) -> PaymentResult<CartData> {
        let body = AddressUpdate {
            billing_address: billing,
            shipping_address: shipping,
        };
        self.send(self.client.post(self.url("/cart/addresses")).json(&body))
            .await
    }

    #[instrument(skip(self, patch))]
    async fn update_cart(&self, patch: Value) -> PaymentResult<CartData> {
        self.send(self.client.patch(self.url("/cart")).json(&patch))
            .await
    }

    #[instrument(skip(self))]
    async fn get_order(&self, order_id: &str) -> PaymentResult<OrderSummary> {
        self.send(self.client.get(self.url(&format!("/orders/{}", order_id))))
            .await
    }

    #[instrument(skip(self))]
    async fn submit_cart(&self) -> PaymentResult<OrderSummary> {
        self.send(self.client.post(self.url("/cart/submit"))).await
    }

    async fn get_confirm_order_page_link(&self) -> PaymentResult<String> {
        self.link("/links/confirm").await
    }

    async fn get_thank_you_page_link(&self, order_id: &str) -> PaymentResult<String> {
        let request = self
            .client
            .get(self.url("/links/thank-you"))
            .query(&[("order", order_id)]);
        let link: PageLink = self.send(request).await?;
        Ok(link.url)
    }

    async fn get_info_page_link(&self) -> PaymentResult<String> {
        self.link("/links/info").await
    }

    async fn get_cart_page_link(&self) -> PaymentResult<String> {
        self.link("/links/cart").await
    }

    #[instrument(skip(self))]
    async fn get_payment_options(&self) -> PaymentResult<Vec<PaymentOption>> {
        self.send(self.client.get(self.url("/payment-options"))).await
    }

    #[instrument(skip(self, nickname))]
    async fn apply_source_to_shopper(&self, source_id: &str, nickname: &str) -> PaymentResult<()> {
        let body = json!({ "sourceId": source_id, "nickname": nickname });
        let _: Value = self
            .send(self.client.post(self.url("/shopper/sources")).json(&body))
            .await?;
        Ok(())
    }
}
