use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::config::ProviderConfig;

use super::{sign_values, ProviderError};

const PRODUCTION_URL: &str = "https://api.viacash.com/v2/transactions";
const SANDBOX_URL: &str = "https://api-sandbox.viacash.com/v2/transactions";

/// Bounded timeout for every provider call; none of the operations are
/// cancellable once issued, so this is the only abort mechanism.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlipType {
    Payment,
    Refund,
}

impl SlipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlipType::Payment => "payment",
            SlipType::Refund => "refund",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Customer {
    pub email: String,
    /// Provider-side customer key; we use the billing email.
    pub key: String,
    pub language: String,
    pub street_and_no: String,
    pub zipcode: String,
    pub city: String,
    pub country: String,
}

/// One-shot request for creating a payment or refund slip. Built once,
/// sent exactly once; retrying a creation call risks duplicate slips, so
/// retries are a caller policy, never a client one.
#[derive(Debug, Clone)]
pub struct SlipRequest {
    pub slip_type: SlipType,
    /// Original slip a refund references.
    pub for_slip_id: Option<String>,
    /// Signed two-decimal amount string; refunds carry a negated amount.
    pub amount: String,
    pub currency: String,
    pub reference_key: Option<String>,
    /// RFC 3339 expiry timestamp, if the merchant caps slip validity.
    pub expires_at: Option<String>,
    /// Webhook callback URL the provider will POST status events to.
    pub hook_url: Option<String>,
    pub customer: Option<Customer>,
    /// Ordered metadata pairs; carries at least `order_id`.
    pub metadata: Vec<(String, String)>,
}

impl SlipRequest {
    pub fn payment(amount: String, currency: String) -> Self {
        Self {
            slip_type: SlipType::Payment,
            for_slip_id: None,
            amount,
            currency,
            reference_key: None,
            expires_at: None,
            hook_url: None,
            customer: None,
            metadata: Vec::new(),
        }
    }

    pub fn refund(for_slip_id: String, amount: String, currency: String) -> Self {
        Self {
            slip_type: SlipType::Refund,
            for_slip_id: Some(for_slip_id),
            amount,
            currency,
            reference_key: None,
            expires_at: None,
            hook_url: None,
            customer: None,
            metadata: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlipTransaction {
    pub id: String,
    #[serde(default)]
    pub state: Option<String>,
}

/// Provider response to a slip creation. At least one transaction entry is
/// required by the protocol; the first is authoritative for the local
/// transaction id.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionResponse {
    pub id: String,
    pub transactions: Vec<SlipTransaction>,
    #[serde(default)]
    pub checkout_token: Option<String>,
}

impl TransactionResponse {
    /// First transaction entry's id, if any. `create_transaction` rejects
    /// empty responses, but the fields are public and deserializable, so
    /// absence stays representable here.
    pub fn transaction_id(&self) -> Option<&str> {
        self.transactions.first().map(|t| t.id.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: Option<String>,
}

/// Client for the provider's transactions endpoint. Environment (sandbox vs
/// production) is fixed at construction, not per call.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    client: Client,
    shop_id: String,
    payment_key: String,
    base_url: String,
}

impl ProviderClient {
    pub fn new(config: &ProviderConfig) -> Self {
        let base_url = if config.sandbox {
            SANDBOX_URL
        } else {
            PRODUCTION_URL
        };
        Self {
            client: Client::new(),
            shop_id: config.shop_id.clone(),
            payment_key: config.payment_key.clone(),
            base_url: base_url.to_string(),
        }
    }

    /// Override the endpoint; used by tests to point at a local listener.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    /// Flatten a slip request into the canonical ordered parameter list.
    ///
    /// The order here is the signing order: shop id first, then the request
    /// fields, then the payment key. Changing it changes the signature.
    fn params(&self, req: &SlipRequest) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = Vec::new();
        params.push(("shop_id".into(), self.shop_id.clone()));
        params.push(("slip_type".into(), req.slip_type.as_str().into()));
        if let Some(ref for_slip_id) = req.for_slip_id {
            params.push(("for_slip_id".into(), for_slip_id.clone()));
        }
        params.push(("amount".into(), req.amount.clone()));
        params.push(("currency".into(), req.currency.clone()));
        if let Some(ref reference_key) = req.reference_key {
            params.push(("reference_key".into(), reference_key.clone()));
        }
        if let Some(ref expires_at) = req.expires_at {
            params.push(("expires_at".into(), expires_at.clone()));
        }
        if let Some(ref hook_url) = req.hook_url {
            params.push(("hook_url".into(), hook_url.clone()));
        }
        if let Some(ref customer) = req.customer {
            params.push(("customer_email".into(), customer.email.clone()));
            params.push(("customer_key".into(), customer.key.clone()));
            params.push(("customer_language".into(), customer.language.clone()));
            params.push(("address_street_and_no".into(), customer.street_and_no.clone()));
            params.push(("address_zipcode".into(), customer.zipcode.clone()));
            params.push(("address_city".into(), customer.city.clone()));
            params.push(("address_country".into(), customer.country.clone()));
        }
        for (key, value) in &req.metadata {
            params.push((format!("metadata[{}]", key), value.clone()));
        }
        params.push(("payment_key".into(), self.payment_key.clone()));

        let hash = sign_values(params.iter().map(|(_, v)| v.as_str()));
        params.push(("hash".into(), hash));
        params
    }

    /// Create a payment or refund slip. Sends exactly one HTTP call.
    pub async fn create_transaction(
        &self,
        req: &SlipRequest,
    ) -> Result<TransactionResponse, ProviderError> {
        let params = self.params(req);

        let response = self
            .client
            .post(&self.base_url)
            .timeout(REQUEST_TIMEOUT)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ProviderErrorBody>(&body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| format!("HTTP {}: {}", status, body));
            return Err(ProviderError::Api(message));
        }

        let parsed: TransactionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Protocol(format!("undecodable response: {}", e)))?;

        if parsed.transactions.is_empty() {
            return Err(ProviderError::Protocol(
                "response contained no transactions".into(),
            ));
        }

        Ok(parsed)
    }

    /// Issue a refund slip against an existing slip. `amount` must already
    /// carry the refund sign (negative).
    pub async fn refund_transaction(
        &self,
        for_slip_id: &str,
        amount: &str,
        currency: &str,
    ) -> Result<TransactionResponse, ProviderError> {
        let req = SlipRequest::refund(
            for_slip_id.to_string(),
            amount.to_string(),
            currency.to_string(),
        );
        self.create_transaction(&req).await
    }
}
