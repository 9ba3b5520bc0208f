//! Payment gateway client
//!
//! Two layers: [`RequestSigner`] produces the `YcHmacV1` HMAC headers,
//! and [`HttpGatewayClient`] speaks the gateway's JSON API over HTTPS.
//! The [`GatewayClient`] trait is the seam the reconciler depends on,
//! so tests can substitute an in-process stub.
//!
//! The client holds no local state: every call is a plain request and
//! a decoded response, and failures surface as [`Error::Remote`] or
//! [`Error::Transport`] without side effects.

use crate::{
    config::GatewayConfig,
    types::{
        CryptoSettlementForm, Direction, ExchangeRate, PaymentChannel, PaymentCollectionForm,
        PaymentNetwork, PaymentRequestForm, PaymentResponse, ResolvedBankAccount, SettlementInfo,
        StateResponse, SupportedCountry, WebhookForm, WebhookInfo, WebhookUpdateForm,
    },
    Error, Result,
};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{header, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Signs gateway requests with the `YcHmacV1` scheme.
///
/// The signed message is `timestamp \n method \n path`, with
/// `base64(sha256(body))` appended as a fourth line when a body is
/// present. The signature is `base64(hmac_sha256(secret, message))`.
#[derive(Clone)]
pub struct RequestSigner {
    api_key: String,
    api_secret: String,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the secret
        f.debug_struct("RequestSigner")
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

/// Signed headers for one request
#[derive(Debug, Clone)]
pub struct SignedHeaders {
    /// `Authorization: YcHmacV1 {key}:{signature}`
    pub authorization: String,
    /// `X-YC-Timestamp` value the signature covers
    pub timestamp: String,
}

impl RequestSigner {
    /// Create a signer from API credentials
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Sign one request with an explicit timestamp
    pub fn sign_at(
        &self,
        timestamp: &str,
        method: &Method,
        path: &str,
        body: Option<&[u8]>,
    ) -> Result<SignedHeaders> {
        let mut message = format!("{}\n{}\n{}", timestamp, method.as_str(), path);
        if let Some(body) = body {
            let digest = Sha256::digest(body);
            message.push('\n');
            message.push_str(&BASE64.encode(digest));
        }

        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| Error::Signing(e.to_string()))?;
        mac.update(message.as_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());

        Ok(SignedHeaders {
            authorization: format!("YcHmacV1 {}:{}", self.api_key, signature),
            timestamp: timestamp.to_string(),
        })
    }

    /// Sign one request timestamped now
    pub fn sign(&self, method: &Method, path: &str, body: Option<&[u8]>) -> Result<SignedHeaders> {
        let timestamp = Utc::now().to_rfc3339();
        self.sign_at(&timestamp, method, path, body)
    }
}

/// Gateway operations the reconciler depends on
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Countries supported for a money-flow direction
    async fn supported_countries(&self, direction: Direction) -> Result<Vec<SupportedCountry>>;

    /// Payment channels available in a country
    async fn channels(&self, country_code: &str) -> Result<Vec<PaymentChannel>>;

    /// Payment networks available in a country
    async fn networks(&self, country_code: &str) -> Result<Vec<PaymentNetwork>>;

    /// Base exchange rate for a fiat currency
    async fn exchange_rate(&self, currency: &str) -> Result<ExchangeRate>;

    /// Resolve a bank account before payout
    async fn resolve_bank_account(
        &self,
        account_number: &str,
        network_id: &str,
    ) -> Result<ResolvedBankAccount>;

    /// Submit a withdrawal (payment request)
    async fn submit_payment_request(&self, form: &PaymentRequestForm) -> Result<PaymentResponse>;

    /// Fetch a single payment request
    async fn payment_request(&self, id: Uuid) -> Result<PaymentResponse>;

    /// Accept a payment request
    async fn accept_payment_request(&self, id: Uuid) -> Result<StateResponse>;

    /// Deny a payment request
    async fn deny_payment_request(&self, id: Uuid) -> Result<StateResponse>;

    /// Submit a deposit (payment collection)
    async fn submit_payment_collection(
        &self,
        form: &PaymentCollectionForm,
    ) -> Result<PaymentResponse>;

    /// Fetch a single payment collection
    async fn collection(&self, id: Uuid) -> Result<PaymentResponse>;

    /// Accept a collection
    async fn accept_collection(&self, id: Uuid) -> Result<StateResponse>;

    /// Deny a collection
    async fn deny_collection(&self, id: Uuid) -> Result<StateResponse>;

    /// Cancel an accepted collection
    async fn cancel_collection(&self, id: Uuid) -> Result<StateResponse>;

    /// Refund an accepted collection
    async fn refund_collection(&self, id: Uuid) -> Result<StateResponse>;

    /// Create a crypto settlement against the gateway float
    async fn create_settlement(&self, form: &CryptoSettlementForm) -> Result<SettlementInfo>;

    /// Fetch a settlement by its sequence ID
    async fn settlement_by_sequence(&self, sequence_id: &str) -> Result<SettlementInfo>;

    /// Register a webhook
    async fn create_webhook(&self, form: &WebhookForm) -> Result<WebhookInfo>;

    /// Update a webhook
    async fn update_webhook(&self, form: &WebhookUpdateForm) -> Result<WebhookInfo>;

    /// Delete a webhook
    async fn delete_webhook(&self, id: &str) -> Result<WebhookInfo>;
}

/// Error body shape the gateway returns on non-2xx responses
#[derive(Debug, Deserialize)]
struct RemoteErrorBody {
    message: String,
}

/// HTTPS gateway client
#[derive(Debug)]
pub struct HttpGatewayClient {
    http: reqwest::Client,
    base_url: String,
    signer: RequestSigner,
}

impl HttpGatewayClient {
    /// Build a client from gateway configuration
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            signer: RequestSigner::new(config.api_key.clone(), config.api_secret.clone()),
        })
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<T> {
        let signed = self.signer.sign(&method, path, body.as_deref())?;
        let url = format!("{}{}", self.base_url, path);

        let mut request = self
            .http
            .request(method, &url)
            .header(header::AUTHORIZATION, signed.authorization)
            .header("X-YC-Timestamp", signed.timestamp)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response.json::<T>().await?)
        } else {
            Err(remote_error(status, response.text().await.unwrap_or_default()))
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::GET, path, None).await
    }

    async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.request(Method::POST, path, Some(serde_json::to_vec(body)?))
            .await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::POST, path, None).await
    }
}

fn remote_error(status: StatusCode, body: String) -> Error {
    let message = serde_json::from_str::<RemoteErrorBody>(&body)
        .map(|e| e.message)
        .unwrap_or(body);
    Error::Remote {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl GatewayClient for HttpGatewayClient {
    async fn supported_countries(&self, direction: Direction) -> Result<Vec<SupportedCountry>> {
        self.get(&format!("/business/countries?direction={}", direction))
            .await
    }

    async fn channels(&self, country_code: &str) -> Result<Vec<PaymentChannel>> {
        self.get(&format!("/business/channels?country={}", country_code))
            .await
    }

    async fn networks(&self, country_code: &str) -> Result<Vec<PaymentNetwork>> {
        self.get(&format!("/business/networks?country={}", country_code))
            .await
    }

    async fn exchange_rate(&self, currency: &str) -> Result<ExchangeRate> {
        self.get(&format!("/business/rates?currency={}", currency))
            .await
    }

    async fn resolve_bank_account(
        &self,
        account_number: &str,
        network_id: &str,
    ) -> Result<ResolvedBankAccount> {
        self.post(
            "/business/details/bank",
            &serde_json::json!({
                "accountNumber": account_number,
                "networkId": network_id,
            }),
        )
        .await
    }

    async fn submit_payment_request(&self, form: &PaymentRequestForm) -> Result<PaymentResponse> {
        self.post("/business/payments", form).await
    }

    async fn payment_request(&self, id: Uuid) -> Result<PaymentResponse> {
        self.get(&format!("/business/payments/{}", id)).await
    }

    async fn accept_payment_request(&self, id: Uuid) -> Result<StateResponse> {
        self.post_empty(&format!("/business/payments/{}/accept", id))
            .await
    }

    async fn deny_payment_request(&self, id: Uuid) -> Result<StateResponse> {
        self.post_empty(&format!("/business/payments/{}/deny", id))
            .await
    }

    async fn submit_payment_collection(
        &self,
        form: &PaymentCollectionForm,
    ) -> Result<PaymentResponse> {
        self.post("/business/collections", form).await
    }

    async fn collection(&self, id: Uuid) -> Result<PaymentResponse> {
        self.get(&format!("/business/collections/{}", id)).await
    }

    async fn accept_collection(&self, id: Uuid) -> Result<StateResponse> {
        self.post_empty(&format!("/business/collections/{}/accept", id))
            .await
    }

    async fn deny_collection(&self, id: Uuid) -> Result<StateResponse> {
        self.post_empty(&format!("/business/collections/{}/deny", id))
            .await
    }

    async fn cancel_collection(&self, id: Uuid) -> Result<StateResponse> {
        self.post_empty(&format!("/business/collections/{}/cancel", id))
            .await
    }

    async fn refund_collection(&self, id: Uuid) -> Result<StateResponse> {
        self.post_empty(&format!("/business/collections/{}/refund", id))
            .await
    }

    async fn create_settlement(&self, form: &CryptoSettlementForm) -> Result<SettlementInfo> {
        self.post("/business/settlements", form).await
    }

    async fn settlement_by_sequence(&self, sequence_id: &str) -> Result<SettlementInfo> {
        self.get(&format!("/business/settlements/sequence/{}", sequence_id))
            .await
    }

    async fn create_webhook(&self, form: &WebhookForm) -> Result<WebhookInfo> {
        self.post("/business/webhooks", form).await
    }

    async fn update_webhook(&self, form: &WebhookUpdateForm) -> Result<WebhookInfo> {
        self.request(
            Method::PUT,
            &format!("/business/webhooks/{}", form.id),
            Some(serde_json::to_vec(form)?),
        )
        .await
    }

    async fn delete_webhook(&self, id: &str) -> Result<WebhookInfo> {
        self.request(Method::DELETE, &format!("/business/webhooks/{}", id), None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_deterministic() {
        let signer = RequestSigner::new("key", "secret");
        let a = signer
            .sign_at("2024-06-01T00:00:00Z", &Method::POST, "/business/payments", Some(b"{}"))
            .unwrap();
        let b = signer
            .sign_at("2024-06-01T00:00:00Z", &Method::POST, "/business/payments", Some(b"{}"))
            .unwrap();
        assert_eq!(a.authorization, b.authorization);
    }

    #[test]
    fn test_signature_covers_every_input() {
        let signer = RequestSigner::new("key", "secret");
        let base = signer
            .sign_at("2024-06-01T00:00:00Z", &Method::POST, "/business/payments", Some(b"{}"))
            .unwrap();

        let other_ts = signer
            .sign_at("2024-06-01T00:00:01Z", &Method::POST, "/business/payments", Some(b"{}"))
            .unwrap();
        let other_path = signer
            .sign_at("2024-06-01T00:00:00Z", &Method::POST, "/business/collections", Some(b"{}"))
            .unwrap();
        let other_body = signer
            .sign_at("2024-06-01T00:00:00Z", &Method::POST, "/business/payments", Some(b"{ }"))
            .unwrap();

        assert_ne!(base.authorization, other_ts.authorization);
        assert_ne!(base.authorization, other_path.authorization);
        assert_ne!(base.authorization, other_body.authorization);
    }

    #[test]
    fn test_authorization_header_shape() {
        let signer = RequestSigner::new("pub-key", "secret");
        let signed = signer
            .sign_at("2024-06-01T00:00:00Z", &Method::GET, "/business/channels", None)
            .unwrap();
        assert!(signed.authorization.starts_with("YcHmacV1 pub-key:"));
        assert_eq!(signed.timestamp, "2024-06-01T00:00:00Z");
    }

    #[test]
    fn test_remote_error_extracts_message() {
        let err = remote_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"code":"InvalidChannel","message":"Channel is inactive"}"#.to_string(),
        );
        match err {
            Error::Remote { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(message, "Channel is inactive");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_remote_error_falls_back_to_raw_body() {
        let err = remote_error(StatusCode::BAD_GATEWAY, "upstream timeout".to_string());
        match err {
            Error::Remote { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream timeout");
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
