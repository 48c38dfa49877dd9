use async_trait::async_trait;
use bigdecimal::BigDecimal;
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::Error as FailsafeError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use super::{
    attempt_reference, circuit_breaker, code_as_string, ChargeCapability, CircuitBreaker,
    GatewayError, GatewayMode, Outcome,
};
use crate::config::WaafiCredentials;

/// WaafiPay's "approved" response code.
const APPROVED: &str = "2001";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PurchaseRequest<'a> {
    schema_version: &'static str,
    request_id: String,
    timestamp: String,
    channel_name: &'static str,
    service_name: &'static str,
    service_params: ServiceParams<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ServiceParams<'a> {
    merchant_uid: &'a str,
    api_user_id: &'a str,
    api_key: &'a str,
    payment_method: &'static str,
    payer_info: PayerInfo<'a>,
    transaction_info: TransactionInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PayerInfo<'a> {
    account_no: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionInfo {
    reference_id: String,
    invoice_id: String,
    amount: String,
    currency: &'static str,
    description: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PurchaseResponse {
    response_code: Option<serde_json::Value>,
    response_msg: Option<String>,
    params: Option<PurchaseParams>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PurchaseParams {
    transaction_id: Option<String>,
}

/// Live charge capability against Hormuud WaafiPay's merchant API.
#[derive(Clone)]
pub struct WaafiPayClient {
    client: Client,
    credentials: WaafiCredentials,
    circuit_breaker: CircuitBreaker,
}

impl WaafiPayClient {
    pub fn new(credentials: WaafiCredentials, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        WaafiPayClient {
            client,
            credentials,
            circuit_breaker: circuit_breaker(3, Duration::from_secs(60)),
        }
    }

    /// Returns the current state of the circuit breaker
    pub fn circuit_state(&self) -> String {
        if self.circuit_breaker.is_call_permitted() {
            "closed".to_string()
        } else {
            "open".to_string()
        }
    }

    fn interpret(response: PurchaseResponse) -> Result<Outcome, GatewayError> {
        let code = response
            .response_code
            .as_ref()
            .and_then(code_as_string)
            .ok_or_else(|| GatewayError::MalformedResponse("missing responseCode".to_string()))?;

        if code != APPROVED {
            return Ok(Outcome::declined(
                response
                    .response_msg
                    .unwrap_or_else(|| format!("WaafiPay response code {}", code)),
            ));
        }

        response
            .params
            .and_then(|p| p.transaction_id)
            .filter(|id| !id.trim().is_empty())
            .map(Outcome::approved)
            .ok_or_else(|| {
                GatewayError::MalformedResponse(
                    "approved purchase without params.transactionId".to_string(),
                )
            })
    }
}

#[async_trait]
impl ChargeCapability for WaafiPayClient {
    async fn charge(&self, payer_address: &str, amount: &BigDecimal) -> Result<Outcome, GatewayError> {
        let (merchant_uid, api_user_id, api_key) = match (
            self.credentials.merchant_uid.as_deref(),
            self.credentials.api_user_id.as_deref(),
            self.credentials.api_key.as_deref(),
        ) {
            (Some(m), Some(u), Some(k)) => (m, u, k),
            _ => {
                return Err(GatewayError::MissingCredentials(
                    "WAAFI_MERCHANT_UID, WAAFI_API_USER_ID and WAAFI_API_KEY are required",
                ))
            }
        };

        let request = PurchaseRequest {
            schema_version: "1.0",
            request_id: attempt_reference("REQ"),
            timestamp: chrono::Utc::now().timestamp_millis().to_string(),
            channel_name: "WEB",
            service_name: "API_PURCHASE",
            service_params: ServiceParams {
                merchant_uid,
                api_user_id,
                api_key,
                payment_method: "MWALLET_ACCOUNT",
                payer_info: PayerInfo {
                    account_no: payer_address,
                },
                transaction_info: TransactionInfo {
                    reference_id: attempt_reference("REF"),
                    invoice_id: attempt_reference("INV"),
                    amount: amount.with_scale(2).to_string(),
                    currency: "USD",
                    description: "Data Bundle Purchase",
                },
            },
        };

        info!(
            request_id = %request.request_id,
            reference_id = %request.service_params.transaction_info.reference_id,
            "Sending WaafiPay purchase"
        );

        let body = serde_json::to_value(&request)
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;
        let client = self.client.clone();
        let url = self.credentials.base_url.clone();

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client.post(&url).json(&body).send().await?;

                let status = response.status();
                if !status.is_success() {
                    return Err(GatewayError::UnexpectedStatus(status.as_u16()));
                }

                let text = response.text().await?;
                serde_json::from_str::<PurchaseResponse>(&text)
                    .map_err(|e| GatewayError::MalformedResponse(e.to_string()))
            })
            .await;

        let response = match result {
            Ok(response) => response,
            Err(FailsafeError::Rejected) => {
                return Err(GatewayError::CircuitOpen(
                    "WaafiPay circuit breaker is open".to_string(),
                ))
            }
            Err(FailsafeError::Inner(e)) => {
                warn!(error = %e, "WaafiPay purchase failed");
                return Err(e);
            }
        };

        Self::interpret(response)
    }

    fn mode(&self) -> GatewayMode {
        GatewayMode::Live
    }
}
