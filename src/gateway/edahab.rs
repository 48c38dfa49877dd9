use async_trait::async_trait;
use bigdecimal::BigDecimal;
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::Error as FailsafeError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use super::{
    attempt_reference, circuit_breaker, code_as_string, CircuitBreaker, CreditCapability,
    GatewayError, GatewayMode, Outcome,
};
use crate::config::EdahabCredentials;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransferRequest<'a> {
    api_key: &'a str,
    secret_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    agent_code: Option<&'a str>,
    transaction_type: &'static str,
    recipient: &'a str,
    amount: String,
    currency: &'static str,
    reference: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TransferResponse {
    status_code: Option<serde_json::Value>,
    status_message: Option<String>,
    transaction_id: Option<serde_json::Value>,
}

/// Live credit capability: B2C bundle transfer through Somtel eDahab.
#[derive(Clone)]
pub struct EdahabClient {
    client: Client,
    credentials: EdahabCredentials,
    circuit_breaker: CircuitBreaker,
}

impl EdahabClient {
    pub fn new(credentials: EdahabCredentials, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        EdahabClient {
            client,
            credentials,
            circuit_breaker: circuit_breaker(3, Duration::from_secs(60)),
        }
    }

    pub fn circuit_state(&self) -> String {
        if self.circuit_breaker.is_call_permitted() {
            "closed".to_string()
        } else {
            "open".to_string()
        }
    }

    fn interpret(response: TransferResponse) -> Result<Outcome, GatewayError> {
        let code = response
            .status_code
            .as_ref()
            .and_then(code_as_string)
            .ok_or_else(|| GatewayError::MalformedResponse("missing StatusCode".to_string()))?;

        if code != "0" {
            return Ok(Outcome::declined(
                response
                    .status_message
                    .unwrap_or_else(|| format!("eDahab status code {}", code)),
            ));
        }

        response
            .transaction_id
            .as_ref()
            .and_then(code_as_string)
            .filter(|id| !id.is_empty())
            .map(Outcome::approved)
            .ok_or_else(|| {
                GatewayError::MalformedResponse("successful transfer without TransactionId".to_string())
            })
    }
}

#[async_trait]
impl CreditCapability for EdahabClient {
    async fn credit(
        &self,
        recipient_address: &str,
        amount: &BigDecimal,
    ) -> Result<Outcome, GatewayError> {
        let (api_key, secret_key) = match (
            self.credentials.api_key.as_deref(),
            self.credentials.secret_key.as_deref(),
        ) {
            (Some(k), Some(s)) => (k, s),
            _ => {
                return Err(GatewayError::MissingCredentials(
                    "EDAHAB_API_KEY and EDAHAB_SECRET_KEY are required",
                ))
            }
        };

        let request = TransferRequest {
            api_key,
            secret_key,
            agent_code: self.credentials.agent_code.as_deref(),
            transaction_type: "B2C",
            recipient: recipient_address,
            amount: amount.with_scale(2).to_string(),
            currency: "USD",
            reference: attempt_reference("DISB"),
        };

        info!(reference = %request.reference, "Sending eDahab bundle transfer");

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
                serde_json::from_str::<TransferResponse>(&text)
                    .map_err(|e| GatewayError::MalformedResponse(e.to_string()))
            })
            .await;

        let response = match result {
            Ok(response) => response,
            Err(FailsafeError::Rejected) => {
                return Err(GatewayError::CircuitOpen(
                    "eDahab circuit breaker is open".to_string(),
                ))
            }
            Err(FailsafeError::Inner(e)) => {
                warn!(error = %e, "eDahab transfer failed");
                return Err(e);
            }
        };

        Self::interpret(response)
    }

    fn mode(&self) -> GatewayMode {
        GatewayMode::Live
    }
}
