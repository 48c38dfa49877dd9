use anyhow::Context;
use dotenvy::dotenv;
use std::env;
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use crate::gateway::GatewayMode;

pub const DEFAULT_WAAFI_BASE_URL: &str = "https://api.waafipay.net/asm";
pub const DEFAULT_EDAHAB_BASE_URL: &str = "https://edahab.net/api/api/transaction";

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: IpAddr,
    pub server_port: u16,
    pub database_url: String,
    pub migrations_dir: String,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub charge_mode: GatewayMode,
    pub credit_mode: GatewayMode,
    pub provider_timeout: Duration,
    pub simulated_charge_delay: Duration,
    pub simulated_credit_delay: Duration,
    pub waafi: WaafiCredentials,
    pub edahab: EdahabCredentials,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            charge_mode: GatewayMode::Simulated,
            credit_mode: GatewayMode::Simulated,
            provider_timeout: Duration::from_secs(30),
            simulated_charge_delay: Duration::from_millis(1000),
            simulated_credit_delay: Duration::from_millis(500),
            waafi: WaafiCredentials::default(),
            edahab: EdahabCredentials::default(),
        }
    }
}

/// Hormuud WaafiPay merchant credentials (charge side).
#[derive(Clone)]
pub struct WaafiCredentials {
    pub api_user_id: Option<String>,
    pub api_key: Option<String>,
    pub merchant_uid: Option<String>,
    pub base_url: String,
}

impl Default for WaafiCredentials {
    fn default() -> Self {
        Self {
            api_user_id: None,
            api_key: None,
            merchant_uid: None,
            base_url: DEFAULT_WAAFI_BASE_URL.to_string(),
        }
    }
}

impl WaafiCredentials {
    pub fn is_complete(&self) -> bool {
        self.api_user_id.is_some() && self.api_key.is_some() && self.merchant_uid.is_some()
    }
}

impl fmt::Debug for WaafiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaafiCredentials")
            .field("api_user_id", &redacted(&self.api_user_id))
            .field("api_key", &redacted(&self.api_key))
            .field("merchant_uid", &redacted(&self.merchant_uid))
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Somtel eDahab merchant credentials (credit side).
#[derive(Clone)]
pub struct EdahabCredentials {
    pub api_key: Option<String>,
    pub secret_key: Option<String>,
    pub agent_code: Option<String>,
    pub base_url: String,
}

impl Default for EdahabCredentials {
    fn default() -> Self {
        Self {
            api_key: None,
            secret_key: None,
            agent_code: None,
            base_url: DEFAULT_EDAHAB_BASE_URL.to_string(),
        }
    }
}

impl EdahabCredentials {
    /// The agent code is optional for B2C transfers.
    pub fn is_complete(&self) -> bool {
        self.api_key.is_some() && self.secret_key.is_some()
    }
}

impl fmt::Debug for EdahabCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdahabCredentials")
            .field("api_key", &redacted(&self.api_key))
            .field("secret_key", &redacted(&self.secret_key))
            .field("agent_code", &redacted(&self.agent_code))
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn redacted(value: &Option<String>) -> &'static str {
    if value.is_some() {
        "****"
    } else {
        "<unset>"
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        let default_mode: GatewayMode = env::var("GATEWAY_MODE")
            .unwrap_or_else(|_| "simulated".to_string())
            .parse()
            .map_err(anyhow::Error::msg)?;

        let gateway = GatewayConfig {
            charge_mode: parse_mode_override("CHARGE_MODE", default_mode)?,
            credit_mode: parse_mode_override("CREDIT_MODE", default_mode)?,
            provider_timeout: Duration::from_secs(parse_or("PROVIDER_TIMEOUT_SECS", 30)?),
            simulated_charge_delay: Duration::from_millis(parse_or(
                "SIMULATED_CHARGE_DELAY_MS",
                1000,
            )?),
            simulated_credit_delay: Duration::from_millis(parse_or(
                "SIMULATED_CREDIT_DELAY_MS",
                500,
            )?),
            waafi: WaafiCredentials {
                api_user_id: non_empty_var("WAAFI_API_USER_ID"),
                api_key: non_empty_var("WAAFI_API_KEY"),
                merchant_uid: non_empty_var("WAAFI_MERCHANT_UID"),
                base_url: non_empty_var("WAAFI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_WAAFI_BASE_URL.to_string()),
            },
            edahab: EdahabCredentials {
                api_key: non_empty_var("EDAHAB_API_KEY"),
                secret_key: non_empty_var("EDAHAB_SECRET_KEY"),
                agent_code: non_empty_var("EDAHAB_AGENT_CODE"),
                base_url: non_empty_var("EDAHAB_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_EDAHAB_BASE_URL.to_string()),
            },
        };

        Ok(Config {
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string())
                .parse()
                .context("SERVER_HOST must be an IP address")?,
            server_port: parse_or("SERVER_PORT", 5000)?,
            database_url: env::var("DATABASE_URL").context("DATABASE_URL is required")?,
            migrations_dir: env::var("MIGRATIONS_DIR")
                .unwrap_or_else(|_| "./migrations".to_string()),
            cors_allowed_origins: non_empty_var("CORS_ALLOWED_ORIGINS")
                .map(|raw| parse_origins(&raw)),
            gateway,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match non_empty_var(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}

fn parse_mode_override(key: &str, default: GatewayMode) -> anyhow::Result<GatewayMode> {
    match non_empty_var(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e: String| anyhow::anyhow!("{}: {}", key, e)),
        None => Ok(default),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins("http://localhost:5173, https://app.example.com,,"),
            vec!["http://localhost:5173", "https://app.example.com"]
        );
        assert!(parse_origins(" , ").is_empty());
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = WaafiCredentials {
            api_user_id: Some("1000123".to_string()),
            api_key: Some("API-SECRET-KEY".to_string()),
            merchant_uid: None,
            base_url: DEFAULT_WAAFI_BASE_URL.to_string(),
        };

        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("API-SECRET-KEY"));
        assert!(!rendered.contains("1000123"));
        assert!(rendered.contains("<unset>"));
        assert!(!creds.is_complete());
    }

    #[test]
    fn test_edahab_agent_code_is_optional() {
        let creds = EdahabCredentials {
            api_key: Some("k".to_string()),
            secret_key: Some("s".to_string()),
            ..EdahabCredentials::default()
        };
        assert!(creds.is_complete());
        assert!(!EdahabCredentials::default().is_complete());
    }

    #[test]
    fn test_default_gateway_config_is_simulated() {
        let config = GatewayConfig::default();
        assert_eq!(config.charge_mode, GatewayMode::Simulated);
        assert_eq!(config.credit_mode, GatewayMode::Simulated);
        assert_eq!(config.provider_timeout, Duration::from_secs(30));
    }
}
