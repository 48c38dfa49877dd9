use anyhow::{Context, Result};
use axum::http::HeaderValue;
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::adapters::PostgresTransactionRepository;
use crate::config::{Config, GatewayConfig};
use crate::gateway::{GatewayMode, ProviderGateway};
use crate::{create_app, db, AppState};

/// Installs the global subscriber. `RUST_LOG` selects levels and `LOG_FORMAT=json`
/// switches to one JSON object per line.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,sqlx=warn".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

pub struct ValidationReport {
    pub environment: bool,
    pub database: bool,
    pub schema: bool,
    pub credentials: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    /// Whether the service may start accepting requests.
    pub fn is_ready(&self) -> bool {
        self.environment && self.database && self.schema
    }

    pub fn is_valid(&self) -> bool {
        self.is_ready() && self.credentials
    }

    pub fn print(&self) {
        println!("\n=== Startup Validation Report ===");
        println!("Environment Variables: {}", status(self.environment));
        println!("Database Connectivity: {}", status(self.database));
        println!("Schema Ready:          {}", status(self.schema));
        println!("Provider Credentials:  {}", status(self.credentials));

        if !self.errors.is_empty() {
            println!("\nErrors:");
            for error in &self.errors {
                println!("  ❌ {}", error);
            }
        }

        println!("\nOverall Status: {}", if self.is_valid() { "✅ PASS" } else { "❌ FAIL" });
        println!("=================================\n");
    }
}

fn status(ok: bool) -> &'static str {
    if ok { "✅ OK" } else { "❌ FAIL" }
}

pub async fn validate_environment(config: &Config, pool: &PgPool) -> ValidationReport {
    let mut report = ValidationReport {
        environment: true,
        database: true,
        schema: true,
        credentials: true,
        errors: Vec::new(),
    };

    if let Err(e) = validate_env_vars(config) {
        report.environment = false;
        report.errors.push(format!("Environment: {}", e));
    }

    match validate_database(pool).await {
        Ok(true) => {}
        Ok(false) => {
            report.schema = false;
            report.errors.push("Schema: transactions table is missing".to_string());
        }
        Err(e) => {
            report.database = false;
            report.schema = false;
            report.errors.push(format!("Database: {:#}", e));
        }
    }

    for problem in credential_problems(&config.gateway) {
        report.credentials = false;
        report.errors.push(format!("Credentials: {}", problem));
    }

    report
}

fn validate_env_vars(config: &Config) -> Result<()> {
    if config.database_url.is_empty() {
        anyhow::bail!("DATABASE_URL is empty");
    }
    if config.server_port == 0 {
        anyhow::bail!("SERVER_PORT must be greater than 0");
    }

    // Base URLs only matter for live capabilities.
    if config.gateway.charge_mode == GatewayMode::Live {
        url::Url::parse(&config.gateway.waafi.base_url)
            .context("WAAFI_BASE_URL is not a valid URL")?;
    }
    if config.gateway.credit_mode == GatewayMode::Live {
        url::Url::parse(&config.gateway.edahab.base_url)
            .context("EDAHAB_BASE_URL is not a valid URL")?;
    }

    Ok(())
}

async fn validate_database(pool: &PgPool) -> Result<bool> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .context("Failed to connect to database")?;

    db::schema_ready(pool)
        .await
        .context("Failed to inspect schema")
}

/// Live capabilities with incomplete credentials. They still start, but every call
/// fails as a transport error until the credentials are supplied.
pub fn credential_problems(gateway: &GatewayConfig) -> Vec<String> {
    let mut problems = Vec::new();
    if gateway.charge_mode == GatewayMode::Live && !gateway.waafi.is_complete() {
        problems.push(
            "live charge needs WAAFI_API_USER_ID, WAAFI_API_KEY and WAAFI_MERCHANT_UID".to_string(),
        );
    }
    if gateway.credit_mode == GatewayMode::Live && !gateway.edahab.is_complete() {
        problems.push("live credit needs EDAHAB_API_KEY and EDAHAB_SECRET_KEY".to_string());
    }
    problems
}

pub fn cors_layer(config: &Config) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match &config.cors_allowed_origins {
        None => base.allow_origin(Any),
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(%origin, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            base.allow_origin(AllowOrigin::list(origins))
        }
    }
}

/// Connects, migrates, confirms the schema, then listens. Requests are never accepted
/// before the store is ready.
pub async fn serve(config: Config) -> Result<()> {
    let pool = db::create_pool(&config)
        .await
        .context("Failed to connect to database")?;

    db::run_migrations(&pool, &config.migrations_dir).await?;

    let report = validate_environment(&config, &pool).await;
    for error in &report.errors {
        tracing::warn!("{}", error);
    }
    if !report.is_ready() {
        anyhow::bail!("store is not ready: {}", report.errors.join("; "));
    }

    let gateway = ProviderGateway::from_config(&config.gateway);
    tracing::info!(
        charge_mode = %gateway.charge_mode(),
        credit_mode = %gateway.credit_mode(),
        "Provider gateway initialized"
    );

    let repository = Arc::new(PostgresTransactionRepository::new(pool));
    let app = create_app(AppState::new(repository, gateway)).layer(cors_layer(&config));

    let addr = SocketAddr::new(config.server_host, config.server_port);
    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install shutdown handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WaafiCredentials;

    #[test]
    fn test_simulated_modes_need_no_credentials() {
        assert!(credential_problems(&GatewayConfig::default()).is_empty());
    }

    #[test]
    fn test_live_modes_report_missing_credentials() {
        let gateway = GatewayConfig {
            charge_mode: GatewayMode::Live,
            credit_mode: GatewayMode::Live,
            ..GatewayConfig::default()
        };
        assert_eq!(credential_problems(&gateway).len(), 2);

        let gateway = GatewayConfig {
            charge_mode: GatewayMode::Live,
            waafi: WaafiCredentials {
                api_user_id: Some("u".to_string()),
                api_key: Some("k".to_string()),
                merchant_uid: Some("m".to_string()),
                ..WaafiCredentials::default()
            },
            ..GatewayConfig::default()
        };
        assert!(credential_problems(&gateway).is_empty());
    }

    fn config_with(gateway: GatewayConfig) -> Config {
        Config {
            server_host: "127.0.0.1".parse().unwrap(),
            server_port: 5000,
            database_url: "postgres://localhost:5432/bridge".to_string(),
            migrations_dir: "./migrations".to_string(),
            cors_allowed_origins: None,
            gateway,
        }
    }

    #[test]
    fn test_validate_env_vars_invalid_provider_url() {
        let mut gateway = GatewayConfig {
            charge_mode: GatewayMode::Live,
            ..GatewayConfig::default()
        };
        gateway.waafi.base_url = "not-a-url".to_string();
        assert!(validate_env_vars(&config_with(gateway)).is_err());

        let mut gateway = GatewayConfig {
            credit_mode: GatewayMode::Live,
            ..GatewayConfig::default()
        };
        gateway.edahab.base_url = "::".to_string();
        assert!(validate_env_vars(&config_with(gateway)).is_err());
    }

    #[test]
    fn test_simulated_capabilities_ignore_provider_urls() {
        let mut gateway = GatewayConfig::default();
        gateway.waafi.base_url = "not-a-url".to_string();
        gateway.edahab.base_url = "also not a url".to_string();

        assert!(validate_env_vars(&config_with(gateway)).is_ok());
    }

    #[test]
    fn test_validate_env_vars_empty_database_url() {
        let config = Config {
            server_host: "127.0.0.1".parse().unwrap(),
            server_port: 5000,
            database_url: String::new(),
            migrations_dir: "./migrations".to_string(),
            cors_allowed_origins: None,
            gateway: GatewayConfig::default(),
        };

        assert!(validate_env_vars(&config).is_err());
    }
}
