use clap::{Parser, Subcommand};
use std::sync::Arc;
use uuid::Uuid;

use crate::adapters::PostgresTransactionRepository;
use crate::config::Config;
use crate::gateway::ProviderGateway;
use crate::handlers::transactions::{TransactionView, MAX_PAGE_SIZE};
use crate::ports::TransactionRepository;
use crate::services::TransactionOrchestrator;
use crate::startup;
use crate::utils::{mask_address, mask_password};

#[derive(Parser)]
#[command(name = "bundle-bridge")]
#[command(about = "Bundle Bridge - mobile money data bundle purchases", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Transaction management commands
    #[command(subcommand)]
    Tx(TxCommands),

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Configuration and readiness validation
    Config,
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// List recorded transactions, newest first
    List {
        /// Maximum number of rows to print (1-500)
        #[arg(short, long, value_parser = clap::value_parser!(i64).range(1..=MAX_PAGE_SIZE))]
        limit: Option<i64>,
    },

    /// Disburse the bundle for a PAID transaction
    Disburse {
        /// Transaction UUID
        #[arg(value_name = "TX_ID")]
        tx_id: Uuid,
    },
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}

pub async fn handle_db_migrate(config: &Config) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(config).await?;

    tracing::info!("Running database migrations...");
    crate::db::run_migrations(&pool, &config.migrations_dir).await?;

    println!("✓ Database migrations completed");
    Ok(())
}

pub async fn handle_config_validate(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");

    println!("Configuration:");
    println!("  Listen Address: {}:{}", config.server_host, config.server_port);
    println!("  Database URL: {}", mask_password(&config.database_url));
    println!("  Charge Mode: {}", config.gateway.charge_mode);
    println!("  Credit Mode: {}", config.gateway.credit_mode);
    println!("  Provider Timeout: {:?}", config.gateway.provider_timeout);
    match &config.cors_allowed_origins {
        Some(origins) => println!("  CORS Origins: {}", origins.join(", ")),
        None => println!("  CORS Origins: *"),
    }

    let pool = crate::db::create_pool(config).await?;
    let report = startup::validate_environment(config, &pool).await;
    report.print();

    if !report.is_valid() {
        anyhow::bail!("configuration is not valid");
    }

    tracing::info!("Configuration is valid");
    Ok(())
}

pub async fn handle_tx_list(config: &Config, limit: Option<i64>) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(config).await?;
    let repository = PostgresTransactionRepository::new(pool);

    let transactions = repository.list(limit, 0).await?;
    if transactions.is_empty() {
        println!("No transactions found");
        return Ok(());
    }

    println!(
        "{:<38} {:<12} {:<16} {:<8} {:<7} {:<20}",
        "ID", "Status", "Recipient", "Amount", "Bundle", "Created"
    );
    println!("{}", "-".repeat(105));

    for tx in transactions {
        let view = TransactionView::from(tx);
        println!(
            "{:<38} {:<12} {:<16} {:<8} {:<7} {:<20}",
            view.id,
            view.status,
            mask_address(&view.recipient_address),
            view.amount,
            view.bundle_kind.map(|k| k.as_str()).unwrap_or("-"),
            view.created_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }

    Ok(())
}

pub async fn handle_tx_disburse(config: &Config, tx_id: Uuid) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(config).await?;
    let repository: Arc<dyn TransactionRepository> =
        Arc::new(PostgresTransactionRepository::new(pool));
    let orchestrator =
        TransactionOrchestrator::new(repository, ProviderGateway::from_config(&config.gateway));

    match orchestrator.disburse(tx_id).await {
        Ok(receipt) => {
            println!(
                "✓ Transaction {} disbursed (reference: {})",
                receipt.transaction_id,
                receipt.provider_reference.as_deref().unwrap_or("-")
            );
            Ok(())
        }
        Err(e) => {
            tracing::warn!(transaction_id = %tx_id, error = %e, "Disbursement failed");
            anyhow::bail!("Transaction {}: {}", tx_id, e)
        }
    }
}
