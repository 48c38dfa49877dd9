use bundle_bridge::cli::{self, Cli, Commands, DbCommands, TxCommands};
use bundle_bridge::config::Config;
use bundle_bridge::startup;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    startup::init_tracing();

    match cli.command {
        None | Some(Commands::Serve) => startup::serve(config).await,
        Some(Commands::Db(DbCommands::Migrate)) => cli::handle_db_migrate(&config).await,
        Some(Commands::Config) => cli::handle_config_validate(&config).await,
        Some(Commands::Tx(TxCommands::List { limit })) => cli::handle_tx_list(&config, limit).await,
        Some(Commands::Tx(TxCommands::Disburse { tx_id })) => {
            cli::handle_tx_disburse(&config, tx_id).await
        }
    }
}
