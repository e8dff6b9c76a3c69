mod cli;

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use cli::{Cli, Commands};
use receipt_gateway::core::config::AppConfig;
use receipt_gateway::core::error::{AppError, AppResult};
use receipt_gateway::core::time::SystemTimeProvider;
use receipt_gateway::infrastructure::imap::ImapClient;
use receipt_gateway::infrastructure::logging;
use receipt_gateway::infrastructure::mistral::MistralClient;
use receipt_gateway::services::email::{MailService, MailSession};
use receipt_gateway::services::gateway::Gateway;
use receipt_gateway::services::ocr::OcrService;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging("receipt-gateway")?;

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    info!("Starting receipt-gateway");
    info!("IMAP server: {}:{}", config.mail.host, config.mail.port);

    let client = ImapClient::new(config.mail.host.clone(), config.mail.port);
    let session = MailSession::new(client, config.mail.clone());
    let ocr = config
        .ocr
        .clone()
        .map(|c| Arc::new(MistralClient::new(c)) as Arc<dyn OcrService>);
    let gateway = Gateway::new(
        session,
        ocr,
        Arc::new(SystemTimeProvider),
        config.output_dir.clone(),
    );

    let result = run_command(&gateway, cli.command).await;

    // Teardown runs whatever happened; a disconnect failure is logged
    // inside shutdown and never replaces the command's result.
    gateway.shutdown().await;

    match result {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) if e.is_empty_result() => {
            println!("Nothing to do: {}", e);
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {}", e);
            Err(e.into())
        }
    }
}

async fn run_command<M: MailService>(gateway: &Gateway<M>, command: Commands) -> AppResult<String> {
    match command {
        Commands::Ping => Ok(gateway.ping().to_string()),
        Commands::Probe => gateway.fetch_last_email().await,
        Commands::Search { sender, days } => {
            let messages = gateway.search(&sender, Some(days)).await?;
            info!("Found {} matching messages", messages.len());
            serde_json::to_string_pretty(&messages).map_err(|e| AppError::Other(e.into()))
        }
        Commands::Receipts => {
            let messages = gateway.fetch_receipt_emails().await?;
            info!("Found {} receipt emails", messages.len());
            serde_json::to_string_pretty(&messages).map_err(|e| AppError::Other(e.into()))
        }
        Commands::Save => {
            let path = gateway.save_receipt_attachment().await?;
            Ok(format!("Saved receipt attachment to {}", path.display()))
        }
        Commands::Magic => gateway.run_magic().await,
    }
}
