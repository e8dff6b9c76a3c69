use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "receipt-gateway")]
#[command(about = "Receipt ingestion gateway over IMAP and OCR", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Ping the gateway
    Ping,
    /// Fetch the subject line of the newest inbox message
    Probe,
    /// Search the inbox for unseen messages from a sender
    Search {
        /// Sender address to match
        #[arg(short, long)]
        sender: String,

        /// Look back this many days
        #[arg(long, default_value = "7")]
        days: u64,
    },
    /// Fetch recent receipt emails that carry attachments
    Receipts,
    /// Save the newest receipt PDF into the output directory
    Save,
    /// Run the full receipt pipeline: fetch, decode, OCR, assemble markdown
    Magic,
}
