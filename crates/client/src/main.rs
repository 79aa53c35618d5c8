//! zkSend command line client.
//!
//! Composition root: loads configuration from the environment, sets up
//! logging, constructs the Sui RPC client and hands it to the command.
//!
//! # Examples
//!
//! ```bash
//! # Fund a link with 0.1 SUI and an NFT
//! zksend create --sender-key suiprivkey1... --mist 100000000 --object 0x5f...
//!
//! # Show what a link holds, then claim it
//! zksend inspect 'https://zksend.com/claim#$...'
//! zksend claim 'https://zksend.com/claim#$...' --to 0xa1...
//! ```

mod commands;
mod logging;

use anyhow::Result;
use clap::Parser;
use commands::{Claim, Create, Inspect, Prove, ZkAddress};

/// Create and claim zkSend links on Sui
#[derive(Parser)]
#[command(name = "zksend")]
#[command(about = "Create and claim zkSend links on Sui", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Fund a new link and print its URL
    Create(Create),

    /// List the assets a link holds
    Inspect(Inspect),

    /// Claim every asset of a link to an address
    Claim(Claim),

    /// Derive a zkLogin address (and optionally a nonce)
    ZkAddress(ZkAddress),

    /// Request a zkLogin proof for a JWT
    Prove(Prove),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = logging::setup_logging()?;

    match cli.command {
        Command::Create(cmd) => cmd.execute().await,
        Command::Inspect(cmd) => cmd.execute().await,
        Command::Claim(cmd) => cmd.execute().await,
        Command::ZkAddress(cmd) => cmd.execute(),
        Command::Prove(cmd) => cmd.execute().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_claim_command() {
        let cli = Cli::try_parse_from([
            "zksend",
            "claim",
            "https://zksend.com/claim#$AAAA",
            "--to",
            "0x1",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Claim(_)));
    }
}
