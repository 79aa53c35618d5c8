//! Claim a link.

use anyhow::Result;
use clap::Parser;
use client_blockchain_core::SuiAddress;
use zksend::{ClaimLink, ClaimOrchestrator, ClaimOutcome};

use super::{chain_client, sui_config};

/// Claim every asset of a link to an address
#[derive(Debug, Parser)]
pub struct Claim {
    /// Claim URL
    pub link: String,

    /// Address receiving the assets
    #[arg(long)]
    pub to: SuiAddress,
}

impl Claim {
    pub async fn execute(&self) -> Result<()> {
        let link = ClaimLink::decode(&self.link)?;
        let client = chain_client(sui_config(Some(link.network))?)?;

        let result = ClaimOrchestrator::new(client).claim(&link, self.to).await;
        report(link.address(), result)
    }
}

/// Print the claim result. An already-claimed link is not a failure.
fn report(link_address: SuiAddress, result: zksend::Result<ClaimOutcome>) -> Result<()> {
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(error) if error.is_already_claimed() => {
            println!("Link {link_address} has nothing left to claim");
            return Ok(());
        }
        Err(error) => return Err(error.into()),
    };

    println!("✅ Claimed {} object(s) to {}", outcome.claimed, outcome.claimer);
    println!("Digest:        {}", outcome.digest);
    if let Some(sender) = outcome.refund {
        println!("Unused gas refunded to {sender}");
    }
    if let Some(redirect) = outcome.redirect {
        println!("Continue at:   {redirect}");
    }

    Ok(())
}
