//! Show what a link holds.

use anyhow::Result;
use clap::Parser;
use client_blockchain_core::ObjectKind;
use zksend::{ClaimLink, ClaimOrchestrator};

use super::{chain_client, sui_config};

/// List the assets a link holds
#[derive(Debug, Parser)]
pub struct Inspect {
    /// Claim URL
    pub link: String,
}

impl Inspect {
    pub async fn execute(&self) -> Result<()> {
        let link = ClaimLink::decode(&self.link)?;
        let client = chain_client(sui_config(Some(link.network))?)?;

        let assets = ClaimOrchestrator::new(client)
            .list_claimable_assets(&link)
            .await?;

        println!("Link address:  {}", assets.address);
        println!("Network:       {}", link.network);
        if let Some(redirect) = &link.redirect {
            println!("Redirect:      {} ({})", redirect.name, redirect.url);
        }
        println!();

        if assets.is_empty() {
            println!("Nothing to claim");
            return Ok(());
        }

        if !assets.balances.is_empty() {
            println!("Balances:");
            for (coin_type, balance) in &assets.balances {
                println!("  {balance:>20}  {coin_type}");
            }
        }
        if !assets.objects.is_empty() {
            println!("Objects:");
            for object in &assets.objects {
                let type_tag = match &object.kind {
                    ObjectKind::Other { type_tag } => type_tag.as_str(),
                    ObjectKind::Coin { coin_type, .. } => coin_type.as_str(),
                };
                println!("  {}  {}", object.object_id(), type_tag);
            }
        }

        match &assets.gas_reserve {
            Some(reserve) => println!(
                "Gas reserve:   {} MIST, refunded to {}",
                reserve.coin.balance, reserve.sender
            ),
            None => println!("Gas reserve:   not identified (leftover gas goes to the claimer)"),
        }

        Ok(())
    }
}
