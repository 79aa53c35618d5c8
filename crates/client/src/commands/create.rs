//! Fund a new link.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use client_blockchain_core::{CoinType, ObjectId, SuiAddress};
use client_blockchain_sui::SuiConfig;
use zksend::{LinkConfig, LinkStateBuilder, Redirect};

use super::{chain_client, parse_balance, parse_keypair, sui_config};

/// Fund a new link and print its URL
#[derive(Debug, Parser)]
pub struct Create {
    /// Sender private key (bech32 `suiprivkey...`)
    #[arg(long, env = "ZKSEND_SENDER_KEY", hide_env_values = true)]
    pub sender_key: String,

    /// SUI to place in the link, in MIST
    #[arg(long)]
    pub mist: Option<u64>,

    /// Coin balance to place in the link, as COIN_TYPE=AMOUNT (repeatable)
    #[arg(long = "balance", value_name = "COIN_TYPE=AMOUNT", value_parser = parse_balance)]
    pub balances: Vec<(CoinType, u64)>,

    /// Object to place in the link (repeatable)
    #[arg(long = "object", value_name = "OBJECT_ID")]
    pub objects: Vec<ObjectId>,

    /// Where to send the claimer after claiming
    #[arg(long, requires = "redirect_name", conflicts_with = "config")]
    pub redirect_url: Option<String>,

    /// Display name of the redirect target
    #[arg(long, requires = "redirect_url", conflicts_with = "config")]
    pub redirect_name: Option<String>,

    /// Link configuration file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Plan the funding transaction without submitting it
    #[arg(long)]
    pub dry_run: bool,
}

impl Create {
    pub async fn execute(&self) -> Result<()> {
        let sender = parse_keypair(&self.sender_key)?;
        let (link_config, sui_config) = self.configs(&sender.address())?;

        let client = chain_client(sui_config)?;
        let mut builder = LinkStateBuilder::new(link_config, client);

        if let Some(mist) = self.mist {
            builder.add_claimable_mist(mist)?;
        }
        for (coin_type, amount) in &self.balances {
            builder.add_claimable_balance(coin_type.clone(), *amount)?;
        }
        for object_id in &self.objects {
            builder.add_claimable_object(*object_id)?;
        }

        if self.dry_run {
            let funding = builder.build().await?;
            println!("Link address:  {}", funding.recipient);
            println!("Gas reserved:  {} MIST", funding.gas_reserve);
            println!("Digest:        {}", funding.digest()?);
            println!();
            println!("Instructions:");
            for instruction in &funding.instructions {
                println!("  {instruction}");
            }
            println!();
            println!("Dry run: nothing was submitted");
            return Ok(());
        }

        let created = builder.create(&sender).await?;

        println!("✅ Link funded");
        println!();
        println!("Digest:        {}", created.executed.digest);
        println!("Link address:  {}", created.funding.recipient);
        println!("Gas reserved:  {} MIST", created.funding.gas_reserve);
        println!();
        println!("⚠️  Anyone holding this URL can claim the link:");
        println!("{}", created.url);

        Ok(())
    }

    /// Link settings from `--config` or the command line, and the matching
    /// Sui settings.
    fn configs(&self, sender: &SuiAddress) -> Result<(LinkConfig, SuiConfig)> {
        if let Some(path) = &self.config {
            let link_config = LinkConfig::from_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            if link_config.sender() != *sender {
                bail!(
                    "Configured sender {} does not match the sender key ({})",
                    link_config.sender(),
                    sender
                );
            }
            let sui_config = sui_config(Some(link_config.network()))?;
            return Ok((link_config, sui_config));
        }

        let sui_config = sui_config(None)?;
        let mut link_config = LinkConfig::builder(*sender)
            .network(sui_config.network)
            .gas_budget(sui_config.gas_budget);
        if let (Some(url), Some(name)) = (&self.redirect_url, &self.redirect_name) {
            link_config = link_config.redirect(Redirect::new(url, name));
        }

        Ok((link_config.build()?, sui_config))
    }
}
