//! Request a zkLogin proof.

use anyhow::{Context, Result};
use clap::Parser;
use zk::{JwtClaims, ProvingService};

use super::parse_keypair;

/// Request a zkLogin proof for a JWT
#[derive(Debug, Parser)]
pub struct Prove {
    /// OAuth ID token (compact JWT)
    #[arg(long, env = "ZKSEND_JWT", hide_env_values = true)]
    pub jwt: String,

    /// Ephemeral private key (bech32) whose nonce the token carries
    #[arg(long, env = "ZKSEND_EPHEMERAL_KEY", hide_env_values = true)]
    pub ephemeral_key: String,

    /// Last epoch the ephemeral key is valid for
    #[arg(long)]
    pub max_epoch: u64,

    /// Nonce randomness used when requesting the token
    #[arg(long)]
    pub randomness: u128,

    /// User salt
    #[arg(long)]
    pub salt: u128,
}

impl Prove {
    pub async fn execute(&self) -> Result<()> {
        let ephemeral = parse_keypair(&self.ephemeral_key)?;
        let claims = JwtClaims::from_unverified_jwt(&self.jwt).context("Invalid JWT")?;
        let request = zk::build_proof_inputs(
            &self.jwt,
            &claims,
            &ephemeral.public_key(),
            self.randomness,
            self.max_epoch,
            self.salt,
        )?;

        let prover = proving_service()?;
        let proof = prover.prove(&request).await?;

        println!("Address:  {}", request.inputs.address);
        println!();
        println!("{}", serde_json::to_string_pretty(&proof)?);

        Ok(())
    }
}

#[cfg(not(feature = "zk-stub"))]
fn proving_service() -> Result<Box<dyn ProvingService>> {
    let config = super::sui_config(None)?;
    let prover = client_blockchain_sui::HttpProvingService::from_config(&config);
    tracing::info!(url = prover.url(), "Using zkLogin proving service");
    Ok(Box::new(prover))
}

#[cfg(feature = "zk-stub")]
fn proving_service() -> Result<Box<dyn ProvingService>> {
    tracing::warn!("Using stub proving service: proofs are not valid on chain");
    Ok(Box::new(zk::StubProvingService::new()))
}
